//! # ConnectionSupervisor: keeps one backend client usable.
//!
//! A [`ConnectionSupervisor`] owns the full lifecycle of the client for one named
//! backend target: it creates the client in the background, proves it reachable,
//! detects outages, and recovers, while callers keep a [`Proxy`] that never blocks.
//!
//! ## State machine
//! ```text
//! Creating ──create ok──► Connecting ──probe ok──► Connected
//!    ▲                      │   ▲                      │
//!    │     reachability     │   │   call/probe fails   │
//!    └──── exhausted ───────┘   └──── (dual-check) ────┘
//!
//! any ──close()──► Closed
//! ```
//!
//! ## Architecture
//! ```text
//! Proxy::call ──► api.load() (lock-free) ──► Live(client) ──► op(client)
//!                                        └─► Unavailable(stub) ──► Err(Unavailable)
//!
//! transitions (one Mutex<Inner>):
//!   state / live / cause / pending / epoch
//!   ├─► state mirror   (AtomicU8 + watch)
//!   ├─► api slot       (ArcSwap)
//!   ├─► registry       (listener queues, initializer sweep)
//!   └─► install(job)   cancel previous pending, spawn the next on the Scheduler
//! ```
//!
//! ## Rules
//! - At most one background job (creation loop, probe loop, refresh, monitor) is pending;
//!   installing a new one cancels the previous one first.
//! - Jobs carry the epoch they were installed with and only act while it is current,
//!   so a cancelled job that finishes late changes nothing.
//! - Jobs hold a `Weak` reference between attempts; dropping the last `Arc` cancels them.
//! - The lock is never held across `.await`; handles are closed after it is released.
//! - Once `Closed`, nothing transitions again.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::{
    select,
    sync::{broadcast, watch},
    time,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::client::{Client, Creator, Handles, HealthChecker, UnavailableStub};
use crate::core::{
    Config, Proxy, Scheduler,
    retry::{self, Outcome, Retry, WarnThrottle},
    state::{ApiHandle, ConnectionState},
};
use crate::error::ClientError;
use crate::events::{Bus, Event, EventKind, RetrySource};
use crate::notify::{Initializer, Listener, SubscriptionRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Job {
    /// Creation retry loop (`Creating`).
    Create,
    /// Probe retry loop (`Connecting`).
    Reach,
    /// One opportunistic probe while `Connected`.
    Refresh,
    /// Periodic probe while `Connected`.
    Monitor,
}

struct Pending {
    epoch: u64,
    job: Job,
    token: CancellationToken,
}

struct Inner<C> {
    state: ConnectionState,
    live: Option<Handles<C>>,
    cause: Option<Arc<ClientError>>,
    pending: Option<Pending>,
    epoch: u64,
    rearms: u32,
    probed_at: Option<Instant>,
}

impl<C> Inner<C> {
    fn is_current(&self, epoch: u64) -> bool {
        self.pending.as_ref().is_some_and(|p| p.epoch == epoch)
    }

    fn clear_pending(&mut self) {
        if let Some(p) = self.pending.take() {
            p.token.cancel();
        }
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// Supervises the client of one named backend target.
///
/// Build it with [`SupervisorBuilder`](crate::SupervisorBuilder) or obtain it from a
/// [`SupervisorPool`](crate::SupervisorPool).
///
/// Call [`close`](Self::close) when done. Dropping the last `Arc` instead still
/// cancels background work, sends listeners their final `false` and closes the live
/// client on a spawned task, but nobody can await that close.
pub struct ConnectionSupervisor<C: Client> {
    name: Arc<str>,
    cfg: Config,
    creator: Arc<dyn Creator<C>>,
    health: HealthChecker,
    scheduler: Arc<Scheduler>,
    bus: Bus,
    registry: SubscriptionRegistry,

    state: AtomicU8,
    api: ArcSwap<ApiHandle<C>>,
    state_tx: watch::Sender<ConnectionState>,
    inner: Mutex<Inner<C>>,

    create_warn: Arc<WarnThrottle>,
    probe_warn: Arc<WarnThrottle>,
    lifetime: CancellationToken,
    me: Weak<Self>,
}

impl<C: Client> ConnectionSupervisor<C> {
    /// Creates the supervisor in `Creating` and starts the creation loop.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn start(
        name: Arc<str>,
        cfg: Config,
        creator: Arc<dyn Creator<C>>,
        scheduler: Arc<Scheduler>,
        bus: Bus,
    ) -> Arc<Self> {
        let not_connected = Arc::new(ClientError::NotConnected);
        let sup = Arc::new_cyclic(|me| Self {
            health: HealthChecker::new(cfg.probe_timeout()),
            registry: SubscriptionRegistry::new(Arc::clone(&name), Arc::clone(&scheduler), bus.clone()),
            state: AtomicU8::new(ConnectionState::Creating as u8),
            api: ArcSwap::from_pointee(ApiHandle::Unavailable(UnavailableStub::new(
                Arc::clone(&name),
                Arc::clone(&not_connected),
            ))),
            state_tx: watch::Sender::new(ConnectionState::Creating),
            inner: Mutex::new(Inner {
                state: ConnectionState::Creating,
                live: None,
                cause: Some(not_connected),
                pending: None,
                epoch: 0,
                rearms: 0,
                probed_at: None,
            }),
            create_warn: Arc::new(WarnThrottle::new(cfg.warn_interval)),
            probe_warn: Arc::new(WarnThrottle::new(cfg.warn_interval)),
            lifetime: CancellationToken::new(),
            me: me.clone(),
            name,
            cfg,
            creator,
            scheduler,
            bus,
        });

        tracing::info!(backend = %sup.name, creator = sup.creator.name(), "supervisor started");
        {
            let mut inner = sup.inner.lock();
            sup.install(&mut inner, Job::Create, None);
        }
        sup
    }

    /// Name of the supervised backend target.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state (lock-free).
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Last known reason the backend is unavailable (`None` while connected).
    pub fn cause(&self) -> Option<Arc<ClientError>> {
        self.inner.lock().cause.clone()
    }

    /// Number of registered availability listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.listener_count()
    }

    /// Number of initializers still waiting for the first availability.
    pub fn pending_initializers(&self) -> usize {
        self.registry.initializer_count()
    }

    /// Subscribes to the diagnostic events this supervisor publishes.
    ///
    /// With a shared bus (pool, `with_bus`) the receiver sees other supervisors' events too.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Configuration this supervisor runs with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns a proxy that routes every call to the client current at call time.
    ///
    /// Never fails and never blocks.
    pub fn client(self: &Arc<Self>) -> Proxy<C> {
        Proxy::new(Arc::clone(self))
    }

    /// Whether the backend is currently reachable.
    ///
    /// Lock-free. When connected and the last successful probe is older than
    /// `Config::probe_refresh`, a one-shot background probe is scheduled unless another
    /// background job is already pending.
    pub fn is_available(&self) -> bool {
        let state = self.state();
        if state == ConnectionState::Connected {
            if let Some(mut inner) = self.inner.try_lock() {
                let stale = inner
                    .probed_at
                    .is_none_or(|at| at.elapsed() >= self.cfg.probe_refresh);
                if stale && inner.pending.is_none() && inner.state == ConnectionState::Connected {
                    self.install(&mut inner, Job::Refresh, None);
                }
            }
        }
        state.is_available()
    }

    /// Waits until connected (`true`), closed (`false`) or `timeout` elapses (`false`).
    pub async fn wait_available(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut rx = self.state_tx.subscribe();
        let settled = rx.wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Closed));
        match time::timeout_at(deadline, settled).await {
            Ok(Ok(state)) => state.is_available(),
            _ => false,
        }
    }

    /// Registers `listener` for availability changes and returns current availability.
    ///
    /// The listener always receives one asynchronous delivery of the current
    /// availability, then one per transition, in transition order.
    pub fn is_available_with(&self, listener: Arc<dyn Listener>) -> bool {
        let inner = self.inner.lock();
        let current = inner.state == ConnectionState::Connected;
        self.registry.add_listener(listener, current);
        current
    }

    /// Runs `initializer` exactly once, on the first transition to connected.
    ///
    /// When already connected it is delivered immediately (asynchronously) and not
    /// retained. After close it never runs.
    pub fn when_available(&self, initializer: Arc<dyn Initializer>) {
        let Some(id) = self.registry.add_initializer(initializer) else {
            return;
        };
        // The transition sweep and this re-check both remove under the registry lock,
        // so exactly one of them obtains the initializer.
        if self.state() == ConnectionState::Connected {
            if let Some(init) = self.registry.take_initializer(id) {
                self.registry.deliver(vec![init]);
            }
        }
    }

    /// Closes the supervisor: cancels background work, closes the live client,
    /// notifies listeners once with `false` and clears the registry.
    ///
    /// Idempotent and safe to call concurrently.
    pub async fn close(&self) {
        let retired = {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Closed {
                return;
            }
            inner.clear_pending();
            inner.cause = Some(Arc::new(ClientError::Closed));
            self.api
                .store(Arc::new(ApiHandle::Unavailable(UnavailableStub::closed(Arc::clone(&self.name)))));
            self.set_state(&mut inner, ConnectionState::Closed);
            self.registry.close();
            self.publish(Event::new(EventKind::Closed));
            self.lifetime.cancel();
            tracing::info!(backend = %self.name, "supervisor closed");
            inner.live.take()
        };
        if let Some(handles) = retired {
            handles.close(&self.name).await;
        }
    }

    /// Cancelled once the supervisor is closed or dropped.
    pub(crate) fn lifetime(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    /// Loads the api slot (lock-free).
    pub(crate) fn api_handle(&self) -> Arc<ApiHandle<C>> {
        self.api.load_full()
    }

    /// Dual-check after a failed call on `client`.
    ///
    /// Synchronous on the caller's task or scheduled, per `Config::sync_recheck`.
    pub(crate) async fn recheck_after_failure(self: &Arc<Self>, client: Arc<C>) {
        if self.cfg.sync_recheck {
            self.recheck(&client).await;
        } else {
            let sup = Arc::clone(self);
            self.scheduler.spawn(async move {
                let sup = &sup;
                sup.scheduler.run(sup.recheck(&client)).await;
            });
        }
    }

    async fn recheck(&self, client: &Arc<C>) {
        let probe = {
            let inner = self.inner.lock();
            match &inner.live {
                Some(live) if Arc::ptr_eq(&live.api, client) && inner.state != ConnectionState::Closed => {
                    Arc::clone(&live.probe)
                }
                _ => return,
            }
        };

        let res = self.health.check(&self.name, probe.as_ref()).await;

        let mut inner = self.inner.lock();
        if !inner.live.as_ref().is_some_and(|live| live.contains(client)) {
            return;
        }
        match (res, inner.state) {
            (Ok(()), ConnectionState::Connecting) => self.promote(&mut inner),
            (Ok(()), ConnectionState::Connected) => inner.probed_at = Some(Instant::now()),
            (Err(e), ConnectionState::Connected) => self.demote(&mut inner, cause_of(e)),
            (Err(e), ConnectionState::Connecting) => self.set_cause(&mut inner, cause_of(e)),
            _ => {}
        }
    }

    // --- transitions (caller holds the lock) ---

    fn set_state(&self, inner: &mut Inner<C>, state: ConnectionState) {
        inner.state = state;
        self.state.store(state as u8, Ordering::Release);
        self.state_tx.send_replace(state);
    }

    fn set_cause(&self, inner: &mut Inner<C>, cause: Arc<ClientError>) {
        self.api.store(Arc::new(ApiHandle::Unavailable(UnavailableStub::new(
            Arc::clone(&self.name),
            Arc::clone(&cause),
        ))));
        inner.cause = Some(cause);
    }

    /// `Creating → Connecting`.
    fn on_created(&self, inner: &mut Inner<C>, handles: Handles<C>) {
        inner.live = Some(handles);
        inner.rearms = 0;
        self.set_cause(inner, Arc::new(ClientError::NotConnected));
        self.set_state(inner, ConnectionState::Connecting);
        self.publish(Event::new(EventKind::ClientCreated));
        tracing::info!(backend = %self.name, "client created, probing reachability");
        self.install(inner, Job::Reach, None);
    }

    /// `Connecting → Connected`.
    fn promote(&self, inner: &mut Inner<C>) {
        let Some(api) = inner.live.as_ref().map(|live| Arc::clone(&live.api)) else {
            return;
        };
        self.api.store(Arc::new(ApiHandle::Live(api)));
        inner.cause = None;
        inner.rearms = 0;
        inner.probed_at = Some(Instant::now());
        self.set_state(inner, ConnectionState::Connected);

        self.registry.notify(true);
        self.registry.deliver(self.registry.drain_initializers());
        self.publish(Event::new(EventKind::Connected));
        tracing::info!(backend = %self.name, "backend connected");

        match self.cfg.monitor_interval() {
            Some(_) => self.install(inner, Job::Monitor, None),
            None => inner.clear_pending(),
        }
    }

    /// `Connected → Connecting`.
    fn demote(&self, inner: &mut Inner<C>, cause: Arc<ClientError>) {
        let reason = cause.as_message();
        self.set_cause(inner, cause);
        self.set_state(inner, ConnectionState::Connecting);

        self.registry.notify(false);
        self.publish(Event::new(EventKind::Disconnected).with_reason(reason.clone()));
        tracing::warn!(backend = %self.name, reason = %reason, "backend became unavailable");
        self.install(inner, Job::Reach, None);
    }

    /// `Connecting → Creating`; returns the retired handles for closing after unlock.
    fn recreate(&self, inner: &mut Inner<C>, cause: Arc<ClientError>) -> Option<Handles<C>> {
        let reason = cause.as_message();
        let retired = inner.live.take();
        self.set_cause(inner, cause);
        self.set_state(inner, ConnectionState::Creating);

        self.publish(Event::new(EventKind::Recreating).with_reason(reason.clone()));
        tracing::warn!(backend = %self.name, reason = %reason, "reachability exhausted, recreating client");
        self.install(inner, Job::Create, None);
        retired
    }

    /// Starts a fresh sequence of `job` after an aborted or exhausted one.
    fn rearm(&self, inner: &mut Inner<C>, job: Job, attempt: u32, error: &ClientError) {
        let policy = match job {
            Job::Create => self.cfg.creation,
            _ => self.cfg.reachability,
        };
        let delay = policy.backoff.next(inner.rearms);
        inner.rearms = inner.rearms.saturating_add(1);

        self.publish(
            Event::new(EventKind::RetryRearmed)
                .with_source(source_of(job))
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(error.as_message()),
        );
        tracing::debug!(
            backend = %self.name,
            source = source_of(job).as_label(),
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retry sequence stopped, re-armed"
        );
        self.install(inner, job, Some(delay));
    }

    /// Cancels the pending job and schedules `job` in its place.
    fn install(&self, inner: &mut Inner<C>, job: Job, delay: Option<Duration>) {
        if let Some(prev) = inner.pending.as_ref().map(|p| p.job) {
            tracing::trace!(backend = %self.name, ?prev, next = ?job, "replacing background job");
        }
        inner.clear_pending();
        let epoch = inner.epoch;
        let token = self.scheduler.child_token();
        inner.pending = Some(Pending {
            epoch,
            job,
            token: token.clone(),
        });

        let me = self.me.clone();
        match job {
            Job::Create => self.scheduler.spawn(Self::create_job(me, epoch, token, delay)),
            Job::Reach => self.scheduler.spawn(Self::reach_job(me, epoch, token, delay)),
            Job::Refresh => self.scheduler.spawn(Self::refresh_job(me, epoch, token)),
            Job::Monitor => self.scheduler.spawn(Self::monitor_job(me, epoch, token)),
        };
    }

    // --- background jobs ---

    async fn create_job(me: Weak<Self>, epoch: u64, token: CancellationToken, delay: Option<Duration>) {
        let Some((retry, creator)) = me
            .upgrade()
            .map(|sup| (sup.retry(RetrySource::Creation), Arc::clone(&sup.creator)))
        else {
            return;
        };

        let outcome = retry
            .run(&token, delay, |_| {
                let (me, creator, ctx) = (me.clone(), Arc::clone(&creator), token.clone());
                async move {
                    let res = creator.create(ctx).await;
                    if let (Err(e), Some(sup)) = (&res, me.upgrade()) {
                        sup.record_cause(epoch, e);
                    }
                    res
                }
            })
            .await;

        let Some(sup) = me.upgrade() else {
            if let Outcome::Done(handles) = outcome {
                handles.close(&retry.backend).await;
            }
            return;
        };
        match outcome {
            Outcome::Done(handles) => {
                let stale = {
                    let mut inner = sup.inner.lock();
                    if inner.is_current(epoch) && inner.state == ConnectionState::Creating {
                        sup.on_created(&mut inner, handles);
                        None
                    } else {
                        Some(handles)
                    }
                };
                if let Some(handles) = stale {
                    handles.close(&sup.name).await;
                }
            }
            Outcome::Cancelled => {}
            Outcome::Aborted { attempt, error } | Outcome::Exhausted { attempt, error } => {
                let mut inner = sup.inner.lock();
                if inner.is_current(epoch) {
                    sup.rearm(&mut inner, Job::Create, attempt, &error);
                }
            }
        }
    }

    async fn reach_job(me: Weak<Self>, epoch: u64, token: CancellationToken, delay: Option<Duration>) {
        let Some((retry, health, name, probe)) = me.upgrade().and_then(|sup| {
            let probe = sup.inner.lock().live.as_ref().map(|live| Arc::clone(&live.probe))?;
            Some((sup.retry(RetrySource::Reachability), sup.health, Arc::clone(&sup.name), probe))
        }) else {
            return;
        };

        let outcome = retry
            .run(&token, delay, |_| {
                let (me, name, probe) = (me.clone(), Arc::clone(&name), Arc::clone(&probe));
                async move {
                    let res = health.check(&name, probe.as_ref()).await;
                    if let (Err(e), Some(sup)) = (&res, me.upgrade()) {
                        sup.record_cause(epoch, e);
                    }
                    res
                }
            })
            .await;

        let Some(sup) = me.upgrade() else {
            return;
        };
        let retired = {
            let mut inner = sup.inner.lock();
            if !inner.is_current(epoch) || inner.state != ConnectionState::Connecting {
                return;
            }
            match outcome {
                Outcome::Done(()) => {
                    sup.promote(&mut inner);
                    None
                }
                Outcome::Cancelled => None,
                Outcome::Exhausted { error, .. } => sup.recreate(&mut inner, cause_of(error)),
                Outcome::Aborted { attempt, error } => {
                    sup.rearm(&mut inner, Job::Reach, attempt, &error);
                    None
                }
            }
        };
        if let Some(handles) = retired {
            handles.close(&sup.name).await;
        }
    }

    async fn refresh_job(me: Weak<Self>, epoch: u64, token: CancellationToken) {
        let Some(sup) = me.upgrade() else {
            return;
        };
        if let Some(healthy) = sup.probe_connected(epoch, &token).await {
            let mut inner = sup.inner.lock();
            if healthy && inner.is_current(epoch) {
                inner.pending = None;
            }
        }
    }

    async fn monitor_job(me: Weak<Self>, epoch: u64, token: CancellationToken) {
        loop {
            let Some(every) = me.upgrade().and_then(|sup| sup.cfg.monitor_interval()) else {
                return;
            };
            if !retry::sleep(&token, every).await {
                return;
            }
            let Some(sup) = me.upgrade() else {
                return;
            };
            if sup.probe_connected(epoch, &token).await != Some(true) {
                return;
            }
        }
    }

    /// One probe of the connected client on a worker.
    ///
    /// Healthy → marks the probe time; unhealthy → demotes. Returns `None` when
    /// cancelled or no longer current.
    async fn probe_connected(&self, epoch: u64, token: &CancellationToken) -> Option<bool> {
        let probe = {
            let inner = self.inner.lock();
            if !inner.is_current(epoch) || inner.state != ConnectionState::Connected {
                return None;
            }
            Arc::clone(&inner.live.as_ref()?.probe)
        };

        let res = select! {
            res = self.scheduler.run(self.health.check(&self.name, probe.as_ref())) => res?,
            _ = token.cancelled() => return None,
        };

        let mut inner = self.inner.lock();
        if !inner.is_current(epoch) || inner.state != ConnectionState::Connected {
            return None;
        }
        match res {
            Ok(()) => {
                inner.probed_at = Some(Instant::now());
                Some(true)
            }
            Err(e) => {
                tracing::debug!(backend = %self.name, error = %e, "background probe failed");
                self.demote(&mut inner, cause_of(e));
                Some(false)
            }
        }
    }

    /// Keeps the stub's cause current while a retry sequence is failing.
    fn record_cause(&self, epoch: u64, error: &ClientError) {
        let mut inner = self.inner.lock();
        if inner.is_current(epoch)
            && matches!(inner.state, ConnectionState::Creating | ConnectionState::Connecting)
        {
            self.set_cause(&mut inner, cause_of(error.clone()));
        }
    }

    fn retry(&self, source: RetrySource) -> Retry {
        let (policy, throttle) = match source {
            RetrySource::Creation => (self.cfg.creation, &self.create_warn),
            RetrySource::Reachability => (self.cfg.reachability, &self.probe_warn),
        };
        Retry {
            backend: Arc::clone(&self.name),
            source,
            policy,
            bus: self.bus.clone(),
            throttle: Arc::clone(throttle),
            scheduler: Arc::clone(&self.scheduler),
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_backend(Arc::clone(&self.name)));
    }

    #[cfg(test)]
    fn pending_job(&self) -> Option<Job> {
        self.inner.lock().pending.as_ref().map(|p| p.job)
    }
}

impl<C: Client> Drop for ConnectionSupervisor<C> {
    /// Cancels background work, sweeps listeners and closes a live client that
    /// `close()` never retired.
    ///
    /// The client is closed on a spawned task, so this needs a Tokio runtime; without
    /// one the handles are dropped unclosed and a warning is logged.
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(p) = inner.pending.take() {
            p.token.cancel();
        }
        self.lifetime.cancel();
        self.registry.close();

        let Some(handles) = inner.live.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let name = Arc::clone(&self.name);
                tracing::debug!(backend = %name, "supervisor dropped without close, closing client");
                rt.spawn(async move { handles.close(&name).await });
            }
            Err(_) => {
                tracing::warn!(backend = %self.name, "supervisor dropped outside a runtime, client left unclosed");
            }
        }
    }
}

fn source_of(job: Job) -> RetrySource {
    match job {
        Job::Create => RetrySource::Creation,
        _ => RetrySource::Reachability,
    }
}

/// Unwraps `Unavailable` so stored causes never nest.
fn cause_of(error: ClientError) -> Arc<ClientError> {
    match error {
        ClientError::Unavailable { cause, .. } => cause,
        other => Arc::new(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CreateFn, ProbeStatus};
    use crate::policies::BackoffPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    struct Backend {
        up: Arc<AtomicBool>,
        closed: AtomicUsize,
    }

    #[async_trait]
    impl Client for Backend {
        async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> {
            if self.up.load(Ordering::SeqCst) {
                Ok(Some(ProbeStatus::Ok))
            } else {
                Err(ClientError::backend("connection refused"))
            }
        }

        async fn close(&self) -> Result<(), ClientError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> Config {
        let fixed = BackoffPolicy::fixed(Duration::from_millis(10));
        Config {
            creation: crate::RetryPolicy::creation().with_backoff(fixed),
            reachability: crate::RetryPolicy::reachability().with_backoff(fixed),
            ..Config::default()
        }
    }

    fn supervisor(up: Arc<AtomicBool>, cfg: Config) -> Arc<ConnectionSupervisor<Backend>> {
        let creator: Arc<dyn Creator<Backend>> = CreateFn::arc("backend", move |_ctx: CancellationToken| {
            let up = Arc::clone(&up);
            async move {
                Ok::<_, ClientError>(Handles::single(Arc::new(Backend {
                    up,
                    closed: AtomicUsize::new(0),
                })))
            }
        });
        ConnectionSupervisor::start(Arc::from("core"), cfg, creator, Scheduler::new(Some(8)), Bus::new(256))
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_connected_when_backend_is_up() {
        let sup = supervisor(Arc::new(AtomicBool::new(true)), config());
        assert!(sup.wait_available(Duration::from_secs(1)).await);
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert!(sup.cause().is_none());
        assert_eq!(sup.pending_job(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_connecting_while_backend_is_down() {
        let up = Arc::new(AtomicBool::new(false));
        let sup = supervisor(Arc::clone(&up), config());

        assert!(!sup.wait_available(Duration::from_millis(200)).await);
        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert_eq!(sup.pending_job(), Some(Job::Reach));
        assert_eq!(sup.cause().unwrap().as_label(), "client_backend");

        up.store(true, Ordering::SeqCst);
        assert!(sup.wait_available(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_probe_schedules_one_refresh() {
        let sup = supervisor(Arc::new(AtomicBool::new(true)), config());
        assert!(sup.wait_available(Duration::from_secs(1)).await);

        time::advance(Duration::from_secs(31)).await;
        assert!(sup.is_available());
        assert_eq!(sup.pending_job(), Some(Job::Refresh));
        // A second call while the refresh is pending schedules nothing new.
        assert!(sup.is_available());
        assert_eq!(sup.pending_job(), Some(Job::Refresh));
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_demotes_on_failed_probe() {
        let up = Arc::new(AtomicBool::new(true));
        let cfg = Config {
            monitor_interval: Duration::from_secs(5),
            ..config()
        };
        let sup = supervisor(Arc::clone(&up), cfg);
        assert!(sup.wait_available(Duration::from_secs(1)).await);
        assert_eq!(sup.pending_job(), Some(Job::Monitor));

        up.store(false, Ordering::SeqCst);
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert_eq!(sup.pending_job(), Some(Job::Reach));
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_terminal() {
        let sup = supervisor(Arc::new(AtomicBool::new(true)), config());
        assert!(sup.wait_available(Duration::from_secs(1)).await);

        sup.close().await;
        sup.close().await;

        assert_eq!(sup.state(), ConnectionState::Closed);
        assert_eq!(sup.pending_job(), None);
        assert!(!sup.is_available());
        assert!(!sup.wait_available(Duration::from_secs(1)).await);
        assert!(matches!(sup.cause().unwrap().as_ref(), ClientError::Closed));
    }
}
