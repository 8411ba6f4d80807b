//! # Subscription registry: listeners and one-shot initializers.
//!
//! ```text
//! notify(available)
//!     │                      (called under the supervisor lock, in transition order)
//!     ├──► [queue L1] ──► worker L1 ──► scheduler.run(listener1.on_availability)
//!     └──► [queue LN] ──► worker LN ──► scheduler.run(listenerN.on_availability)
//!
//! drain_initializers() ──► deliver() ──► scheduler.spawn(scheduler.run(init.initialize))
//! ```
//!
//! ## Rules
//! - **Per-listener FIFO**; no ordering across listeners.
//! - `notify` never blocks. When a listener's queue is full, later notifications
//!   coalesce into one pending value (the newest) that the worker delivers once the
//!   queue drains, and `ListenerOverflow` is published. A slow listener may miss
//!   intermediate flaps but always ends on the latest availability, including the
//!   final `false` from close.
//! - **Exactly-once initializers**: `take_initializer` and `drain_initializers` remove
//!   under one lock, so of the two delivery paths (registration-time check, transition
//!   sweep) exactly one obtains each initializer.
//! - After [`close`](SubscriptionRegistry::close) every listener has been sent a final
//!   `false`, the registry is empty and stays empty.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::core::Scheduler;
use crate::events::{Bus, Event, EventKind};
use crate::notify::{Initializer, Listener, catch_panic, panic_message};

/// Newest notification that did not fit into a listener's queue.
type Spill = Arc<Mutex<Option<bool>>>;

struct ListenerChannel {
    name: Arc<str>,
    sender: mpsc::Sender<bool>,
    spill: Spill,
}

struct Slots {
    listeners: Vec<ListenerChannel>,
    initializers: Vec<(u64, Arc<dyn Initializer>)>,
    closed: bool,
}

/// Holds availability listeners and pending one-shot initializers for one backend.
pub struct SubscriptionRegistry {
    backend: Arc<str>,
    scheduler: Arc<Scheduler>,
    bus: Bus,
    slots: Mutex<Slots>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry delivering on `scheduler`.
    pub fn new(backend: impl Into<Arc<str>>, scheduler: Arc<Scheduler>, bus: Bus) -> Self {
        Self {
            backend: backend.into(),
            scheduler,
            bus,
            slots: Mutex::new(Slots {
                listeners: Vec::new(),
                initializers: Vec::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `listener` and enqueues its first notification (`current`).
    ///
    /// After close the listener is notified once and not retained.
    pub fn add_listener(&self, listener: Arc<dyn Listener>, current: bool) {
        let mut slots = self.slots.lock();
        if slots.closed {
            drop(slots);
            self.notify_once(listener, current);
            return;
        }

        let name: Arc<str> = Arc::from(listener.name());
        let (tx, rx) = mpsc::channel(listener.queue_capacity().max(1));
        // Fresh queue with capacity >= 1: cannot fail.
        let _ = tx.try_send(current);
        let spill = Spill::default();
        self.spawn_worker(listener, rx, Arc::clone(&spill));
        slots.listeners.push(ListenerChannel {
            name,
            sender: tx,
            spill,
        });
    }

    /// Enqueues `available` for every listener.
    pub fn notify(&self, available: bool) {
        let mut slots = self.slots.lock();
        self.notify_locked(&mut slots, available);
    }

    fn notify_locked(&self, slots: &mut Slots, available: bool) {
        slots.listeners.retain(|channel| {
            let mut spill = channel.spill.lock();
            if spill.is_some() {
                // Already spilling: queued values stay ahead, the newest replaces the spill.
                *spill = Some(available);
                return !channel.sender.is_closed();
            }
            match channel.sender.try_send(available) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    *spill = Some(available);
                    tracing::warn!(
                        backend = %self.backend,
                        listener = %channel.name,
                        available,
                        "listener queue full, coalescing notifications"
                    );
                    self.bus.publish(
                        Event::new(EventKind::ListenerOverflow)
                            .with_backend(Arc::clone(&self.backend))
                            .with_reason(format!("listener={} reason=full", channel.name)),
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    /// Registers a one-shot initializer; returns its id for [`take_initializer`](Self::take_initializer).
    ///
    /// After close the initializer is dropped (it never runs) and `None` is returned.
    pub fn add_initializer(&self, init: Arc<dyn Initializer>) -> Option<u64> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        slots.initializers.push((id, init));
        Some(id)
    }

    /// Removes the initializer `id` if no sweep took it yet.
    pub fn take_initializer(&self, id: u64) -> Option<Arc<dyn Initializer>> {
        let mut slots = self.slots.lock();
        let pos = slots.initializers.iter().position(|(i, _)| *i == id)?;
        Some(slots.initializers.swap_remove(pos).1)
    }

    /// Removes every pending initializer.
    pub fn drain_initializers(&self) -> Vec<Arc<dyn Initializer>> {
        let mut slots = self.slots.lock();
        slots.initializers.drain(..).map(|(_, init)| init).collect()
    }

    /// Runs each initializer once on the scheduler.
    pub fn deliver(&self, inits: Vec<Arc<dyn Initializer>>) {
        for init in inits {
            let scheduler = Arc::clone(&self.scheduler);
            let bus = self.bus.clone();
            let backend = Arc::clone(&self.backend);
            self.scheduler.spawn(async move {
                if let Some(Err(panic)) = scheduler.run(catch_panic(init.initialize())).await {
                    let info = panic_message(&*panic);
                    tracing::error!(backend = %backend, initializer = init.name(), info = %info, "initializer panicked");
                    bus.publish(
                        Event::new(EventKind::InitializerPanicked)
                            .with_backend(backend)
                            .with_reason(format!("initializer={} panic={info}", init.name())),
                    );
                }
            });
        }
    }

    /// Final sweep: notifies every listener with `false`, then clears the registry.
    ///
    /// Idempotent; later registrations are not retained.
    pub fn close(&self) {
        let mut slots = self.slots.lock();
        if slots.closed {
            return;
        }
        slots.closed = true;
        self.notify_locked(&mut slots, false);
        // Dropping the senders lets each worker drain its queue and exit.
        slots.listeners.clear();
        slots.initializers.clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.slots.lock().listeners.len()
    }

    /// Number of pending initializers.
    pub fn initializer_count(&self) -> usize {
        self.slots.lock().initializers.len()
    }

    fn notify_once(&self, listener: Arc<dyn Listener>, available: bool) {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(available);
        drop(tx);
        self.spawn_worker(listener, rx, Spill::default());
    }

    fn spawn_worker(&self, listener: Arc<dyn Listener>, mut rx: mpsc::Receiver<bool>, spill: Spill) {
        let scheduler = Arc::clone(&self.scheduler);
        let bus = self.bus.clone();
        let backend = Arc::clone(&self.backend);

        self.scheduler.spawn(async move {
            while let Some(available) = next_notification(&mut rx, &spill).await {
                match scheduler.run(catch_panic(listener.on_availability(available))).await {
                    Some(Ok(())) => {}
                    Some(Err(panic)) => {
                        let info = panic_message(&*panic);
                        tracing::error!(backend = %backend, listener = listener.name(), info = %info, "listener panicked");
                        bus.publish(
                            Event::new(EventKind::ListenerPanicked)
                                .with_backend(Arc::clone(&backend))
                                .with_reason(format!("listener={} panic={info}", listener.name())),
                        );
                    }
                    None => break,
                }
            }
        });
    }
}

/// Queued notifications first, then the spilled one; `None` once the queue is closed
/// and nothing is left.
async fn next_notification(rx: &mut mpsc::Receiver<bool>, spill: &Mutex<Option<bool>>) -> Option<bool> {
    match rx.try_recv() {
        Ok(available) => return Some(available),
        Err(mpsc::error::TryRecvError::Disconnected) => return spill.lock().take(),
        Err(mpsc::error::TryRecvError::Empty) => {}
    }
    // A spill only happens while the queue is full, so an empty queue means any
    // spilled value is the newest one.
    if let Some(available) = spill.lock().take() {
        return Some(available);
    }
    match rx.recv().await {
        Some(available) => Some(available),
        None => spill.lock().take(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{InitFn, ListenerFn};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new("core", Scheduler::new(Some(4)), Bus::new(16))
    }

    #[tokio::test]
    async fn listener_sees_registration_then_transitions_in_order() {
        let reg = registry();
        let (tx, mut rx) = unbounded_channel();
        reg.add_listener(
            ListenerFn::arc("probe", move |a: bool| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(a);
                }
            }),
            false,
        );
        reg.notify(true);
        reg.notify(false);
        reg.notify(true);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen, vec![false, true, false, true]);
    }

    #[tokio::test]
    async fn initializer_is_taken_once() {
        let reg = registry();
        let id = reg
            .add_initializer(InitFn::arc("init", || async {}))
            .unwrap();

        assert_eq!(reg.drain_initializers().len(), 1);
        assert!(reg.take_initializer(id).is_none());
        assert_eq!(reg.initializer_count(), 0);
    }

    #[tokio::test]
    async fn deliver_runs_each_initializer() {
        let reg = registry();
        let hits = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = unbounded_channel();
        for _ in 0..3 {
            let (hits, done_tx) = (hits.clone(), done_tx.clone());
            reg.add_initializer(InitFn::arc("init", move || {
                let (hits, done_tx) = (hits.clone(), done_tx.clone());
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let _ = done_tx.send(());
                }
            }));
        }
        reg.deliver(reg.drain_initializers());
        for _ in 0..3 {
            done_rx.recv().await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn close_sends_final_false_and_clears() {
        let reg = registry();
        let (tx, mut rx) = unbounded_channel();
        reg.add_listener(
            ListenerFn::arc("probe", move |a: bool| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(a);
                }
            }),
            true,
        );
        reg.add_initializer(InitFn::arc("never", || async {}));

        reg.close();
        reg.close();

        assert_eq!(rx.recv().await, Some(true));
        assert_eq!(rx.recv().await, Some(false));
        // Worker exits once its queue is drained; the sender inside the closure goes with it.
        assert_eq!(rx.recv().await, None);
        assert_eq!(reg.listener_count(), 0);
        assert_eq!(reg.initializer_count(), 0);
        assert!(reg.add_initializer(InitFn::arc("late", || async {})).is_none());
    }

    struct Slow(tokio::sync::mpsc::UnboundedSender<bool>);

    #[async_trait::async_trait]
    impl Listener for Slow {
        async fn on_availability(&self, available: bool) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let _ = self.0.send(available);
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_coalesces_and_reports() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let reg = SubscriptionRegistry::new("core", Scheduler::new(None), bus);
        let (tx, _rx) = unbounded_channel();
        reg.add_listener(Arc::new(Slow(tx)), false);
        // Let the worker pick up the first notification and block in it.
        tokio::task::yield_now().await;
        reg.notify(true);
        reg.notify(false);

        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ListenerOverflow);
        assert_eq!(reg.listener_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_listener_still_ends_on_close() {
        let reg = registry();
        let (tx, mut rx) = unbounded_channel();
        reg.add_listener(Arc::new(Slow(tx)), false);
        tokio::task::yield_now().await;

        reg.notify(true);
        reg.notify(false);
        reg.notify(true);
        reg.close();

        let mut seen = Vec::new();
        while let Some(available) = rx.recv().await {
            seen.push(available);
        }
        assert_eq!(seen.first(), Some(&false));
        assert_eq!(seen.last(), Some(&false));
        assert!(seen.len() <= 3, "coalesced delivery expected, got {seen:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn spilled_value_follows_queued_ones() {
        let reg = registry();
        let (tx, mut rx) = unbounded_channel();
        reg.add_listener(Arc::new(Slow(tx)), true);
        tokio::task::yield_now().await;

        // Queue holds `false`; `true` then `false` coalesce into the spill.
        reg.notify(false);
        reg.notify(true);
        reg.notify(false);
        reg.notify(true);

        for expected in [true, false, true] {
            let got = tokio::time::timeout(Duration::from_secs(4 * 3600), rx.recv()).await;
            assert_eq!(got.ok().flatten(), Some(expected));
        }
    }
}
