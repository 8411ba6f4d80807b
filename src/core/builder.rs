use std::sync::Arc;

use crate::{
    client::{Client, Creator},
    core::{Config, ConnectionSupervisor, Scheduler},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a standalone [`ConnectionSupervisor`].
///
/// Without [`with_scheduler`](Self::with_scheduler) / [`with_bus`](Self::with_bus) the
/// supervisor gets its own scheduler (sized by `Config::workers`) and event bus. Use a
/// [`SupervisorPool`](crate::SupervisorPool) to share them across many backends.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use clientvisor::{Client, ClientError, Config, CreateFn, Creator, Handles, ProbeStatus, SupervisorBuilder};
///
/// struct Search;
///
/// #[async_trait]
/// impl Client for Search {
///     async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> {
///         Ok(Some(ProbeStatus::Ok))
///     }
/// }
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let creator: Arc<dyn Creator<Search>> = CreateFn::arc("search", |_ctx: CancellationToken| async {
///         Ok::<_, ClientError>(Handles::single(Arc::new(Search)))
///     });
///     let sup = SupervisorBuilder::new("products", creator)
///         .with_config(Config::default())
///         .build();
///
///     assert!(sup.wait_available(std::time::Duration::from_secs(1)).await);
///     sup.close().await;
/// }
/// ```
pub struct SupervisorBuilder<C: Client> {
    name: Arc<str>,
    creator: Arc<dyn Creator<C>>,
    cfg: Config,
    scheduler: Option<Arc<Scheduler>>,
    bus: Option<Bus>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<C: Client> SupervisorBuilder<C> {
    /// Creates a builder for backend `name`, created by `creator`.
    pub fn new(name: impl Into<Arc<str>>, creator: Arc<dyn Creator<C>>) -> Self {
        Self {
            name: name.into(),
            creator,
            cfg: Config::default(),
            scheduler: None,
            bus: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Runs background work on a shared scheduler instead of a private one.
    pub fn with_scheduler(mut self, scheduler: Arc<Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Publishes diagnostic events on a shared bus instead of a private one.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets diagnostic subscribers.
    ///
    /// Subscribers receive this supervisor's events through dedicated workers with
    /// bounded queues, until the supervisor is closed.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor and starts creating the client in the background.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Arc<ConnectionSupervisor<C>> {
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.cfg.bus_capacity_clamped()));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Scheduler::new(self.cfg.worker_limit()));

        // Subscribe before the supervisor starts so its first events are not missed.
        let forward = (!self.subscribers.is_empty()).then(|| {
            let set = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            (set, bus.subscribe())
        });

        let sup = ConnectionSupervisor::start(self.name, self.cfg, self.creator, scheduler, bus.clone());

        if let Some((set, rx)) = forward {
            set.forward_from(rx, sup.lifetime());
        }
        sup
    }
}
