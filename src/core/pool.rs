//! # Supervisor pool: one supervisor per named backend target.
//!
//! The pool owns what supervisors share: one [`Scheduler`] (the bounded worker pool),
//! one event [`Bus`] and, optionally, a [`SubscriberSet`] forwarding that bus to
//! diagnostic subscribers.
//!
//! ```text
//! get_or_create("products") ──► existing? ─yes─► same Arc<ConnectionSupervisor>
//!                                   └─no──► ConnectionSupervisor::start(shared scheduler, bus)
//! remove("products")        ──► take out of the map ──► close()
//! close_all()               ──► drain the map ──► close() each ──► stop forwarding
//! ```
//!
//! ## Rules
//! - Names are unique; `get_or_create` never builds a second supervisor for a name.
//! - The map lock is never held across `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::{Client, Creator};
use crate::core::{Config, ConnectionSupervisor, Scheduler};
use crate::events::{Bus, Event};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Named supervisors sharing one scheduler and one event bus.
pub struct SupervisorPool<C: Client> {
    cfg: Config,
    scheduler: Arc<Scheduler>,
    bus: Bus,
    forwarding: CancellationToken,
    supervisors: RwLock<HashMap<Arc<str>, Arc<ConnectionSupervisor<C>>>>,
}

impl<C: Client> SupervisorPool<C> {
    /// Creates an empty pool; every supervisor it builds uses `cfg`.
    pub fn new(cfg: Config) -> Self {
        Self {
            scheduler: Scheduler::new(cfg.worker_limit()),
            bus: Bus::new(cfg.bus_capacity_clamped()),
            forwarding: CancellationToken::new(),
            supervisors: RwLock::new(HashMap::new()),
            cfg,
        }
    }

    /// Creates an empty pool whose events are fanned out to `subscribers`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_subscribers(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let pool = Self::new(cfg);
        if !subscribers.is_empty() {
            let set = Arc::new(SubscriberSet::new(subscribers, pool.bus.clone()));
            set.forward(&pool.bus, pool.forwarding.clone());
        }
        pool
    }

    /// Returns the supervisor for `name`, starting one with `creator()` if none exists.
    ///
    /// `creator` is only called when a new supervisor is started. Must be called within
    /// a Tokio runtime.
    pub fn get_or_create<F>(&self, name: &str, creator: F) -> Arc<ConnectionSupervisor<C>>
    where
        F: FnOnce() -> Arc<dyn Creator<C>>,
    {
        if let Some(sup) = self.supervisors.read().get(name) {
            return Arc::clone(sup);
        }

        let mut map = self.supervisors.write();
        if let Some(sup) = map.get(name) {
            return Arc::clone(sup);
        }
        let key: Arc<str> = Arc::from(name);
        let sup = ConnectionSupervisor::start(
            Arc::clone(&key),
            self.cfg.clone(),
            creator(),
            Arc::clone(&self.scheduler),
            self.bus.clone(),
        );
        map.insert(key, Arc::clone(&sup));
        sup
    }

    /// Returns the supervisor for `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<ConnectionSupervisor<C>>> {
        self.supervisors.read().get(name).cloned()
    }

    /// Removes and closes the supervisor for `name`; `false` if there was none.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = self.supervisors.write().remove(name);
        match removed {
            Some(sup) => {
                sup.close().await;
                true
            }
            None => false,
        }
    }

    /// Sorted names of all supervisors.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.supervisors.read().keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Number of supervisors.
    pub fn len(&self) -> usize {
        self.supervisors.read().len()
    }

    /// Whether the pool holds no supervisors.
    pub fn is_empty(&self) -> bool {
        self.supervisors.read().is_empty()
    }

    /// Closes every supervisor and stops forwarding events to subscribers.
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.supervisors.write().drain().collect();
        for (name, sup) in drained {
            tracing::debug!(backend = %name, "closing pooled supervisor");
            sup.close().await;
        }
        self.forwarding.cancel();
    }

    /// The shared scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Subscribes to the shared diagnostic event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}
