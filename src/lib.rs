//! # clientvisor
//!
//! **Clientvisor** keeps connections to remote backends usable without ever making a
//! caller wait for them.
//!
//! One [`ConnectionSupervisor`] per named backend target creates the client in the
//! background, proves it reachable, detects outages, recovers, and tells interested
//! code when availability changes. Callers hold a [`Proxy`] that fails fast with
//! [`ClientError::Unavailable`] while the backend is down and routes to the live client
//! once it is back.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Supervisor  │   │  Supervisor  │   │  Supervisor  │
//!     │  "products"  │   │   "orders"   │   │   "users"    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │  retry loops, probes, notifications │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (shared, bounded by Config::workers)                   │
//! └───────────────────────────────────────────────────────────────────┘
//!            │                  │                  │
//!            │ publish(Event)   │                  │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                  Bus (broadcast, Config::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                         forwarder ─► SubscriberSet
//!                                  ┌─────────┼─────────┐
//!                                  ▼         ▼         ▼
//!                               worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! Creating ──create ok──► Connecting ──probe ok──► Connected
//!    ▲                       │   ▲                     │
//!    └─ reachability bound ──┘   └── call/probe fails ─┘
//!
//! Proxy::call(op)
//!   ├─ not connected ─► Err(Unavailable(cause))   (no backend round-trip)
//!   └─ connected     ─► op(client)
//!                        └─ Err(other) ─► re-probe once ─► Connected | Connecting
//!                                          └─► Err(other) returned unchanged
//!
//! close() ──► Closed: pending work cancelled, client closed, listeners told `false`
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Per-backend state machine, fail-fast proxy, pools.            | [`ConnectionSupervisor`], [`Proxy`], [`SupervisorPool`] |
//! | **Clients**       | What a backend client provides; how it is created and probed. | [`Client`], [`Creator`], [`HealthChecker`]  |
//! | **Notifications** | Availability listeners and one-shot initializers.             | [`Listener`], [`Initializer`]               |
//! | **Policies**      | Retry bounds, backoff curves, jitter.                         | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Diagnostics**   | Events for every attempt and transition.                      | [`Event`], [`Subscribe`]                    |
//! | **Errors**        | One typed error family.                                       | [`ClientError`]                             |
//! | **Configuration** | Centralized settings.                                         | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use clientvisor::{
//!     Client, ClientError, Config, CreateFn, Creator, Handles, InitFn, ProbeStatus, SupervisorPool,
//! };
//!
//! struct Search;
//!
//! impl Search {
//!     async fn count(&self, _query: &str) -> Result<u64, ClientError> {
//!         Ok(42)
//!     }
//! }
//!
//! #[async_trait]
//! impl Client for Search {
//!     async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> {
//!         Ok(Some(ProbeStatus::Ok))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ClientError> {
//!     let pool: SupervisorPool<Search> = SupervisorPool::new(Config::default());
//!     let sup = pool.get_or_create("products", || -> Arc<dyn Creator<Search>> {
//!         CreateFn::arc("search", |_ctx: CancellationToken| async {
//!             Ok::<_, ClientError>(Handles::single(Arc::new(Search)))
//!         })
//!     });
//!
//!     sup.when_available(InitFn::arc("warmup", || async {
//!         println!("products is up");
//!     }));
//!
//!     let search = sup.client();
//!     if sup.wait_available(Duration::from_secs(1)).await {
//!         let hits = search.call(|c| async move { c.count("*:*").await }).await?;
//!         assert_eq!(hits, 42);
//!     }
//!
//!     pool.close_all().await;
//!     Ok(())
//! }
//! ```
mod client;
mod core;
mod error;
mod events;
mod notify;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use client::{Client, CreateFn, Creator, Handles, HealthChecker, ProbeStatus, UnavailableStub};
pub use core::{
    Config, ConnectionState, ConnectionSupervisor, Proxy, Scheduler, SupervisorBuilder,
    SupervisorPool,
};
pub use error::ClientError;
pub use events::{Bus, Event, EventKind, RetrySource};
pub use notify::{InitFn, Initializer, Listener, ListenerFn, SubscriptionRegistry};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
