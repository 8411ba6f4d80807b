//! # Diagnostic subscribers.
//!
//! Subscribers observe the [`Event`](crate::Event)s published on a supervisor's
//! [`Bus`](crate::Bus): logging, metrics, alerting. They are independent from
//! availability [`Listener`](crate::Listener)s, which receive only `bool` transitions.
//!
//! ## Architecture
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► forwarder ──► SubscriberSet::emit(&Event)
//!                                                          │
//!                                                ┌─────────┼─────────┐
//!                                                ▼         ▼         ▼
//!                                            LogWriter  Metrics   Custom
//! ```
//!
//! - [`Subscribe`]: the extension trait
//! - [`SubscriberSet`]: per-subscriber bounded queues and workers
//! - `LogWriter` (feature `logging`): renders events through `tracing`

mod embedded;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
