//! Diagnostic events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by supervisors, retry loops and
//! notification workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`RetrySource`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ConnectionSupervisor` (transitions), `core::retry` (attempts,
//!   backoff, re-arm), `SubscriptionRegistry` workers (listener overflow/panic),
//!   `SubscriberSet` workers (subscriber overflow/panic).
//! - **Consumers**: the forwarder spawned by `SupervisorBuilder`/`SupervisorPool`
//!   (fans out to `SubscriberSet`), or any caller of [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, RetrySource};
