//! # Diagnostic subscriber trait.
//!
//! Each subscriber gets a dedicated worker task and a bounded queue
//! (capacity via [`Subscribe::queue_capacity`]). Panics are caught and reported as
//! `EventKind::SubscriberPanicked`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use clientvisor::{Event, EventKind, Subscribe};
//!
//! struct Outages;
//!
//! #[async_trait]
//! impl Subscribe for Outages {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::Disconnected) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "outages" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Diagnostic event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event (FIFO per subscriber, never on the publisher's task).
    async fn on_event(&self, event: &Event);

    /// Name used in logs and overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
