//! # Diagnostic events emitted by supervisors.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Attempt events**: creation/probe attempts and their backoff
//! - **Transition events**: state machine moves (connected, disconnected, closed, ...)
//! - **Notification events**: listener/initializer delivery problems
//! - **Subscriber events**: diagnostic subscriber overflow/panic
//!
//! The [`Event`] struct carries metadata such as timestamps, backend name,
//! attempt numbers, reasons and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use clientvisor::{Event, EventKind, RetrySource};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_backend("catalog")
//!     .with_source(RetrySource::Creation)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(80))
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.backend.as_deref(), Some("catalog"));
//! assert_eq!(ev.delay_ms, Some(80));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Diagnostic subscriber panicked while processing an event.
    ///
    /// Sets: `backend` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Diagnostic subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `backend` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Notification events ===
    /// Availability listener panicked.
    ///
    /// Sets: `backend`, `reason` (listener name and panic message).
    ListenerPanicked,

    /// A listener queue filled up; its notifications are coalesced until it drains.
    ///
    /// Sets: `backend`, `reason` (listener name).
    ListenerOverflow,

    /// One-shot initializer panicked.
    ///
    /// Sets: `backend`, `reason` (initializer name and panic message).
    InitializerPanicked,

    // === Attempt events ===
    /// A creation or probe attempt is starting.
    ///
    /// Sets: `backend`, `source`, `attempt` (1-based within the sequence).
    AttemptStarting,

    /// A creation or probe attempt failed.
    ///
    /// Sets: `backend`, `source`, `attempt`, `reason`.
    AttemptFailed,

    /// Next attempt scheduled after a failure.
    ///
    /// Sets: `backend`, `source`, `attempt` (the failed one), `delay_ms`, `reason`.
    BackoffScheduled,

    /// A retry sequence stopped (abort or attempt bound); a fresh one is re-armed.
    ///
    /// Sets: `backend`, `source`, `attempt`, `delay_ms` (re-arm delay), `reason`.
    RetryRearmed,

    // === Transition events ===
    /// `Creating → Connecting`: a client was created and awaits its first probe.
    ///
    /// Sets: `backend`.
    ClientCreated,

    /// `Connecting → Connected`.
    ///
    /// Sets: `backend`.
    Connected,

    /// `Connected → Connecting`: the backend stopped answering.
    ///
    /// Sets: `backend`, `reason`.
    Disconnected,

    /// `Connecting → Creating`: reachability gave up and the client is rebuilt.
    ///
    /// Sets: `backend`, `reason`.
    Recreating,

    /// `* → Closed`.
    ///
    /// Sets: `backend`.
    Closed,
}

/// Which retry sequence an attempt event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrySource {
    /// Client creation (`Creating`).
    Creation,
    /// Reachability probing (`Connecting`, background refresh, monitor).
    Reachability,
}

impl RetrySource {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetrySource::Creation => "creation",
            RetrySource::Reachability => "reachability",
        }
    }
}

/// Diagnostic event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Backend target (or subscriber) name, if applicable.
    pub backend: Option<Arc<str>>,
    /// Retry sequence, for attempt events.
    pub source: Option<RetrySource>,
    /// Attempt number (1-based within its sequence).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            backend: None,
            source: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a backend name.
    #[inline]
    pub fn with_backend(mut self, backend: impl Into<Arc<str>>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Attaches the retry sequence.
    #[inline]
    pub fn with_source(mut self, source: RetrySource) -> Self {
        self.source = Some(source);
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_backend(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_backend(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Whether this event reports a state transition.
    #[inline]
    pub fn is_transition(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ClientCreated
                | EventKind::Connected
                | EventKind::Disconnected
                | EventKind::Recreating
                | EventKind::Closed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::Connected);
        let b = Event::new(EventKind::Disconnected);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_saturated_to_u32() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn transitions_are_classified() {
        assert!(Event::new(EventKind::Closed).is_transition());
        assert!(!Event::new(EventKind::AttemptFailed).is_transition());
    }
}
