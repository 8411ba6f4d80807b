//! # Connection state and the caller-facing api slot.
//!
//! ```text
//!            create ok             probe ok
//! Creating ───────────► Connecting ─────────► Connected
//!    ▲                     │   ▲                  │
//!    └─ reachability ──────┘   └── probe/call ────┘
//!       exhausted                  failure
//!
//! any ── close() ──► Closed (terminal)
//! ```
//!
//! The state is mirrored into an `AtomicU8` so `is_available()` never takes a lock.

use std::fmt;
use std::sync::Arc;

use crate::client::UnavailableStub;

/// Lifecycle state of one supervised backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No client exists; creation is being retried.
    Creating = 0,
    /// A client exists but has not answered a probe yet.
    Connecting = 1,
    /// The client answered its last probe; calls reach the backend.
    Connected = 2,
    /// Terminal.
    Closed = 3,
}

impl ConnectionState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Creating,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Closed,
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectionState::Creating => "creating",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        }
    }

    /// Whether calls currently reach the backend.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// What a [`Proxy`](crate::Proxy) call is routed to.
pub(crate) enum ApiHandle<C> {
    Live(Arc<C>),
    Unavailable(UnavailableStub),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_round_trip_covers_every_state() {
        for s in [
            ConnectionState::Creating,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Closed,
        ] {
            assert_eq!(ConnectionState::from_u8(s as u8), s);
        }
        assert_eq!(ConnectionState::from_u8(200), ConnectionState::Closed);
    }

    #[test]
    fn only_connected_is_available() {
        assert!(ConnectionState::Connected.is_available());
        assert!(!ConnectionState::Connecting.is_available());
        assert_eq!(ConnectionState::Creating.to_string(), "creating");
    }
}
