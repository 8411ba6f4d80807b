//! Error types shared by supervisors, clients and probes.
//!
//! [`ClientError`] is the single error family that flows through the crate:
//!
//! - returned by [`Client`](crate::Client) operations and [`Creator`](crate::Creator)s;
//! - produced by [`HealthChecker`](crate::HealthChecker) (always normalized to
//!   [`ClientError::Unavailable`]);
//! - handed to callers by [`Proxy::call`](crate::Proxy::call), which only ever surfaces
//!   `Unavailable` or whatever the live backend call itself returned.
//!
//! Classification helpers (`is_abort`, `is_retryable`) drive the retry loops; the
//! label/message helpers mirror the ones used for logs and events.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by backend clients and the supervision runtime.
///
/// Some errors stop a retry sequence immediately (`Canceled`, `Fatal`), the rest are
/// retried with backoff. Callers of a supervised client see either
/// [`ClientError::Unavailable`] (fast, no backend round-trip) or the backend's own error.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// The backend cannot currently be reached.
    ///
    /// This is the only error a caller gets while the supervisor is not connected.
    #[error("backend `{name}` is unavailable: {cause}")]
    Unavailable {
        /// Name of the supervised backend target.
        name: Arc<str>,
        /// The last known reason the backend is unavailable.
        #[source]
        cause: Arc<ClientError>,
    },

    /// A client exists but has not been proven reachable yet.
    #[error("client has not connected yet")]
    NotConnected,

    /// The supervisor was closed.
    #[error("client closed")]
    Closed,

    /// A backend or transport fault (retryable).
    #[error("backend error: {error}")]
    Backend {
        /// The underlying error message.
        error: String,
    },

    /// A health probe returned no payload.
    #[error("probe returned an empty response")]
    EmptyProbe,

    /// A health probe returned a non-success status payload.
    #[error("probe reported status `{status}`")]
    ProbeStatus {
        /// Status reported by the backend.
        status: String,
    },

    /// An operation or probe exceeded its timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable fault; aborts the current retry sequence.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The operation was cancelled (interruption); aborts the current retry sequence.
    #[error("operation cancelled")]
    Canceled,
}

impl ClientError {
    /// Shorthand for [`ClientError::Backend`].
    pub fn backend(error: impl std::fmt::Display) -> Self {
        ClientError::Backend {
            error: error.to_string(),
        }
    }

    /// Shorthand for [`ClientError::Fatal`].
    pub fn fatal(error: impl std::fmt::Display) -> Self {
        ClientError::Fatal {
            error: error.to_string(),
        }
    }

    /// Wraps `cause` into [`ClientError::Unavailable`] for the backend `name`.
    ///
    /// An `Unavailable` cause is unwrapped first so causes never nest.
    pub fn unavailable(name: impl Into<Arc<str>>, cause: Arc<ClientError>) -> Self {
        let cause = match cause.as_ref() {
            ClientError::Unavailable { cause: inner, .. } => Arc::clone(inner),
            _ => cause,
        };
        ClientError::Unavailable {
            name: name.into(),
            cause,
        }
    }

    /// Returns the innermost cause (looks through `Unavailable`).
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use clientvisor::ClientError;
    ///
    /// let err = ClientError::unavailable("core", Arc::new(ClientError::Canceled));
    /// assert!(matches!(err.root(), ClientError::Canceled));
    /// ```
    pub fn root(&self) -> &ClientError {
        match self {
            ClientError::Unavailable { cause, .. } => cause.root(),
            other => other,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use clientvisor::ClientError;
    ///
    /// assert_eq!(ClientError::EmptyProbe.as_label(), "client_empty_probe");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ClientError::Unavailable { .. } => "client_unavailable",
            ClientError::NotConnected => "client_not_connected",
            ClientError::Closed => "client_closed",
            ClientError::Backend { .. } => "client_backend",
            ClientError::EmptyProbe => "client_empty_probe",
            ClientError::ProbeStatus { .. } => "client_probe_status",
            ClientError::Timeout { .. } => "client_timeout",
            ClientError::Fatal { .. } => "client_fatal",
            ClientError::Canceled => "client_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ClientError::Unavailable { name, cause } => {
                format!("unavailable: backend={name} cause={}", cause.as_message())
            }
            ClientError::NotConnected => "not connected".to_string(),
            ClientError::Closed => "closed".to_string(),
            ClientError::Backend { error } => format!("error: {error}"),
            ClientError::EmptyProbe => "empty probe response".to_string(),
            ClientError::ProbeStatus { status } => format!("probe status: {status}"),
            ClientError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ClientError::Fatal { error } => format!("fatal: {error}"),
            ClientError::Canceled => "cancelled".to_string(),
        }
    }

    /// Indicates whether this is the canonical "backend unavailable" signal.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::Unavailable { .. })
    }

    /// Indicates whether the error stops a retry sequence immediately.
    ///
    /// Returns `true` when the root cause is [`ClientError::Canceled`] or
    /// [`ClientError::Fatal`].
    ///
    /// # Example
    /// ```
    /// use clientvisor::ClientError;
    ///
    /// assert!(ClientError::Canceled.is_abort());
    /// assert!(!ClientError::backend("connection refused").is_abort());
    /// ```
    pub fn is_abort(&self) -> bool {
        matches!(self.root(), ClientError::Canceled | ClientError::Fatal { .. })
    }

    /// Indicates whether the error is safe to retry (the complement of [`is_abort`](Self::is_abort)).
    pub fn is_retryable(&self) -> bool {
        !self.is_abort()
    }
}
