//! # LogWriter: diagnostic events as `tracing` records
//!
//! Transitions are logged at `info`/`warn`, attempt chatter at `debug`,
//! delivery problems at `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG clientvisor: attempt starting backend="catalog" source="creation" attempt=1
//! DEBUG clientvisor: backoff scheduled backend="catalog" source="creation" attempt=1 delay_ms=10 reason="backend error: refused"
//!  INFO clientvisor: client created backend="catalog"
//!  INFO clientvisor: connected backend="catalog"
//!  WARN clientvisor: disconnected backend="catalog" reason="..."
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let backend = e.backend.as_deref().unwrap_or("-");
        let source = e.source.map(|s| s.as_label()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::AttemptStarting => {
                tracing::debug!(backend, source, attempt = e.attempt, "attempt starting");
            }
            EventKind::AttemptFailed => {
                tracing::debug!(backend, source, attempt = e.attempt, reason, "attempt failed");
            }
            EventKind::BackoffScheduled => {
                tracing::debug!(
                    backend,
                    source,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    reason,
                    "backoff scheduled"
                );
            }
            EventKind::RetryRearmed => {
                tracing::warn!(
                    backend,
                    source,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    reason,
                    "retry sequence re-armed"
                );
            }
            EventKind::ClientCreated => tracing::info!(backend, "client created"),
            EventKind::Connected => tracing::info!(backend, "connected"),
            EventKind::Disconnected => tracing::warn!(backend, reason, "disconnected"),
            EventKind::Recreating => tracing::warn!(backend, reason, "recreating client"),
            EventKind::Closed => tracing::info!(backend, "closed"),
            EventKind::ListenerOverflow
            | EventKind::ListenerPanicked
            | EventKind::InitializerPanicked
            | EventKind::SubscriberOverflow
            | EventKind::SubscriberPanicked => {
                tracing::error!(backend, kind = ?e.kind, reason, "notification delivery problem");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
