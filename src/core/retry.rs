//! # Retry loop: one sequence of attempts under a [`RetryPolicy`].
//!
//! Both supervisor sequences (creation and reachability) run through [`Retry::run`].
//!
//! ## Event flow
//! ```text
//! AttemptStarting → [attempt] → Ok        → Done
//!                             → Err       → AttemptFailed
//!                                            ├─ abort predicate   → Aborted
//!                                            ├─ bound reached     → Exhausted
//!                                            └─ BackoffScheduled → [sleep] → next attempt
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one loop
//! - Each attempt holds one scheduler worker; backoff sleeps hold none
//! - Cancellation is checked before each attempt, races the attempt and the sleep;
//!   the result of an attempt that lost the race is discarded
//! - Every failure is logged at `debug`; `warn` is throttled by [`WarnThrottle`]
//! - A panicking attempt counts as a fatal failure, so the sequence aborts and the
//!   caller re-arms it

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{select, time, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::core::Scheduler;
use crate::error::ClientError;
use crate::events::{Bus, Event, EventKind, RetrySource};
use crate::notify::{catch_panic, panic_message};
use crate::policies::RetryPolicy;

/// How one retry sequence ended.
#[derive(Debug)]
pub(crate) enum Outcome<T> {
    /// An attempt succeeded.
    Done(T),
    /// The token was cancelled (or the scheduler shut down).
    Cancelled,
    /// The policy's abort predicate matched.
    Aborted { attempt: u32, error: ClientError },
    /// The policy's attempt bound was reached.
    Exhausted { attempt: u32, error: ClientError },
}

/// Lets one `warn!` through per interval; the first one always passes.
#[derive(Debug)]
pub(crate) struct WarnThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl WarnThrottle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub(crate) fn should_warn(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(at) if now.saturating_duration_since(at) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// Everything a retry loop needs, owned so the loop holds no supervisor reference
/// across its sleeps.
pub(crate) struct Retry {
    pub backend: Arc<str>,
    pub source: RetrySource,
    pub policy: RetryPolicy,
    pub bus: Bus,
    pub throttle: Arc<WarnThrottle>,
    pub scheduler: Arc<Scheduler>,
}

impl Retry {
    /// Runs attempts until success, abort, exhaustion or cancellation.
    ///
    /// `op` receives the 1-based attempt number. `initial_delay` postpones the first
    /// attempt (used when a sequence is re-armed).
    pub(crate) async fn run<T, F, Fut>(
        &self,
        token: &CancellationToken,
        initial_delay: Option<Duration>,
        mut op: F,
    ) -> Outcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some(delay) = initial_delay {
            if !sleep(token, delay).await {
                return Outcome::Cancelled;
            }
        }

        let mut attempt: u32 = 0;
        loop {
            if token.is_cancelled() {
                return Outcome::Cancelled;
            }
            attempt = attempt.saturating_add(1);
            self.publish(Event::new(EventKind::AttemptStarting).with_attempt(attempt));

            let res = select! {
                res = self.scheduler.run(catch_panic(op(attempt))) => res,
                _ = token.cancelled() => return Outcome::Cancelled,
            };
            let error = match res {
                None => return Outcome::Cancelled,
                Some(Ok(Ok(value))) => return Outcome::Done(value),
                Some(Ok(Err(e))) => e,
                Some(Err(panic)) => {
                    let info = panic_message(&*panic);
                    tracing::error!(
                        backend = %self.backend,
                        source = self.source.as_label(),
                        attempt,
                        info = %info,
                        "attempt panicked"
                    );
                    ClientError::fatal(format!("attempt panicked: {info}"))
                }
            };
            if token.is_cancelled() {
                return Outcome::Cancelled;
            }

            self.log_failure(attempt, &error);
            self.publish(
                Event::new(EventKind::AttemptFailed)
                    .with_attempt(attempt)
                    .with_reason(error.as_message()),
            );

            if self.policy.is_abort(&error) {
                return Outcome::Aborted { attempt, error };
            }
            if !self.policy.allows(attempt.saturating_add(1)) {
                return Outcome::Exhausted { attempt, error };
            }

            let delay = self.policy.delay(attempt);
            self.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(error.as_message()),
            );
            if !sleep(token, delay).await {
                return Outcome::Cancelled;
            }
        }
    }

    fn log_failure(&self, attempt: u32, error: &ClientError) {
        let source = self.source.as_label();
        tracing::debug!(backend = %self.backend, source, attempt, error = %error, "attempt failed");
        if self.throttle.should_warn() {
            tracing::warn!(
                backend = %self.backend,
                source,
                attempt,
                error = %error,
                "backend attempt failed, retrying in background"
            );
        }
    }

    fn publish(&self, ev: Event) {
        self.bus
            .publish(ev.with_backend(Arc::clone(&self.backend)).with_source(self.source));
    }
}

/// Cancellable sleep; `false` when cancelled.
pub(crate) async fn sleep(token: &CancellationToken, delay: Duration) -> bool {
    select! {
        _ = time::sleep(delay) => true,
        _ = token.cancelled() => false,
    }
}
