//! # Retry policy: bound, curve and abort rules for one retry sequence.
//!
//! A supervisor runs two independent sequences, each governed by a [`RetryPolicy`]:
//!
//! ```text
//! Creating   ── creation policy ──────► create() until a client exists
//! Connecting ── reachability policy ──► probe()  until the client answers
//! ```
//!
//! A policy is a plain `Copy` value: optional attempt bound, a [`BackoffPolicy`], and an
//! abort predicate. Errors matching the predicate stop the sequence immediately;
//! everything else is retried.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use clientvisor::{ClientError, RetryPolicy};
//!
//! let policy = RetryPolicy::creation().with_max_attempts(3);
//!
//! assert!(policy.allows(3));
//! assert!(!policy.allows(4));
//! assert!(policy.is_abort(&ClientError::Canceled));
//! assert_eq!(policy.delay(1), Duration::from_millis(10));
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::ClientError;
use crate::policies::backoff::BackoffPolicy;

/// Predicate deciding whether an error aborts the current retry sequence.
pub type AbortPredicate = fn(&ClientError) -> bool;

/// Declarative retry rules for one sequence of attempts.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts per sequence (`None` = unbounded).
    pub max_attempts: Option<u32>,
    /// Delay curve between attempts.
    pub backoff: BackoffPolicy,
    /// Errors for which the sequence stops immediately.
    pub abort_on: AbortPredicate,
}

impl RetryPolicy {
    /// Policy for client creation.
    ///
    /// Unbounded (the backend may be down for a long time at startup), aborts on
    /// cancellation and fatal faults, exponential from 10ms up to 60s.
    pub fn creation() -> Self {
        Self {
            max_attempts: None,
            backoff: BackoffPolicy::exponential(Duration::from_millis(10), Duration::from_secs(60)),
            abort_on: ClientError::is_abort,
        }
    }

    /// Policy for reachability probes.
    ///
    /// Unbounded, same abort rules, exponential from 1s up to 120s.
    pub fn reachability() -> Self {
        Self {
            max_attempts: None,
            backoff: BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(120)),
            abort_on: ClientError::is_abort,
        }
    }

    /// Returns a copy bounded to `n` attempts per sequence (min 1).
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n.max(1));
        self
    }

    /// Returns a copy with a different backoff curve.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a copy with a different abort predicate.
    pub fn with_abort_on(mut self, abort_on: AbortPredicate) -> Self {
        self.abort_on = abort_on;
        self
    }

    /// Whether `err` stops the sequence immediately.
    #[inline]
    pub fn is_abort(&self, err: &ClientError) -> bool {
        (self.abort_on)(err)
    }

    /// Whether attempt number `attempt` (1-based) may run.
    #[inline]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[inline]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.next(attempt.saturating_sub(1))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded() {
        assert!(RetryPolicy::creation().allows(u32::MAX));
        assert!(RetryPolicy::reachability().allows(u32::MAX));
    }

    #[test]
    fn reachability_is_coarser_than_creation() {
        let creation = RetryPolicy::creation();
        let reach = RetryPolicy::reachability();
        assert!(reach.backoff.first > creation.backoff.first);
        assert!(reach.backoff.max > creation.backoff.max);
        assert_eq!(reach.delay(1), Duration::from_secs(1));
        assert_eq!(reach.delay(100), Duration::from_secs(120));
    }

    #[test]
    fn custom_abort_predicate() {
        fn never(_: &ClientError) -> bool {
            false
        }
        let policy = RetryPolicy::creation().with_abort_on(never);
        assert!(!policy.is_abort(&ClientError::Canceled));
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let policy = RetryPolicy::creation().with_max_attempts(0);
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }
}
