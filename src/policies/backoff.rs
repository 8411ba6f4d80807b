//! # Backoff curve for retry sequences.
//!
//! [`BackoffPolicy`] controls how the delay between consecutive attempts grows.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the floor (delay after the first failure);
//! - [`BackoffPolicy::max`] the ceiling;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor (`1.0` = fixed unit).
//!
//! The delay after failure `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jittered, then clamped again into `[first, max]`. The base is derived from the
//! attempt number alone, so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use clientvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(10),
//!     max: Duration::from_secs(60),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(10));
//! assert_eq!(backoff.next(3), Duration::from_millis(80));
//! assert_eq!(backoff.next(30), Duration::from_secs(60));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure; also the floor for every delay.
    pub first: Duration,
    /// Ceiling for every delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a curve with:
    /// - `first = 100ms`;
    /// - `max = 30s`;
    /// - `factor = 2.0`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Exponential curve between `first` and `max` (factor 2, no jitter).
    pub const fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Fixed-unit curve: every delay is `unit`.
    pub const fn fixed(unit: Duration) -> Self {
        Self {
            first: unit,
            max: unit,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns the lower bound every delay respects (`first`, capped at `max`).
    #[inline]
    pub fn floor(&self) -> Duration {
        self.first.min(self.max)
    }

    /// Computes the delay after failure number `failure` (0-indexed).
    ///
    /// The result always lies in `[floor(), max]`, whatever the jitter.
    pub fn next(&self, failure: u32) -> Duration {
        let floor = self.floor();
        let max_secs = self.max.as_secs_f64();
        let exp = failure.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        let jittered = match self.jitter {
            JitterPolicy::Decorrelated => self.jitter.apply_decorrelated(floor, base, self.max),
            _ => self.jitter.apply(base),
        };
        jittered.clamp(floor, self.max)
    }
}
