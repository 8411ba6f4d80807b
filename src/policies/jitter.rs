//! # Jitter for retry delays.
//!
//! Many supervisors usually point at the same backend. When it comes back they would all
//! retry on the same schedule; [`JitterPolicy`] spreads those attempts out.
//!
//! - [`JitterPolicy::None`]: exact delay
//! - [`JitterPolicy::Full`]: random in `[0, delay]`
//! - [`JitterPolicy::Equal`]: `delay/2 + random[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`]: random in `[floor, delay × 3]`, capped at the ceiling
//!
//! [`BackoffPolicy`](crate::BackoffPolicy) clamps every jittered value back into its
//! `[first, max]` window.

use std::time::Duration;

use rand::Rng;

/// Randomization applied to backoff delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: predictable delays (single supervisor, tests).
    #[default]
    None,
    /// Random delay in `[0, delay]`.
    Full,
    /// `delay/2 + random[0, delay/2]`; keeps ~75% of the delay on average.
    Equal,
    /// Random delay in `[floor, delay × 3]`, capped at the ceiling.
    ///
    /// Requires context, see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay`.
    ///
    /// `Decorrelated` returns the input unchanged here; use
    /// [`apply_decorrelated`](Self::apply_decorrelated).
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => random_ms(0, millis(delay)),
            JitterPolicy::Equal => {
                let half = millis(delay) / 2;
                Duration::from_millis(half) + random_ms(0, half)
            }
        }
    }

    /// Applies decorrelated jitter between `floor` and `min(delay × 3, max)`.
    ///
    /// Non-decorrelated policies fall back to [`apply`](Self::apply).
    pub fn apply_decorrelated(&self, floor: Duration, delay: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(delay);
        }
        let floor_ms = millis(floor);
        let upper = millis(delay).saturating_mul(3).min(millis(max)).max(floor_ms);
        random_ms(floor_ms, upper)
    }
}

#[inline]
fn millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Uniform random delay in `[lo, hi]` milliseconds.
fn random_ms(lo: u64, hi: u64) -> Duration {
    if lo >= hi {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}
