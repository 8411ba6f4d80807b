//! Retry policies.
//!
//! This module groups the knobs that control **whether** a failed attempt is retried
//! and **how long** to wait before the next one.
//!
//! ## Contents
//! - [`RetryPolicy`]   attempt bound + backoff curve + abort predicate
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! Config { creation: RetryPolicy, reachability: RetryPolicy, .. }
//!      └─► core::retry::Retry uses:
//!           - policy.is_abort(err) to stop the sequence
//!           - policy.allows(attempt) to bound it
//!           - policy.delay(attempt) to schedule the next attempt
//! ```
//!
//! ## Defaults
//! - [`RetryPolicy::creation`]     → unbounded, 10ms → 60s, factor 2.0.
//! - [`RetryPolicy::reachability`] → unbounded, 1s → 120s, factor 2.0.
//! - `JitterPolicy::None` by default; consider `Equal` when many supervisors share a backend.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
