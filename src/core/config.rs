//! # Supervisor configuration.
//!
//! Provides [`Config`], the centralized settings for supervisors and their shared
//! scheduler.
//!
//! Config is used in two ways:
//! 1. **Pool creation**: `SupervisorPool::new(config)` sizes the shared [`Scheduler`](crate::Scheduler)
//! 2. **Supervisor creation**: each supervisor copies the retry/probe settings
//!
//! ## Sentinel values
//! - `workers = 0` → unlimited background work
//! - `probe_timeout = 0s` → probes never time out
//! - `monitor_interval = 0s` → no periodic health monitor
//!
//! Values are taken as given; the only normalization is the clamping done by the
//! accessors below.

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Configuration for supervisors.
///
/// ## Field semantics
/// - `workers`: concurrent background work shared by all supervisors on one scheduler (`0` = unlimited)
/// - `creation`: retry rules while `Creating`
/// - `reachability`: retry rules while `Connecting`
/// - `probe_refresh`: minimum age of the last probe before `is_available()` refreshes it
/// - `probe_timeout`: per-probe timeout (`0s` = none)
/// - `monitor_interval`: periodic probe while `Connected` (`0s` = disabled)
/// - `warn_interval`: quiet period between repeated failure warnings
/// - `bus_capacity`: diagnostic event ring buffer size (min 1)
/// - `sync_recheck`: run the post-failure probe on the caller's task (`false` = in background)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum concurrent background work units (attempts, probes, deliveries).
    pub workers: usize,

    /// Retry policy for client creation.
    pub creation: RetryPolicy,

    /// Retry policy for reachability probes.
    ///
    /// When bounded (`max_attempts = Some(n)`), `n` consecutive probe failures
    /// discard the client and restart creation.
    pub reachability: RetryPolicy,

    /// Minimum interval between opportunistic probes triggered by `is_available()`.
    pub probe_refresh: Duration,

    /// Per-probe timeout.
    pub probe_timeout: Duration,

    /// Interval of the background health monitor while connected.
    pub monitor_interval: Duration,

    /// Minimum quiet interval between two failure warnings of one kind.
    ///
    /// Every attempt is still logged at `debug`.
    pub warn_interval: Duration,

    /// Capacity of the diagnostic event bus.
    pub bus_capacity: usize,

    /// Whether the dual-check probe after a failed API call runs synchronously
    /// on the caller's task before the error is returned.
    pub sync_recheck: bool,
}

impl Config {
    /// Returns the worker limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` concurrent work units
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.workers == 0 {
            None
        } else {
            Some(self.workers)
        }
    }

    /// Returns the per-probe timeout as an `Option`.
    #[inline]
    pub fn probe_timeout(&self) -> Option<Duration> {
        if self.probe_timeout == Duration::ZERO {
            None
        } else {
            Some(self.probe_timeout)
        }
    }

    /// Returns the monitor interval as an `Option` (`None` = disabled).
    #[inline]
    pub fn monitor_interval(&self) -> Option<Duration> {
        if self.monitor_interval == Duration::ZERO {
            None
        } else {
            Some(self.monitor_interval)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 128`
    /// - `creation = RetryPolicy::creation()` (10ms → 60s, unbounded)
    /// - `reachability = RetryPolicy::reachability()` (1s → 120s, unbounded)
    /// - `probe_refresh = 30s`
    /// - `probe_timeout = 10s`
    /// - `monitor_interval = 0s` (disabled)
    /// - `warn_interval = 60s`
    /// - `bus_capacity = 1024`
    /// - `sync_recheck = true`
    fn default() -> Self {
        Self {
            workers: 128,
            creation: RetryPolicy::creation(),
            reachability: RetryPolicy::reachability(),
            probe_refresh: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            monitor_interval: Duration::ZERO,
            warn_interval: Duration::from_secs(60),
            bus_capacity: 1024,
            sync_recheck: true,
        }
    }
}
