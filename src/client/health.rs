//! # Reachability probes.
//!
//! [`HealthChecker`] pings a client and folds every failure shape into one:
//!
//! ```text
//! ping() ─► Ok(Some(Ok))        ─► Ok(())
//!        ─► Ok(Some(Failed(s))) ─► Unavailable(ProbeStatus{s})
//!        ─► Ok(None)            ─► Unavailable(EmptyProbe)
//!        ─► Err(e)              ─► Unavailable(e)
//!        ─► (timeout)           ─► Unavailable(Timeout)
//!        ─► (panic)             ─► Unavailable(Fatal)
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::client::{Client, ProbeStatus};
use crate::error::ClientError;
use crate::notify::{catch_panic, panic_message};

/// Issues probes and classifies the result as healthy/unhealthy.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealthChecker {
    timeout: Option<Duration>,
}

impl HealthChecker {
    /// Creates a checker; `None` disables the per-probe timeout.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Per-probe timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Probes `client` on behalf of backend `name`.
    ///
    /// Returns `Ok(())` when healthy, otherwise always [`ClientError::Unavailable`].
    pub async fn check<C: Client + ?Sized>(&self, name: &Arc<str>, client: &C) -> Result<(), ClientError> {
        let ping = async {
            match catch_panic(client.ping()).await {
                Ok(res) => res,
                Err(panic) => Err(ClientError::fatal(format!("probe panicked: {}", panic_message(&*panic)))),
            }
        };
        let res = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, ping).await {
                Ok(res) => res,
                Err(_elapsed) => Err(ClientError::Timeout { timeout }),
            },
            None => ping.await,
        };

        let cause = match res {
            Ok(Some(ProbeStatus::Ok)) => return Ok(()),
            Ok(Some(ProbeStatus::Failed(status))) => ClientError::ProbeStatus { status },
            Ok(None) => ClientError::EmptyProbe,
            Err(e) => e,
        };
        Err(ClientError::unavailable(Arc::clone(name), Arc::new(cause)))
    }
}
