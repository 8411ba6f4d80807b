//! # Caller-facing client proxy.
//!
//! A [`Proxy`] never caches the client. Each [`call`](Proxy::call) reads the
//! supervisor's api slot at call time, so a proxy obtained long ago routes to
//! whatever client is current now.
//!
//! ```text
//! call(op)
//!   ├─ api slot = stub ─► Err(Unavailable(cause))       (no backend round-trip)
//!   └─ api slot = live ─► op(client)
//!                          ├─ Ok                  ─► Ok
//!                          ├─ Err(Unavailable)    ─► Err, unchanged
//!                          └─ Err(other)          ─► re-probe once, then Err(other)
//!                                                      probe ok   → stays/returns Connected
//!                                                      probe fail → Connecting(cause)
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::client::Client;
use crate::core::{ConnectionSupervisor, state::ApiHandle};
use crate::error::ClientError;

/// Thin handle dispatching to the current client of a [`ConnectionSupervisor`].
pub struct Proxy<C: Client> {
    sup: Arc<ConnectionSupervisor<C>>,
}

impl<C: Client> Clone for Proxy<C> {
    fn clone(&self) -> Self {
        Self {
            sup: Arc::clone(&self.sup),
        }
    }
}

impl<C: Client> fmt::Debug for Proxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("backend", &self.sup.name())
            .field("state", &self.sup.state())
            .finish()
    }
}

impl<C: Client> Proxy<C> {
    pub(crate) fn new(sup: Arc<ConnectionSupervisor<C>>) -> Self {
        Self { sup }
    }

    /// The supervisor behind this proxy.
    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor<C>> {
        &self.sup
    }

    /// Runs `op` against the current client.
    ///
    /// While the backend is unavailable this fails fast with
    /// [`ClientError::Unavailable`]. Any other failure from `op` triggers one
    /// reachability re-check before it is returned unchanged.
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use async_trait::async_trait;
    /// # use clientvisor::{Client, ClientError, ProbeStatus, Proxy};
    /// struct Search;
    ///
    /// impl Search {
    ///     async fn count(&self, _q: &str) -> Result<u64, ClientError> {
    ///         Ok(0)
    ///     }
    /// }
    /// # #[async_trait]
    /// # impl Client for Search {
    /// #     async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> { Ok(Some(ProbeStatus::Ok)) }
    /// # }
    ///
    /// async fn hits(proxy: &Proxy<Search>) -> Result<u64, ClientError> {
    ///     proxy.call(|c| async move { c.count("*:*").await }).await
    /// }
    /// ```
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, ClientError>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let client = match self.sup.api_handle().as_ref() {
            ApiHandle::Live(client) => Arc::clone(client),
            ApiHandle::Unavailable(stub) => return stub.call(),
        };

        match op(Arc::clone(&client)).await {
            Ok(value) => Ok(value),
            // Interrupted or already-classified failures say nothing new about reachability.
            Err(e) if e.is_unavailable() || matches!(e, ClientError::Canceled) => Err(e),
            Err(e) => {
                tracing::debug!(backend = %self.sup.name(), error = %e, "call failed, re-checking reachability");
                self.sup.recheck_after_failure(client).await;
                Err(e)
            }
        }
    }

    /// Shorthand for [`ConnectionSupervisor::is_available`].
    pub fn is_available(&self) -> bool {
        self.sup.is_available()
    }
}
