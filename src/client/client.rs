//! # Live client handle abstraction.
//!
//! A [`Client`] is any backend connection the supervisor can ping and close. Domain
//! operations stay on the concrete type; callers reach them through
//! [`Proxy::call`](crate::Proxy::call).
//!
//! [`Handles`] pairs the client used for API traffic with the one used for health
//! probes, so probes can ride a transport without automatic retries.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientError;

/// Payload returned by [`Client::ping`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Backend reported success.
    Ok,
    /// Backend answered with a non-success status.
    Failed(String),
}

/// # Live backend connection.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use clientvisor::{Client, ClientError, ProbeStatus};
///
/// struct Search;
///
/// #[async_trait]
/// impl Client for Search {
///     async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> {
///         Ok(Some(ProbeStatus::Ok))
///     }
/// }
/// ```
#[async_trait]
pub trait Client: Send + Sync + 'static {
    /// Lightweight, side-effect-free reachability check.
    ///
    /// `Ok(None)` means the backend answered with an empty payload.
    async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError>;

    /// Releases the underlying connection. Called at most once per instance.
    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// The client exposed to callers and the client used for health probes.
///
/// Both may be the same instance ([`Handles::single`]).
pub struct Handles<C> {
    /// Client serving API traffic.
    pub api: Arc<C>,
    /// Client serving health probes.
    pub probe: Arc<C>,
}

impl<C> Clone for Handles<C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            probe: Arc::clone(&self.probe),
        }
    }
}

impl<C: Client> Handles<C> {
    /// One client for both roles.
    pub fn single(client: Arc<C>) -> Self {
        Self {
            probe: Arc::clone(&client),
            api: client,
        }
    }

    /// Distinct api and probe clients.
    pub fn split(api: Arc<C>, probe: Arc<C>) -> Self {
        Self { api, probe }
    }

    /// Whether api and probe are the same instance.
    pub fn is_shared(&self) -> bool {
        Arc::ptr_eq(&self.api, &self.probe)
    }

    /// Whether `client` is one of these handles.
    pub fn contains(&self, client: &Arc<C>) -> bool {
        Arc::ptr_eq(&self.api, client) || Arc::ptr_eq(&self.probe, client)
    }

    /// Distinct instances of these handles that `keep` does not also hold.
    pub(crate) fn retire(self, keep: Option<&Handles<C>>) -> Vec<Arc<C>> {
        let mut out = Vec::with_capacity(2);
        let shared = self.is_shared();
        for client in [self.api, self.probe] {
            if keep.is_some_and(|k| k.contains(&client)) {
                continue;
            }
            if shared && !out.is_empty() {
                continue;
            }
            out.push(client);
        }
        out
    }

    /// Closes every distinct instance, logging (never propagating) failures.
    pub(crate) async fn close(self, backend: &str) {
        close_all(backend, self.retire(None)).await;
    }
}

/// Closes each client once, swallowing errors so every close is attempted.
pub(crate) async fn close_all<C: Client>(backend: &str, clients: Vec<Arc<C>>) {
    for client in clients {
        if let Err(e) = client.close().await {
            tracing::warn!(backend, error = %e, "failed to close client");
        }
    }
}
