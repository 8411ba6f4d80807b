//! # Client creators.
//!
//! A [`Creator`] attempts to produce one set of live [`Handles`]. It must not retry
//! internally (the supervisor owns the retry policy) and should return promptly with
//! [`ClientError::Canceled`] once `ctx` is cancelled.
//!
//! [`CreateFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per attempt.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use clientvisor::{Client, ClientError, CreateFn, Creator, Handles, ProbeStatus};
//!
//! struct Search;
//!
//! #[async_trait]
//! impl Client for Search {
//!     async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> {
//!         Ok(Some(ProbeStatus::Ok))
//!     }
//! }
//!
//! let creator: Arc<dyn Creator<Search>> = CreateFn::arc("search", |_ctx: CancellationToken| async {
//!     Ok::<_, ClientError>(Handles::single(Arc::new(Search)))
//! });
//! assert_eq!(creator.name(), "search");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::{Client, Handles};
use crate::error::ClientError;

/// Produces one set of live handles per call.
#[async_trait]
pub trait Creator<C: Client>: Send + Sync + 'static {
    /// Human-readable creator name (logs only).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Attempts to create the handles once.
    ///
    /// Errors for which the creation policy's abort predicate holds (by default
    /// `Canceled` and `Fatal`) stop the current retry sequence; everything else is retried.
    async fn create(&self, ctx: CancellationToken) -> Result<Handles<C>, ClientError>;
}

/// Function-backed creator.
#[derive(Debug)]
pub struct CreateFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CreateFn<F> {
    /// Creates a new function-backed creator.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the creator and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<C, F, Fut> Creator<C> for CreateFn<F>
where
    C: Client,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Handles<C>, ClientError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, ctx: CancellationToken) -> Result<Handles<C>, ClientError> {
        (self.f)(ctx).await
    }
}
