//! # One-shot initializer.
//!
//! An [`Initializer`] registered with
//! [`ConnectionSupervisor::when_available`](crate::ConnectionSupervisor::when_available)
//! runs exactly once, on the first availability (or right away when already
//! available), and is then discarded. If the supervisor closes first it never runs.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Runs once when the backend first becomes available.
#[async_trait]
pub trait Initializer: Send + Sync + 'static {
    /// Called once; availability is implied.
    async fn initialize(&self);

    /// Name used in logs and panic events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed initializer.
///
/// ## Example
/// ```rust
/// use clientvisor::{InitFn, Initializer};
///
/// let init = InitFn::arc("warm-cache", || async {
///     // load schema, prime caches ...
/// });
/// assert_eq!(init.name(), "warm-cache");
/// ```
#[derive(Debug)]
pub struct InitFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> InitFn<F> {
    /// Creates a new function-backed initializer.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the initializer and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Initializer for InitFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn initialize(&self) {
        (self.f)().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
