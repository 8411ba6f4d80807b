//! # Availability listener.
//!
//! A [`Listener`] is registered with
//! [`ConnectionSupervisor::is_available_with`](crate::ConnectionSupervisor::is_available_with)
//! and lives until the supervisor closes.
//!
//! ## Rules
//! - Notified once right after registration with the availability at that moment.
//! - Then notified on every availability transition, in transition order.
//! - Notified a final time with `false` when the supervisor closes.
//! - Runs on its own worker; never on the task that performed the transition.
//!
//! ## Example
//! ```rust
//! use clientvisor::{Listener, ListenerFn};
//!
//! let l = ListenerFn::arc("readiness", |available: bool| async move {
//!     println!("backend available: {available}");
//! });
//! assert_eq!(l.name(), "readiness");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Receives availability changes.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Called with the new availability.
    async fn on_availability(&self, available: bool);

    /// Name used in logs and overflow/panic events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Pending notifications buffered for this listener (clamped to a minimum of 1).
    ///
    /// When full, further notifications coalesce into the latest one, delivered after
    /// the queue drains, and `ListenerOverflow` is published. The last delivery always
    /// matches the current availability.
    fn queue_capacity(&self) -> usize {
        64
    }
}

/// Function-backed listener.
#[derive(Debug)]
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    /// Creates a new function-backed listener.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Listener for ListenerFn<F>
where
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_availability(&self, available: bool) {
        (self.f)(available).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
