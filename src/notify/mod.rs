//! # Availability notifications.
//!
//! Callers learn about availability in two ways:
//!
//! - [`Listener`] - long-lived, notified with `true`/`false` on every transition
//!   (and once right after registration);
//! - [`Initializer`] - one-shot, invoked exactly once on the first availability.
//!
//! [`SubscriptionRegistry`] holds both and delivers on background tasks: a slow or
//! panicking callback never blocks the supervisor.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

mod initializer;
mod listener;
mod registry;

pub use initializer::{InitFn, Initializer};
pub use listener::{Listener, ListenerFn};
pub use registry::SubscriptionRegistry;

/// Polls `fut`, converting a panic into `Err(payload)`.
pub(crate) async fn catch_panic<F: Future>(fut: F) -> Result<F::Output, Box<dyn Any + Send>> {
    AssertUnwindSafe(fut).catch_unwind().await
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
