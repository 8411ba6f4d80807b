//! Runtime core: supervision, scheduling and the caller-facing proxy.
//!
//! Public API from this module: [`ConnectionSupervisor`], [`Proxy`], [`Config`],
//! [`SupervisorBuilder`], [`SupervisorPool`], [`Scheduler`] and [`ConnectionState`].
//!
//! Internal modules:
//! - [`retry`]: runs one retry sequence with backoff, throttled warnings and events;
//! - [`state`]: the state enum and the api slot contents;
//! - [`supervisor`]: the state machine and its background jobs;
//! - [`pool`]: named supervisors sharing one scheduler and bus.

mod builder;
mod config;
mod pool;
mod proxy;
pub(crate) mod retry;
mod scheduler;
pub(crate) mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::Config;
pub use pool::SupervisorPool;
pub use proxy::Proxy;
pub use scheduler::Scheduler;
pub use state::ConnectionState;
pub use supervisor::ConnectionSupervisor;
