//! # Backend client capabilities.
//!
//! The supervisor wraps any backend client; this module defines what it needs from one
//! and the pieces it builds around it:
//!
//! - [`Client`] - a live handle: cheap `ping`, independent `close`
//! - [`Handles`] - the api client plus the (possibly distinct) probe client
//! - [`Creator`] / [`CreateFn`] - produce one set of handles per call, never retry internally
//! - [`UnavailableStub`] - answers every call with `Unavailable(cause)`
//! - [`HealthChecker`] - probes a handle and normalizes every failure shape

mod client;
mod creator;
mod health;
mod stub;

pub use client::{Client, Handles, ProbeStatus};
pub use creator::{CreateFn, Creator};
pub use health::HealthChecker;
pub use stub::UnavailableStub;
