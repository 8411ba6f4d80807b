//! # Stand-in for a client that cannot be used.
//!
//! While a supervisor is not connected, its api slot holds an [`UnavailableStub`]
//! instead of a live client. Every call against it fails with
//! [`ClientError::Unavailable`] carrying the current cause, without any backend
//! round-trip. A fresh stub is built on every failure so the cause is always current.

use std::sync::Arc;

use crate::error::ClientError;

/// Answers every operation with `Unavailable(cause)`.
#[derive(Clone, Debug)]
pub struct UnavailableStub {
    name: Arc<str>,
    cause: Arc<ClientError>,
}

impl UnavailableStub {
    /// Creates a stub for backend `name` failing with `cause`.
    ///
    /// An `Unavailable` cause is unwrapped so causes never nest.
    pub fn new(name: impl Into<Arc<str>>, cause: Arc<ClientError>) -> Self {
        let cause = match cause.as_ref() {
            ClientError::Unavailable { cause: inner, .. } => Arc::clone(inner),
            _ => cause,
        };
        Self {
            name: name.into(),
            cause,
        }
    }

    /// Stub for a closed supervisor.
    pub fn closed(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Arc::new(ClientError::Closed))
    }

    /// The reason calls fail.
    pub fn cause(&self) -> &Arc<ClientError> {
        &self.cause
    }

    /// The error every operation returns.
    pub fn error(&self) -> ClientError {
        ClientError::Unavailable {
            name: Arc::clone(&self.name),
            cause: Arc::clone(&self.cause),
        }
    }

    /// Fails any operation.
    pub fn call<T>(&self) -> Result<T, ClientError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_call_is_unavailable_with_cause() {
        let stub = UnavailableStub::new("core", Arc::new(ClientError::backend("refused")));
        let err = stub.call::<u32>().unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.root().as_label(), "client_backend");
    }

    #[test]
    fn closed_stub_reports_closed() {
        let err = UnavailableStub::closed("core").error();
        assert!(matches!(err.root(), ClientError::Closed));
    }
}
