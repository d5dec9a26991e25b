//! Error types for vaultsync-transport.

use thiserror::Error;

/// Outcome of a wire operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a status the operation does not accept.
    #[error("HTTP {code} {reason}")]
    Status { code: u16, reason: String },

    /// The request never produced a response (DNS, TLS, refused, reset, …).
    #[error("request failed: {0}")]
    Request(String),

    /// The request ran past the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Superseded or shut down before completion. Never a user-facing failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl TransportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        TransportError::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_builder() {
            TransportError::Client(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
