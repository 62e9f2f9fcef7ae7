//! Error types for the qweb client.
//!
//! # Design
//! A non-200 response is not an error: it is a `PostOutcome::Failure`
//! carrying the response text. Errors are reserved for things that prevent
//! an outcome from existing at all: a payload that cannot be serialized, a
//! transport that never produced a response, or a background task that died.

use thiserror::Error;

/// Errors returned by the encoders and the `Result`-typed client calls.
#[derive(Debug, Error)]
pub enum QwebError {
    /// The value passed to `json_to_bytes` could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The exchange ended without an HTTP response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The blocking task running the exchange panicked or was cancelled.
    #[error("request task failed: {0}")]
    Join(String),
}

/// A transport-level failure: no HTTP status was ever received.
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        Self::new(err.to_string())
    }
}
