//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur during a single generation request.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The backend could not be reached.
    #[error("cannot connect to backend at {0}")]
    Connection(String),

    /// The request did not complete within the client timeout.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    /// The response body was not the expected JSON payload.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The client could not be constructed.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}
