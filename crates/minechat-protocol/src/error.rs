//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding server responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The response line is not valid JSON.
    #[error("Invalid JSON response {line:?}: {reason}")]
    InvalidJson { line: String, reason: String },

    /// The response is JSON but not a credentials object.
    #[error("Malformed credentials response: {reason}")]
    MalformedCredentials { reason: String },

    /// The server answered `null` where credentials are mandatory.
    #[error("Server returned no credentials for registration")]
    MissingCredentials,
}
