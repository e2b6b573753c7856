//! Errors from a single API call.

use std::io;
use thiserror::Error;

/// Why one request to the storage server failed.
///
/// `Business` is the only variant whose message is meant for the user; all
/// others are transport-level failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Curl reported an error (connect, timeout, DNS, ...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// Chunk bytes could not be read from the source file mid-transfer.
    #[error("read chunk: {0}")]
    Read(#[source] io::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Envelope code other than 200; `message` is the server's text.
    #[error("{message}")]
    Business { code: i64, message: String },
    /// Response body was not the expected envelope or payload.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Request could not be built (e.g. endpoint URL did not resolve).
    #[error("request: {0}")]
    Request(String),
}

impl ApiError {
    /// Server-supplied message when this is a business error.
    pub fn business_message(&self) -> Option<&str> {
        match self {
            ApiError::Business { message, .. } => Some(message),
            _ => None,
        }
    }
}
