//! Server and client errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the server or one of its connections.
///
/// Classification failures are not here: they are answered on the wire and
/// the connection carries on. Only the fatal ones end the process, and they
/// do so through the shutdown token rather than as an error value.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket could not be bound
    #[error("failed to bind socket {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid
    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Response could not be encoded
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors from [`SpecClient`](crate::client::SpecClient).
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not reach the server
    #[error("failed to connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Specifier cannot be sent as a single request line
    #[error("specifier contains a line break: {0:?}")]
    MultilineRequest(String),

    /// Server closed the connection before answering
    #[error("connection closed before a response was received")]
    Closed,

    /// Response is not a valid envelope
    #[error("malformed response {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
