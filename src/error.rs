//! Error types for rasterwire.

use thiserror::Error;

/// Transport-level error type.
///
/// Only failures that tear down a connection live here. Protocol-level
/// failures (bad envelope, unknown operation, missing inputs, ...) are not
/// Rust errors: they travel back to the caller as numeric status codes
/// inside response messages (see [`crate::status`]).
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be serialized or deserialized as JSON.
    /// Message boundaries cannot be trusted after this; connection-fatal.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Framing violation (oversized length prefix, non-object payload).
    /// Connection-fatal; no resynchronization is attempted.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
