//! Error types for the sync protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while interpreting protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not valid JSON of the expected shape.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// The server did not set `ack` to true.
    #[error("acknowledgement not confirmed")]
    NotAcknowledged,

    /// The acknowledgement carries no tracking id.
    #[error("acknowledgement has no tracking id")]
    MissingTrackingId,

    /// The acknowledgement is for a different record.
    #[error("acknowledgement is for {actual:?}, expected {expected:?}")]
    TrackingIdMismatch {
        /// Tracking id of the record that was sent.
        expected: String,
        /// Tracking id the server acknowledged.
        actual: String,
    },
}
