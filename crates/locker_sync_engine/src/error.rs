//! Error types for the sync engine.

use locker_storage::StoreError;
use locker_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The request did not complete within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The server answered with something other than 201 Created.
    #[error("server rejected record with HTTP {status}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
    },

    /// The acknowledgement was malformed or did not match the record.
    #[error("invalid acknowledgement: {0}")]
    Protocol(#[from] ProtocolError),

    /// Local storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed attempt will be retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::Rejected { .. } => true,
            SyncError::Protocol(_) => true,
            SyncError::Storage(_) | SyncError::Config(_) => false,
        }
    }
}
