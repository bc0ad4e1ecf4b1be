//! Error types for record store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The SQLite layer reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No record with the given local id exists.
    #[error("record {0} not found")]
    NotFound(i64),

    /// A record with the same tracking id already exists.
    #[error("tracking id {0:?} already exists")]
    DuplicateTrackingId(String),

    /// The persisted record is synced and may not be modified.
    #[error("record {0} is already synced")]
    AlreadySynced(i64),

    /// A stored value could not be interpreted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The store refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<locker_core::CoreError> for StoreError {
    fn from(err: locker_core::CoreError) -> Self {
        StoreError::Corrupted(err.to_string())
    }
}
