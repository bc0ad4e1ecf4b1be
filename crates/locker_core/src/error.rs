//! Error types for the locker model.

use thiserror::Error;

/// Result type for model operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while interpreting stored model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A status string is not one of `pending`, `synced`, `failed`.
    #[error("unknown package status: {0:?}")]
    UnknownStatus(String),

    /// A timestamp string could not be parsed in any accepted format.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}
