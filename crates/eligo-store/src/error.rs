//! Error types for the store crate.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur while persisting recordings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database is busy, locked or full. Surfaced to the caller, not retried.
    #[error("Store at capacity: {0}")]
    Capacity(String),

    /// The database cannot be written by this process.
    #[error("Store access denied: {0}")]
    Access(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Stable code for this error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Capacity(_) => "store_capacity",
            Self::Access(_) => "store_access",
            Self::Database(_) => "store_error",
            Self::InvalidData(_) => "store_invalid_data",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::DiskFull) => {
                StoreError::Capacity(message)
            }
            Some(
                ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::CannotOpen
                | ErrorCode::AuthorizationForStatementDenied,
            ) => StoreError::Access(message),
            _ => StoreError::Database(message),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
