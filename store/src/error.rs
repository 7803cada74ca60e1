//! Error types for the SQLite store
//!
//! Store failures convert into `CoreError` so they travel through the
//! synchronizer like any other store failure.

use std::io;
use thiserror::Error;

use rowbound_core::error::{to_config_error, to_store_error, CoreError};

/// Result type for the store crate
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for the store crate
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value has no SQLite representation, or a stored one no engine value
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Transaction command out of order
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Request the SQL dialect cannot express
    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl StoreError {
    /// Whether the database was busy or locked
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Config(e) => to_config_error(e),
            StoreError::Unsupported(msg) => CoreError::ShapeError(msg),
            other => to_store_error(other),
        }
    }
}

/// Helper function to convert string errors to StoreError
pub fn to_conversion_error<E: ToString>(err: E) -> StoreError {
    StoreError::Conversion(err.to_string())
}
