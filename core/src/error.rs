//! Error types for the core crate
//!
//! This module provides a consolidated error type for the table engine,
//! covering shape, validation, uniqueness and synchronization failures.

use thiserror::Error;
use std::io;

use crate::schema::ValidationError;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Value count or position does not fit the table layout
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Column name could not be resolved
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A value was rejected by its column descriptor
    #[error("Validation error on column {column}: {message}")]
    ValidationError {
        /// Column the value was destined for
        column: String,
        /// Reason for the rejection
        message: String,
    },

    /// Unique index collision
    #[error("Duplicate key in index {index}: {key}")]
    DuplicateKey {
        /// Name of the colliding index
        index: String,
        /// Printable form of the colliding key
        key: String,
    },

    /// Operation needs a primary key and the table has none
    #[error("Table {0} has no primary key")]
    MissingPrimaryKey(String),

    /// The backing store has no row for an in-memory row
    #[error("Row {key} of table {table} no longer exists in the store")]
    RowGoneInStore {
        /// Table name
        table: String,
        /// Printable form of the row key
        key: String,
    },

    /// Store structure disagrees with the declared columns
    #[error("Structural drift in table {table}: {details}")]
    StructuralDrift {
        /// Table name
        table: String,
        /// Summary of the differences
        details: String,
    },

    /// Table definition failed validation
    #[error("Schema validation error: {0}")]
    SchemaValidationError(#[from] ValidationError),

    /// Failure reported by the store connection or statement builder
    #[error("Store error: {0}")]
    StoreError(String),

    /// Synchronization was rolled back
    #[error("Synchronization of table {table} rolled back: {source}")]
    SyncError {
        /// Table name
        table: String,
        /// First failure inside the transaction
        #[source]
        source: Box<CoreError>,
    },

    /// State management error
    #[error("State management error: {0}")]
    StateError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether repeating the whole operation may succeed.
    ///
    /// Configuration and data errors are permanent; store failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::StoreError(_) | CoreError::IoError(_) => true,
            CoreError::SyncError { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Build a ValidationError for a column
pub fn validation_error<E: std::fmt::Display>(column: &str, err: E) -> CoreError {
    CoreError::ValidationError {
        column: column.to_string(),
        message: err.to_string(),
    }
}

/// Convert a string error to a StoreError
pub fn to_store_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::StoreError(err.to_string())
}

/// Convert a string error to a StateError
pub fn to_state_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::StateError(err.to_string())
}

/// Convert a string error to a ConfigError
pub fn to_config_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::ConfigError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        match core_err {
            CoreError::IoError(_) => {}
            _ => panic!("Expected IoError variant"),
        }

        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let core_err: CoreError = json_err.into();
        match core_err {
            CoreError::JsonError(_) => {}
            _ => panic!("Expected JsonError variant"),
        }

        let core_err = to_store_error("connection reset");
        match core_err {
            CoreError::StoreError(msg) => assert_eq!(msg, "connection reset"),
            _ => panic!("Expected StoreError variant"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = validation_error("NAME", "value is too long");
        assert_eq!(err.to_string(), "Validation error on column NAME: value is too long");

        let err = CoreError::DuplicateKey {
            index: "UQ_NAME".to_string(),
            key: "NAME='a'".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate key in index UQ_NAME: NAME='a'");

        let err = CoreError::MissingPrimaryKey("users".to_string());
        assert_eq!(err.to_string(), "Table users has no primary key");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(to_store_error("busy").is_retryable());
        assert!(!CoreError::MissingPrimaryKey("t".to_string()).is_retryable());

        let wrapped = CoreError::SyncError {
            table: "t".to_string(),
            source: Box::new(to_store_error("locked")),
        };
        assert!(wrapped.is_retryable());

        let wrapped = CoreError::SyncError {
            table: "t".to_string(),
            source: Box::new(CoreError::RowGoneInStore {
                table: "t".to_string(),
                key: "ID=1".to_string(),
            }),
        };
        assert!(!wrapped.is_retryable());
    }
}
