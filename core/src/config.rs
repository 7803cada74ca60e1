//! Configuration for the core crate
//!
//! This module provides configuration options for the table engine,
//! including uniqueness and bulk-load policies, key hashing and
//! synchronization retry settings.

use std::time::Duration;
use serde::{Serialize, Deserialize};

/// Hash algorithm to use for key hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,

    /// Blake2s
    Blake2s,

    /// Keccak-256
    Keccak256,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

/// Behavioral flags of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Reject inserts and updates that collide in a unique index
    pub enforce_unique: bool,

    /// Rows whose unique-index columns are all null never collide
    pub allow_multiple_nulls: bool,

    /// Bulk loads may omit persistent columns (they get defaults)
    pub allow_missing_fill_columns: bool,

    /// Bulk loads may carry columns the table does not know (ignored)
    pub allow_superfluous_fill_columns: bool,

    /// Over-long strings are cut instead of rejected
    pub truncate_strings: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            enforce_unique: true,
            allow_multiple_nulls: true,
            allow_missing_fill_columns: false,
            allow_superfluous_fill_columns: false,
            truncate_strings: false,
        }
    }
}

/// Key hashing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HashConfig {
    /// Digest used for index and key hashes
    pub algorithm: HashAlgorithm,
}

/// Synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How many times a failed synchronization is retried
    pub max_retries: usize,

    /// Delay before the first retry; doubles on every attempt
    pub initial_backoff: Duration,

    /// Synchronizations slower than this are logged as warnings
    pub slow_sync_threshold: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            slow_sync_threshold: Duration::from_secs(2),
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Table behavior
    pub table: TableConfig,

    /// Key hashing
    pub hashing: HashConfig,

    /// Synchronization
    pub sync: SyncConfig,

    /// Log level
    pub log_level: String,

    /// Whether to enable debug mode
    pub debug_mode: bool,
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        CoreConfig {
            log_level: "info".to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, crate::error::CoreError> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<(), crate::error::CoreError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::new();
        config.debug_mode = true;
        config.log_level = "debug".to_string();
        config
    }

    /// Create a production configuration
    pub fn production() -> Self {
        let mut config = Self::new();
        config.table.enforce_unique = true;
        config.sync.max_retries = 5;
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::development();
        config.sync.max_retries = 1;
        config.sync.initial_backoff = Duration::from_millis(1);
        config
    }
}
