//! Configuration for the SQLite store
//!
//! Settings come from an optional file and from `ROWBOUND_`-prefixed
//! environment variables, with a `.env` file loaded into the environment
//! first. Environment variables win over the file.

use std::path::PathBuf;
use std::time::Duration;
use log::debug;
use serde::{Serialize, Deserialize};

use rowbound_core::schema::DriftPolicy;
use crate::error::Result;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ROWBOUND";

/// SQLite store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `None` opens an in-memory database
    pub path: Option<PathBuf>,

    /// How long to wait on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// Enforce foreign key constraints
    pub foreign_keys: bool,

    /// What to do when declared columns differ from the database
    pub drift_policy: DriftPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: None,
            busy_timeout_ms: 5000,
            foreign_keys: true,
            drift_policy: DriftPolicy::Accept,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory database, for tests
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Database file at `path`
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Busy timeout as a duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Load from the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load from an optional settings file plus the environment
    pub fn load(file: Option<&str>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }

        let mut builder = ::config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(::config::File::with_name(file).required(false));
        }
        let settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
