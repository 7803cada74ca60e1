//! Table shared across threads
//!
//! One writer at a time; readers on other threads see the table between
//! mutations. A poisoned lock surfaces as `StateError`.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use log::info;

use crate::error::{to_state_error, Result};
use crate::models::Table;
use crate::sync::{Connection, SyncReport, Synchronizer};
use crate::utils::retry_with_backoff;

/// Table behind a shared read-write lock
#[derive(Debug, Clone)]
pub struct SharedTable(Arc<RwLock<Table>>);

impl SharedTable {
    /// Wrap a table
    pub fn new(table: Table) -> Self {
        SharedTable(Arc::new(RwLock::new(table)))
    }

    /// Read access
    pub fn read(&self) -> Result<RwLockReadGuard<'_, Table>> {
        self.0.read().map_err(|e| to_state_error(format!("table lock poisoned: {}", e)))
    }

    /// Write access
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Table>> {
        self.0.write().map_err(|e| to_state_error(format!("table lock poisoned: {}", e)))
    }

    /// Run a closure with read access
    pub fn with_read<T>(&self, f: impl FnOnce(&Table) -> T) -> Result<T> {
        Ok(f(&*self.read()?))
    }

    /// Run a closure with write access
    pub fn with_write<T>(&self, f: impl FnOnce(&mut Table) -> Result<T>) -> Result<T> {
        f(&mut *self.write()?)
    }

    /// Synchronize, retrying the whole batch on retryable store failures.
    ///
    /// The lock is held only while an attempt runs, never while waiting
    /// between attempts.
    pub async fn synchronize_with_retry(
        &self,
        sync: &Synchronizer<'_>,
        conn: &mut dyn Connection,
    ) -> Result<SyncReport> {
        let config = sync.config().clone();
        let report = retry_with_backoff(
            || {
                let mut table = self.write()?;
                sync.synchronize(&mut table, &mut *conn)
            },
            |err| err.is_retryable(),
            config.max_retries,
            config.initial_backoff,
        )
        .await?;
        info!("shared table synchronized: {:?}", report);
        Ok(report)
    }
}
