//! Synchronization of in-memory tables with the backing store
//!
//! Pending work is derived from row states and the table's pending
//! deletions, turned into statements, and executed inside one transaction
//! in the order DELETE, UPDATE, INSERT. On success generated keys are merged
//! into inserted rows, every written row becomes Unchanged and the pending
//! deletions are cleared. On failure the transaction is rolled back and the
//! table is left exactly as it was.

mod connection;
mod immediate;
mod request;

pub use connection::{Connection, ExecuteOutcome};
#[cfg(test)]
pub use connection::MockConnection;
pub use request::{SelectRequest, Statement, StatementBuilder, WriteKind, WriteRequest};

use log::{debug, info, warn};
use serde::{Serialize, Deserialize};

use crate::config::SyncConfig;
use crate::error::{CoreError, Result};
use crate::models::{KeyValues, RowState, Table};
use crate::utils::Timer;

/// One statement of a synchronization
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    /// Row the write belongs to; `None` for deletions
    pub row: Option<usize>,

    /// What is written
    pub request: WriteRequest,

    /// Rendered statement
    pub statement: Statement,
}

/// Statements of one synchronization, grouped by kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    /// Pending deletions
    pub deletes: Vec<PlannedWrite>,

    /// Rows in state Updated
    pub updates: Vec<PlannedWrite>,

    /// Rows in state Added
    pub inserts: Vec<PlannedWrite>,
}

impl SyncPlan {
    /// Whether there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }

    /// Writes in execution order
    pub fn writes(&self) -> impl Iterator<Item = &PlannedWrite> {
        self.deletes.iter().chain(&self.updates).chain(&self.inserts)
    }
}

/// Counts of a finished synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Rows inserted
    pub inserted: usize,

    /// Rows updated
    pub updated: usize,

    /// Delete statements executed
    pub deleted: usize,
}

/// Writes table changes through a statement builder and a connection
pub struct Synchronizer<'b> {
    builder: &'b dyn StatementBuilder,
    config: SyncConfig,
}

impl<'b> Synchronizer<'b> {
    /// Create a synchronizer
    pub fn new(builder: &'b dyn StatementBuilder, config: SyncConfig) -> Self {
        Synchronizer { builder, config }
    }

    /// Synchronization settings
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Statement builder in use
    pub fn builder(&self) -> &dyn StatementBuilder {
        self.builder
    }

    /// Derive the statements a synchronization would execute
    pub fn plan(&self, table: &Table) -> Result<SyncPlan> {
        if !table.has_primary_key() {
            return Err(CoreError::MissingPrimaryKey(table.name().to_string()));
        }

        let mut plan = SyncPlan::default();
        for key in table.pending_deletions() {
            plan.deletes.push(self.planned(None, WriteRequest::delete(table, key.clone()))?);
        }
        for (pos, row) in table.rows().iter().enumerate() {
            match row.state() {
                RowState::Updated => {
                    let request = WriteRequest::update(table, row, table.store_key_of(pos));
                    plan.updates.push(self.planned(Some(pos), request)?);
                }
                RowState::Added => {
                    plan.inserts.push(self.planned(Some(pos), WriteRequest::insert(table, row))?);
                }
                RowState::Unchanged => {}
            }
        }
        Ok(plan)
    }

    fn planned(&self, row: Option<usize>, request: WriteRequest) -> Result<PlannedWrite> {
        let statement = self.builder.write(&request)?;
        Ok(PlannedWrite { row, request, statement })
    }

    /// Write every pending change in one transaction.
    ///
    /// Fails with `MissingPrimaryKey` before touching the store when the
    /// table has no primary key. Any store failure rolls the transaction
    /// back and surfaces as `SyncError` with the table unchanged.
    pub fn synchronize(&self, table: &mut Table, conn: &mut dyn Connection) -> Result<SyncReport> {
        let timer = Timer::new(format!("synchronize {}", table.name()))
            .with_warning_threshold(self.config.slow_sync_threshold)
            .without_auto_log();

        let plan = self.plan(table)?;
        if plan.is_empty() {
            debug!("{}: nothing to synchronize", table.name());
            return Ok(SyncReport::default());
        }

        // Generated keys are resolved inside the transaction
        let generated = self.in_transaction(table.name(), conn, |conn| {
            Self::execute_plan(table.name(), &plan, conn)?
                .into_iter()
                .map(|(row, keys)| Ok((row, table.resolve_generated(&keys)?)))
                .collect::<Result<Vec<_>>>()
        })?;

        for (row, resolved) in generated {
            table.apply_generated(row, resolved);
        }
        for write in plan.updates.iter().chain(&plan.inserts) {
            if let Some(row) = write.row {
                table.mark_synchronized(row);
            }
        }
        table.clear_pending_deletions();

        let report = SyncReport {
            inserted: plan.inserts.len(),
            updated: plan.updates.len(),
            deleted: plan.deletes.len(),
        };
        info!(
            "{}: synchronized {} inserts, {} updates, {} deletes",
            table.name(),
            report.inserted,
            report.updated,
            report.deleted
        );
        timer.log("done");
        Ok(report)
    }

    fn execute_plan(table: &str, plan: &SyncPlan, conn: &mut dyn Connection) -> Result<Vec<(usize, KeyValues)>> {
        for write in &plan.deletes {
            let outcome = conn.execute(&write.statement)?;
            if outcome.affected_rows == 0 {
                debug!("{}: delete of {} matched nothing", table, write.request.key);
            }
        }
        for write in &plan.updates {
            let outcome = conn.execute(&write.statement)?;
            if outcome.affected_rows == 0 {
                return Err(CoreError::RowGoneInStore {
                    table: table.to_string(),
                    key: write.request.key.to_string(),
                });
            }
        }
        let mut generated = Vec::new();
        for write in &plan.inserts {
            let outcome = conn.execute(&write.statement)?;
            if let Some(row) = write.row {
                if !outcome.generated_keys.is_empty() {
                    generated.push((row, outcome.generated_keys));
                }
            }
        }
        Ok(generated)
    }

    /// Run `work` between begin and commit, rolling back on any failure.
    /// Errors come back wrapped in `SyncError`.
    fn in_transaction<T, F>(&self, table: &str, conn: &mut dyn Connection, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Connection) -> Result<T>,
    {
        let wrap = |source: CoreError| CoreError::SyncError {
            table: table.to_string(),
            source: Box::new(source),
        };

        conn.begin().map_err(wrap)?;
        let result = work(&mut *conn).and_then(|value| conn.commit().map(|_| value));
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(rollback_err) = conn.rollback() {
                    warn!("{}: rollback failed: {}", table, rollback_err);
                }
                warn!("{}: synchronization rolled back: {}", table, err);
                Err(wrap(err))
            }
        }
    }
}
