//! Store connection seam

use crate::error::Result;
use crate::models::{KeyValues, ResultSet};
use super::request::Statement;

/// Result of executing a write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteOutcome {
    /// Rows the store reports as affected
    pub affected_rows: usize,

    /// Values of the statement's `returning` columns, for inserts
    pub generated_keys: KeyValues,
}

impl ExecuteOutcome {
    /// Outcome without generated keys
    pub fn affected(rows: usize) -> Self {
        ExecuteOutcome { affected_rows: rows, generated_keys: KeyValues::new() }
    }
}

/// Transactional connection to the backing store
#[cfg_attr(test, mockall::automock)]
pub trait Connection {
    /// Execute a write
    fn execute(&mut self, statement: &Statement) -> Result<ExecuteOutcome>;

    /// Run a select
    fn query(&mut self, statement: &Statement) -> Result<ResultSet>;

    /// Open a transaction
    fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction
    fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction
    fn rollback(&mut self) -> Result<()>;
}
