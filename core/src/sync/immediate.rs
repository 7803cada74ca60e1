//! Write-through operations
//!
//! Each operation changes the table and writes the change in its own
//! transaction. A failed write undoes the in-memory change so table and
//! store never disagree.

use log::{debug, warn};

use crate::error::{CoreError, Result};
use crate::models::{FillMode, KeyValues, RowState, Table, Value};
use crate::registry::JoinPathResolver;
use super::connection::Connection;
use super::request::{SelectRequest, WriteRequest};
use super::Synchronizer;

impl<'b> Synchronizer<'b> {
    /// Add a row and insert it at once. The row ends Unchanged, with
    /// store-generated keys merged in.
    pub fn insert_row<I, K>(&self, table: &mut Table, values: I, conn: &mut dyn Connection) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let row = table.add_row(values)?;
        let written = self.builder().write(&WriteRequest::insert(table, &table.rows()[row])).and_then(|statement| {
            self.in_transaction(table.name(), conn, |conn| {
                let outcome = conn.execute(&statement)?;
                table.resolve_generated(&outcome.generated_keys)
            })
        });

        match written {
            Ok(resolved) => {
                table.apply_generated(row, resolved);
                table.mark_synchronized(row);
                debug!("{}: row {} inserted", table.name(), row);
                Ok(row)
            }
            Err(err) => {
                table.discard_row(row)?;
                Err(err)
            }
        }
    }

    /// Change one cell and update the store row at once.
    ///
    /// Rows never written (state Added) only change in memory; they go out
    /// with the next synchronization. On failure the old value and row
    /// state come back.
    pub fn update_value(
        &self,
        table: &mut Table,
        row: usize,
        column: usize,
        value: Value,
        conn: &mut dyn Connection,
    ) -> Result<Value> {
        if !table.has_primary_key() {
            return Err(CoreError::MissingPrimaryKey(table.name().to_string()));
        }
        let (state, original_key) = match table.row(row) {
            Some(r) => (r.state(), r.original_key().cloned()),
            None => return Err(CoreError::ShapeError(format!("row {} out of range", row))),
        };

        let old = table.set_value_at(value, row, column)?;
        let changed = !table.rows()[row].values()[column].semantic_eq(&old);
        if !changed || state == RowState::Added || table.rows()[row].state() != RowState::Updated {
            return Ok(old);
        }

        let key = table.store_key_of(row);
        let request = WriteRequest::update(table, &table.rows()[row], key.clone());
        let written = self.builder().write(&request).and_then(|statement| {
            self.in_transaction(table.name(), conn, |conn| {
                let outcome = conn.execute(&statement)?;
                if outcome.affected_rows == 0 {
                    return Err(CoreError::RowGoneInStore {
                        table: table.name().to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(outcome)
            })
        });

        match written {
            Ok(_) => {
                table.mark_synchronized(row);
                Ok(old)
            }
            Err(err) => {
                if let Err(revert_err) = table.revert_value(row, column, old, state, original_key) {
                    warn!("{}: could not revert row {}: {}", table.name(), row, revert_err);
                }
                Err(err)
            }
        }
    }

    /// Delete matching rows from the store, then from memory. Nothing is
    /// left in the pending deletions. Returns the rows removed in memory.
    pub fn delete_rows(&self, table: &mut Table, key: &KeyValues, conn: &mut dyn Connection) -> Result<usize> {
        if key.is_empty() {
            return Err(CoreError::ShapeError("empty key".to_string()));
        }
        let positions = table.rows_by_key(key)?;

        let statement = self.builder().write(&WriteRequest::delete(table, key.clone()))?;
        let outcome = self.in_transaction(table.name(), conn, |conn| conn.execute(&statement))?;
        debug!("{}: {} store rows deleted for {}", table.name(), outcome.affected_rows, key);

        for &pos in positions.iter().rev() {
            table.discard_row(pos)?;
        }
        Ok(positions.len())
    }

    /// Reload one row from the store.
    ///
    /// The row is selected by its store key. Persistent values are replaced,
    /// indices follow and the row becomes Unchanged. A row the store no
    /// longer has fails with `RowGoneInStore`.
    pub fn refresh_row(
        &self,
        table: &mut Table,
        row: usize,
        resolver: Option<&dyn JoinPathResolver>,
        conn: &mut dyn Connection,
    ) -> Result<()> {
        if row >= table.row_count() {
            return Err(CoreError::ShapeError(format!("row {} out of range", row)));
        }
        let key = table.store_key_of(row);
        let request = SelectRequest::for_table(table, resolver, Some(key.clone()))?;
        let result = conn.query(&self.builder().select(&request)?)?;

        let record = match result.records.into_iter().next() {
            Some(record) => record,
            None => {
                return Err(CoreError::RowGoneInStore {
                    table: table.name().to_string(),
                    key: key.to_string(),
                })
            }
        };
        let fresh: KeyValues = result.columns.into_iter().zip(record).collect();
        table.replace_persistent_values(row, &fresh)
    }

    /// Select every row of the table from the store and load it
    pub fn load(
        &self,
        table: &mut Table,
        mode: FillMode,
        resolver: Option<&dyn JoinPathResolver>,
        conn: &mut dyn Connection,
    ) -> Result<usize> {
        let request = SelectRequest::for_table(table, resolver, None)?;
        let result = conn.query(&self.builder().select(&request)?)?;
        table.fill(result, mode)
    }
}

impl Table {
    /// Add a row and write it to the store at once
    pub fn add_row_immediate<I, K>(&mut self, values: I, sync: &Synchronizer<'_>, conn: &mut dyn Connection) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        sync.insert_row(self, values, conn)
    }

    /// Change one cell and write it to the store at once
    pub fn set_value_at_immediate(
        &mut self,
        value: Value,
        row: usize,
        column: usize,
        sync: &Synchronizer<'_>,
        conn: &mut dyn Connection,
    ) -> Result<Value> {
        sync.update_value(self, row, column, value, conn)
    }

    /// Delete matching rows in the store and in memory at once
    pub fn remove_rows_immediate(&mut self, key: &KeyValues, sync: &Synchronizer<'_>, conn: &mut dyn Connection) -> Result<usize> {
        sync.delete_rows(self, key, conn)
    }
}
