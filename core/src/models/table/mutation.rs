//! Row and structure mutations
//!
//! Every mutation validates and checks uniqueness before it touches rows or
//! indices, so a failed call leaves the table exactly as it was.

use log::{debug, warn};

use crate::error::{validation_error, CoreError, Result};
use crate::events::TableEvent;
use crate::models::column::Column;
use crate::models::index::{Index, IndexDef, IndexKind};
use crate::models::key_values::KeyValues;
use crate::models::row::{Row, RowState};
use crate::models::value::Value;
use crate::schema::{SchemaValidator, ValidationError};
use super::{RowHandle, Table};

impl Table {
    /// Values a new row starts with: defaults and auto-value placeholders
    pub fn initial_values(&self) -> Vec<Value> {
        self.columns.iter().map(Column::initial_value).collect()
    }

    /// Append a row built from values by column name.
    ///
    /// Omitted columns take their default or auto-value placeholder. Every
    /// supplied value is coerced and validated, and every unique index is
    /// checked, before the row is stored. Returns the new row's position.
    pub fn add_row<I, K>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut row = self.initial_values();
        for (name, value) in values {
            let pos = self.require_column(name.as_ref())?;
            row[pos] = self.columns[pos].prepare(value, self.config.truncate_strings)?;
        }
        self.check_required(&row)?;
        self.attach(row, RowState::Added)
    }

    /// Append a row given as values in column order
    pub fn add_row_values(&mut self, values: Vec<Value>) -> Result<usize> {
        if values.len() != self.columns.len() {
            return Err(CoreError::ShapeError(format!(
                "table {} has {} columns, got {} values",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }
        let row = self.prepare_all(values)?;
        self.check_required(&row)?;
        self.attach(row, RowState::Added)
    }

    /// Change one cell and return the previous value.
    ///
    /// A value semantically equal to the current one changes nothing: no
    /// state transition, no index work, no event. Otherwise every index
    /// covering the column is recomputed, failing with `DuplicateKey`
    /// before anything is written. Unchanged rows become Updated when a
    /// persistent column changes.
    pub fn set_value_at(&mut self, value: Value, row: usize, column: usize) -> Result<Value> {
        self.check_cell(row, column)?;
        let value = self.columns[column].prepare(value, self.config.truncate_strings)?;

        let current = &self.rows[row].values()[column];
        if value.semantic_eq(current) {
            return Ok(current.clone());
        }

        let values = self.rows[row].values();
        let changes = self
            .indices
            .iter()
            .map(|ix| ix.plan_column_change(&self.columns, values, column, &value, self.config.enforce_unique))
            .collect::<Result<Vec<_>>>()?;

        let original_key = if self.rows[row].state() == RowState::Unchanged && self.columns[column].is_persistent() {
            Some(self.store_key_of(row))
        } else {
            None
        };

        for (index, change) in self.indices.iter_mut().zip(changes) {
            if let Some(change) = change {
                index.apply_change(change);
            }
        }

        let old = self.rows[row].set_raw(column, value);
        if self.columns[column].is_persistent() {
            self.rows[row].mark_updated(original_key);
        }
        self.refresh_primary_hash(row);

        debug!("{}: row {} column {} updated", self.name, row, self.columns[column].name());
        self.notify(TableEvent::RowUpdated { row, column: Some(column) });
        Ok(old)
    }

    /// Change one cell, column by name
    pub fn set_value(&mut self, row: usize, column: &str, value: Value) -> Result<Value> {
        let column = self.require_column(column)?;
        self.set_value_at(value, row, column)
    }

    /// Handle for row-scoped access
    pub fn row_handle(&mut self, row: usize) -> Result<RowHandle<'_>> {
        self.check_row(row)?;
        Ok(RowHandle::new(self, row))
    }

    /// Remove a row and return it detached.
    ///
    /// Rows that exist in the store leave their store key in the pending
    /// deletions. Rows never written (state Added) leave nothing behind.
    pub fn remove_row(&mut self, row: usize) -> Result<Row> {
        self.check_row(row)?;
        let record = self.rows[row].state() != RowState::Added;
        let key = if record { Some(self.store_key_of(row)) } else { None };

        let removed = self.detach(row);
        if let Some(key) = key {
            debug!("{}: deletion of {} deferred", self.name, key);
            self.pending_deletions.push(key);
        }
        Ok(removed)
    }

    /// Remove every row matching a key and return how many were removed.
    ///
    /// Each removed stored row records its own store key. When no row in
    /// memory matches, the key itself is recorded so the store row still
    /// goes at the next synchronization.
    pub fn remove_rows(&mut self, key: &KeyValues) -> Result<usize> {
        let positions = self.rows_by_key(key)?;
        if positions.is_empty() {
            debug!("{}: no row matches {}, deletion recorded", self.name, key);
            self.pending_deletions.push(key.clone());
            return Ok(0);
        }
        for &pos in positions.iter().rev() {
            self.remove_row(pos)?;
        }
        Ok(positions.len())
    }

    /// Remove a row without recording a deletion
    pub(crate) fn discard_row(&mut self, row: usize) -> Result<Row> {
        self.check_row(row)?;
        Ok(self.detach(row))
    }

    /// Remove a column from every row and every index.
    ///
    /// Indices shrink; an index left without columns is dropped. Unique
    /// indices are rebuilt and collisions the removal uncovered are logged.
    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let pos = self.require_column(name)?;

        for row in self.rows.iter_mut() {
            row.values_mut().remove(pos);
        }
        let primary_name = self.primary_index().map(|ix| ix.name().to_string());
        for index in self.indices.iter_mut() {
            index.remove_column(pos);
        }
        self.indices.retain(|ix| {
            if ix.columns().is_empty() {
                warn!("index {} lost its last column and was dropped", ix.name());
                false
            } else {
                true
            }
        });
        self.primary = primary_name.and_then(|name| self.indices.iter().position(|ix| ix.name() == name));

        let column = self.columns.remove(pos);
        self.rebuild_column_cache();
        self.rebuild_indices();

        debug!("{}: column {} removed", self.name, column.name());
        self.notify(TableEvent::StructureChanged);
        Ok(column)
    }

    /// Append a column; existing rows take its initial value
    pub fn add_column(&mut self, column: Column) -> Result<usize> {
        SchemaValidator::validate_column(&self.name, &column)?;
        if self.columns.iter().any(|c| c.name().eq_ignore_ascii_case(column.name())) {
            return Err(ValidationError::ColumnAlreadyExists(column.name().to_string(), self.name.clone()).into());
        }
        let initial = column.initial_value();
        if initial.is_null() && !column.is_nullable() && !column.is_auto_generated() && !self.rows.is_empty() {
            return Err(validation_error(column.name(), "non-nullable column without default on a filled table"));
        }

        for row in self.rows.iter_mut() {
            row.values_mut().push(initial.clone());
        }
        self.columns.push(column);
        self.rebuild_column_cache();

        self.notify(TableEvent::StructureChanged);
        Ok(self.columns.len() - 1)
    }

    /// Add an index over the current rows. Unique indices reject existing
    /// duplicates when uniqueness is enforced.
    pub fn add_index(&mut self, def: IndexDef) -> Result<()> {
        SchemaValidator::validate_index(&self.name, &self.columns, &def)?;
        if self.index_by_name(&def.name).is_some() {
            return Err(ValidationError::IndexAlreadyExists(def.name.clone(), self.name.clone()).into());
        }
        if def.kind == IndexKind::Primary && self.primary.is_some() {
            return Err(ValidationError::MultiplePrimaryKeys(self.name.clone()).into());
        }

        let mut index = Index::new(&def, &self.columns, self.computer)?;
        let collisions = index.rebuild(&self.columns, self.rows.iter().map(Row::values));
        if collisions > 0 && index.is_unique() && self.config.enforce_unique {
            return Err(CoreError::DuplicateKey {
                index: def.name,
                key: format!("{} existing rows collide", collisions),
            });
        }

        self.indices.push(index);
        if def.kind == IndexKind::Primary {
            self.primary = Some(self.indices.len() - 1);
            for row in 0..self.rows.len() {
                self.refresh_primary_hash(row);
            }
        }
        self.notify(TableEvent::StructureChanged);
        Ok(())
    }

    /// Declare every row synchronized without writing anything
    pub fn accept_changes(&mut self) {
        for row in self.rows.iter_mut() {
            row.mark_unchanged();
        }
        self.pending_deletions.clear();
    }

    /// Drop every row. No deletions are recorded.
    pub fn clear(&mut self) {
        self.rows.clear();
        for index in self.indices.iter_mut() {
            index.clear();
        }
        self.notify(TableEvent::StructureChanged);
    }

    // ---- crate-internal operations used by synchronization ----

    /// Write a store-assigned value into a row without touching its state
    pub(crate) fn merge_value(&mut self, row: usize, column: usize, value: Value) -> Result<()> {
        self.check_cell(row, column)?;
        let value = self.coerce_for(column, value)?;
        self.apply_value(row, column, value);
        Ok(())
    }

    /// Match store-generated keys to columns and coerce them, leaving every
    /// row untouched
    pub(crate) fn resolve_generated(&self, generated: &KeyValues) -> Result<Vec<(usize, Value)>> {
        generated
            .iter()
            .map(|(name, value)| {
                let column = self.require_column(name)?;
                Ok((column, self.coerce_for(column, value.clone())?))
            })
            .collect()
    }

    /// Write resolved generated keys into an inserted row
    pub(crate) fn apply_generated(&mut self, row: usize, resolved: Vec<(usize, Value)>) {
        if row >= self.rows.len() || resolved.is_empty() {
            return;
        }
        for (column, value) in resolved {
            self.apply_value(row, column, value);
        }
        self.notify(TableEvent::RowUpdated { row, column: None });
    }

    /// Put back a cell and row state after a failed write-through
    pub(crate) fn revert_value(
        &mut self,
        row: usize,
        column: usize,
        old: Value,
        state: RowState,
        original_key: Option<KeyValues>,
    ) -> Result<()> {
        let merged = self.merge_value(row, column, old);
        self.restore_row_state(row, state, original_key);
        self.notify(TableEvent::RowUpdated { row, column: Some(column) });
        merged
    }

    /// Replace persistent values with a fresh copy from the store and mark
    /// the row Unchanged
    pub(crate) fn replace_persistent_values(&mut self, row: usize, fresh: &KeyValues) -> Result<()> {
        self.check_row(row)?;
        for (name, value) in fresh.iter() {
            if let Some(column) = self.column_index(name) {
                if self.columns[column].is_persistent() {
                    self.merge_value(row, column, value.clone())?;
                }
            }
        }
        self.rows[row].mark_unchanged();
        self.notify(TableEvent::RowUpdated { row, column: None });
        Ok(())
    }

    pub(crate) fn mark_synchronized(&mut self, row: usize) {
        if let Some(row) = self.rows.get_mut(row) {
            row.mark_unchanged();
        }
    }

    pub(crate) fn restore_row_state(&mut self, row: usize, state: RowState, original_key: Option<KeyValues>) {
        if let Some(row) = self.rows.get_mut(row) {
            row.restore_state(state, original_key);
        }
    }

    pub(crate) fn clear_pending_deletions(&mut self) {
        self.pending_deletions.clear();
    }

    /// Insert rows that already passed validation, in one step. Used by
    /// bulk loading, which has checked uniqueness on cloned indices.
    pub(crate) fn splice_rows(&mut self, at: usize, rows: Vec<Vec<Value>>, state: RowState, indices: Vec<Index>) {
        let loaded: Vec<Row> = rows.into_iter().map(|values| Row::new(values, state)).collect();
        self.indices = indices;
        self.rows.splice(at..at, loaded);
        self.renumber_from(0);
        for row in 0..self.rows.len() {
            self.refresh_primary_hash(row);
        }
    }

    // ---- helpers ----

    fn coerce_for(&self, column: usize, value: Value) -> Result<Value> {
        self.columns[column]
            .column_type()
            .coerce(value)
            .map_err(|e| validation_error(self.columns[column].name(), e))
    }

    /// Row, index and primary hash update for a value already coerced
    fn apply_value(&mut self, row: usize, column: usize, value: Value) {
        let values = self.rows[row].values();
        for index in self.indices.iter_mut() {
            index.recompute_on_column_change(&self.columns, values, column, &value);
        }
        self.rows[row].set_raw(column, value);
        self.refresh_primary_hash(row);
    }

    pub(super) fn prepare_all(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        self.columns
            .iter()
            .zip(values)
            .map(|(column, value)| column.prepare(value, self.config.truncate_strings))
            .collect()
    }

    /// Non-nullable columns left null by omission
    pub(super) fn check_required(&self, values: &[Value]) -> Result<()> {
        for (column, value) in self.columns.iter().zip(values) {
            if value.is_null() && !column.is_nullable() && !column.is_auto_generated() {
                return Err(validation_error(column.name(), "null value in non-nullable column"));
            }
        }
        Ok(())
    }

    fn attach(&mut self, values: Vec<Value>, state: RowState) -> Result<usize> {
        if self.config.enforce_unique {
            for index in &self.indices {
                index.check_insert(&self.columns, &values)?;
            }
        }
        for index in self.indices.iter_mut() {
            if !index.try_insert(&self.columns, &values) {
                warn!("{}: duplicate key accepted in index {}", self.name, index.name());
            }
        }

        let position = self.rows.len();
        let mut row = Row::new(values, state);
        row.set_position(Some(position));
        row.set_primary_hash(self.primary_hash_of(row.values()));
        self.rows.push(row);

        debug!("{}: row {} added", self.name, position);
        self.notify(TableEvent::RowInserted { row: position });
        Ok(position)
    }

    fn detach(&mut self, row: usize) -> Row {
        for index in self.indices.iter_mut() {
            index.remove(&self.columns, self.rows[row].values());
        }
        let mut removed = self.rows.remove(row);
        removed.set_position(None);
        removed.set_primary_hash(None);
        self.renumber_from(row);

        debug!("{}: row {} removed", self.name, row);
        self.notify(TableEvent::RowDeleted { row });
        removed
    }

    fn rebuild_indices(&mut self) {
        for index in self.indices.iter_mut() {
            let collisions = index.rebuild(&self.columns, self.rows.iter().map(Row::values));
            if collisions > 0 && index.is_unique() {
                warn!("{}: index {} now holds {} duplicate keys", self.name, index.name(), collisions);
            }
        }
        for row in 0..self.rows.len() {
            self.refresh_primary_hash(row);
        }
    }
}
