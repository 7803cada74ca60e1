//! In-memory tables
//!
//! A [`Table`] is an ordered, indexed, mutable collection of rows mirroring a
//! relational table. It tracks per-row change state and the keys of rows
//! removed since the last synchronization, and enforces uniqueness through
//! its indices.
//!
//! Mutations live in `mutation`, bulk loading in `fill`, the columnar view
//! in `projection` and construction in `builder`.

mod builder;
mod fill;
mod handle;
mod mutation;
mod projection;

pub use builder::TableBuilder;
pub use fill::{FillMode, ResultSet};
pub use handle::RowHandle;
pub use projection::TableModel;

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::config::TableConfig;
use crate::crypto::{HashComputer, KeyHash};
use crate::error::{CoreError, Result};
use crate::events::{TableEvent, TableListener};
use crate::utils::StringUtils;
use super::column::Column;
use super::index::{Index, IndexKind};
use super::key_values::KeyValues;
use super::row::{Row, RowState};
use super::value::Value;

/// Counts of changes waiting for synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Rows in state Added
    pub added: usize,

    /// Rows in state Updated
    pub updated: usize,

    /// Pending deletion keys
    pub deleted: usize,
}

impl ChangeSummary {
    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// In-memory table
pub struct Table {
    name: String,
    schema: Option<String>,
    alias: Option<String>,
    columns: Vec<Column>,
    indices: Vec<Index>,
    primary: Option<usize>,
    rows: Vec<Row>,
    pending_deletions: Vec<KeyValues>,
    config: TableConfig,
    computer: HashComputer,
    column_cache: HashMap<String, usize>,
    listeners: Vec<Arc<dyn TableListener>>,
}

impl Debug for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("columns", &self.columns.len())
            .field("indices", &self.indices.len())
            .field("rows", &self.rows.len())
            .field("pending_deletions", &self.pending_deletions.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Table {
    /// Start building a table
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema the table lives in
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Alias used in joined selects
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// `schema.name`, or the bare name without a schema
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Behavioral flags
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Hash computer shared by the table's indices
    pub fn hash_computer(&self) -> &HashComputer {
        &self.computer
    }

    /// Columns in row layout order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column at a position
    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at a position
    pub fn row(&self, position: usize) -> Option<&Row> {
        self.rows.get(position)
    }

    /// All indices, the primary one included
    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// Case-insensitive index lookup
    pub fn index_by_name(&self, name: &str) -> Option<&Index> {
        self.indices.iter().find(|ix| ix.name().eq_ignore_ascii_case(name))
    }

    /// The primary index
    pub fn primary_index(&self) -> Option<&Index> {
        self.primary.map(|p| &self.indices[p])
    }

    /// Keys of rows removed since the last synchronization
    pub fn pending_deletions(&self) -> &[KeyValues] {
        &self.pending_deletions
    }

    /// Register a change listener
    pub fn add_listener(&mut self, listener: Arc<dyn TableListener>) {
        self.listeners.push(listener);
    }

    /// Drop every change listener
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Position of a column.
    ///
    /// Case-insensitive; a qualified name that does not match as a whole is
    /// retried with the part after its last `.`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_cache
            .get(&name.to_lowercase())
            .or_else(|| self.column_cache.get(&StringUtils::unqualified(name).to_lowercase()))
            .copied()
    }

    /// Position of a column, failing with `UnknownColumn`
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| CoreError::UnknownColumn(name.to_string()))
    }

    /// Column by name
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|pos| &self.columns[pos])
    }

    /// Primary key columns in key order, empty without a primary key
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_index()
            .map(|ix| ix.columns().iter().map(|&c| &self.columns[c]).collect())
            .unwrap_or_default()
    }

    /// Whether a primary key is defined
    pub fn has_primary_key(&self) -> bool {
        self.primary.is_some()
    }

    /// Value at a cell
    pub fn get_value_at(&self, row: usize, column: usize) -> Result<&Value> {
        self.check_cell(row, column)?;
        Ok(&self.rows[row].values()[column])
    }

    /// Value at a cell, column by name
    pub fn get_value(&self, row: usize, column: &str) -> Result<&Value> {
        let column = self.require_column(column)?;
        self.get_value_at(row, column)
    }

    /// Primary key values of a row
    pub fn key_values_for(&self, row: usize) -> Result<KeyValues> {
        self.check_row(row)?;
        let primary = self.require_primary()?;
        Ok(primary.key_values(&self.columns, self.rows[row].values()))
    }

    /// Position of the first row matching a key.
    ///
    /// A key naming exactly the primary key columns is compared through the
    /// rows' cached primary hashes.
    pub fn row_by_key(&self, key: &KeyValues) -> Result<Option<usize>> {
        if key.is_empty() {
            return Err(CoreError::ShapeError("empty key".to_string()));
        }

        if let Some(normalized) = self.normalize_primary_key(key)? {
            let primary = self.require_primary()?;
            let hash = normalized.hash(primary.computer());
            if !hash.is_empty() {
                for (pos, row) in self.rows.iter().enumerate() {
                    match row.primary_hash() {
                        Some(cached) if !cached.is_empty() => {
                            if *cached == hash {
                                return Ok(Some(pos));
                            }
                        }
                        _ => {
                            if key.matches(&self.columns, row.values())? {
                                return Ok(Some(pos));
                            }
                        }
                    }
                }
                return Ok(None);
            }
        }

        for (pos, row) in self.rows.iter().enumerate() {
            if key.matches(&self.columns, row.values())? {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }

    /// Positions of every row matching a key
    pub fn rows_by_key(&self, key: &KeyValues) -> Result<Vec<usize>> {
        if key.is_empty() {
            return Err(CoreError::ShapeError("empty key".to_string()));
        }
        let mut found = Vec::new();
        for (pos, row) in self.rows.iter().enumerate() {
            if key.matches(&self.columns, row.values())? {
                found.push(pos);
            }
        }
        Ok(found)
    }

    /// Counts of pending changes
    pub fn pending_changes(&self) -> ChangeSummary {
        let mut summary = ChangeSummary {
            deleted: self.pending_deletions.len(),
            ..ChangeSummary::default()
        };
        for row in &self.rows {
            match row.state() {
                RowState::Added => summary.added += 1,
                RowState::Updated => summary.updated += 1,
                RowState::Unchanged => {}
            }
        }
        summary
    }

    /// Whether anything awaits synchronization
    pub fn has_changes(&self) -> bool {
        !self.pending_changes().is_empty()
    }

    // ---- internal helpers ----

    /// Rewrite a key naming exactly the primary key columns into canonical
    /// column names and coerced values. `None` if the key has another shape
    /// or a value does not coerce.
    fn normalize_primary_key(&self, key: &KeyValues) -> Result<Option<KeyValues>> {
        let primary = match self.primary_index() {
            Some(primary) => primary,
            None => return Ok(None),
        };
        if key.len() != primary.columns().len() {
            return Ok(None);
        }
        let mut normalized = KeyValues::new();
        for &c in primary.columns() {
            let column = &self.columns[c];
            let value = match key.get(column.name()).or_else(|| {
                key.iter().find(|(name, _)| column.matches_name(name)).map(|(_, v)| v)
            }) {
                Some(value) => value,
                None => return Ok(None),
            };
            match column.column_type().coerce(value.clone()) {
                Ok(value) => normalized.insert(column.name(), value),
                Err(_) => return Ok(None),
            }
        }
        Ok(Some(normalized))
    }

    fn require_primary(&self) -> Result<&Index> {
        self.primary_index()
            .ok_or_else(|| CoreError::MissingPrimaryKey(self.name.clone()))
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows.len() {
            return Err(CoreError::ShapeError(format!(
                "row {} out of range, table {} has {} rows",
                row,
                self.name,
                self.rows.len()
            )));
        }
        Ok(())
    }

    fn check_cell(&self, row: usize, column: usize) -> Result<()> {
        self.check_row(row)?;
        if column >= self.columns.len() {
            return Err(CoreError::ShapeError(format!(
                "column {} out of range, table {} has {} columns",
                column,
                self.name,
                self.columns.len()
            )));
        }
        Ok(())
    }

    fn rebuild_column_cache(&mut self) {
        self.column_cache = self
            .columns
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.name().to_lowercase(), pos))
            .collect();
    }

    fn primary_hash_of(&self, values: &[Value]) -> Option<KeyHash> {
        self.primary_index().map(|ix| ix.hash_of(&self.columns, values))
    }

    fn refresh_primary_hash(&mut self, row: usize) {
        let hash = self.primary_hash_of(self.rows[row].values());
        self.rows[row].set_primary_hash(hash);
    }

    fn renumber_from(&mut self, start: usize) {
        for (pos, row) in self.rows.iter_mut().enumerate().skip(start) {
            row.set_position(Some(pos));
        }
    }

    /// Identity of a stored row in the store: its original key when its key
    /// columns changed since loading, otherwise its current key. Tables
    /// without a primary key fall back to every persistent column.
    pub(crate) fn store_key_of(&self, row: usize) -> KeyValues {
        let row = &self.rows[row];
        if let Some(original) = row.original_key() {
            return original.clone();
        }
        match self.primary_index() {
            Some(primary) => primary.key_values(&self.columns, row.values()),
            None => self
                .columns
                .iter()
                .zip(row.values())
                .filter(|(c, _)| c.is_persistent())
                .map(|(c, v)| (c.name().to_string(), v.clone()))
                .collect(),
        }
    }

    fn notify(&self, event: TableEvent) {
        for listener in &self.listeners {
            listener.table_changed(&self.name, &event);
        }
    }
}
