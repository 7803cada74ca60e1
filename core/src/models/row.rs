//! Table rows
//!
//! A row is a value array aligned to its table's column order plus a change
//! state. Rows never reference their table; callers reach them through the
//! table by position or through a [`RowHandle`](super::RowHandle).

use std::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Serialize, Deserialize};

use crate::crypto::KeyHash;
use super::key_values::KeyValues;
use super::value::Value;

/// Change state of a row relative to the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowState {
    /// Matches the store
    #[default]
    Unchanged,

    /// Stored, then modified in memory
    Updated,

    /// Not yet written to the store
    Added,
}

impl Display for RowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RowState::Unchanged => write!(f, "unchanged"),
            RowState::Updated => write!(f, "updated"),
            RowState::Added => write!(f, "added"),
        }
    }
}

/// One tuple of a table
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    state: RowState,
    position: Option<usize>,
    primary_hash: Option<KeyHash>,
    original_key: Option<KeyValues>,
}

impl Row {
    /// Create a detached row
    pub(crate) fn new(values: Vec<Value>, state: RowState) -> Self {
        Row {
            values,
            state,
            position: None,
            primary_hash: None,
            original_key: None,
        }
    }

    /// Values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a column position
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    /// Change state
    pub fn state(&self) -> RowState {
        self.state
    }

    /// Position in the owning table, `None` when detached
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Whether the row is not part of a table
    pub fn is_detached(&self) -> bool {
        self.position.is_none()
    }

    /// Cached primary key hash
    pub fn primary_hash(&self) -> Option<&KeyHash> {
        self.primary_hash.as_ref()
    }

    /// Primary key the row had in the store before its key columns changed
    pub fn original_key(&self) -> Option<&KeyValues> {
        self.original_key.as_ref()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Value> {
        &mut self.values
    }

    pub(crate) fn set_raw(&mut self, column: usize, value: Value) -> Value {
        std::mem::replace(&mut self.values[column], value)
    }

    pub(crate) fn set_position(&mut self, position: Option<usize>) {
        self.position = position;
    }

    pub(crate) fn set_primary_hash(&mut self, hash: Option<KeyHash>) {
        self.primary_hash = hash;
    }

    /// Unchanged rows become Updated; Added and Updated rows stay put.
    /// `key` is the primary key before the change and is kept as the
    /// store-side identity until the next synchronization.
    pub(crate) fn mark_updated(&mut self, key: Option<KeyValues>) {
        if self.state == RowState::Unchanged {
            self.state = RowState::Updated;
            self.original_key = key;
        }
    }

    pub(crate) fn mark_unchanged(&mut self) {
        self.state = RowState::Unchanged;
        self.original_key = None;
    }

    pub(crate) fn restore_state(&mut self, state: RowState, original_key: Option<KeyValues>) {
        self.state = state;
        self.original_key = original_key;
    }
}
