//! Row-scoped access to a table

use crate::error::Result;
use crate::models::key_values::KeyValues;
use crate::models::row::RowState;
use crate::models::value::Value;
use super::Table;

/// Mutable view of one row, addressing cells by column name.
///
/// The handle borrows the table, so index maintenance and change tracking
/// go through the table exactly as for positional calls.
#[derive(Debug)]
pub struct RowHandle<'a> {
    table: &'a mut Table,
    position: usize,
}

impl<'a> RowHandle<'a> {
    pub(super) fn new(table: &'a mut Table, position: usize) -> Self {
        RowHandle { table, position }
    }

    /// Row position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Change state
    pub fn state(&self) -> RowState {
        self.table.rows[self.position].state()
    }

    /// Value by column name
    pub fn get(&self, column: &str) -> Result<&Value> {
        self.table.get_value(self.position, column)
    }

    /// Set a value by column name, returning the previous one
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<Value> {
        self.table.set_value(self.position, column, value.into())
    }

    /// Primary key values
    pub fn key_values(&self) -> Result<KeyValues> {
        self.table.key_values_for(self.position)
    }

    /// Values in column order
    pub fn values(&self) -> &[Value] {
        self.table.rows[self.position].values()
    }
}
