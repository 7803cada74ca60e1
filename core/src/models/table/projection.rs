//! Columnar projection for display adapters
//!
//! Grid and tree views consume a table through [`TableModel`] without
//! depending on its mutation surface.

use crate::models::value::{ColumnType, Value};
use super::Table;

/// Read-only columnar view of a table
pub trait TableModel {
    /// Number of rows
    fn row_count(&self) -> usize;

    /// Number of columns
    fn column_count(&self) -> usize;

    /// Column name at a position
    fn column_name(&self, column: usize) -> Option<&str>;

    /// Column type at a position
    fn column_type(&self, column: usize) -> Option<ColumnType>;

    /// Cell value by position
    fn value_at(&self, row: usize, column: usize) -> Option<&Value>;

    /// Cell value by column name
    fn value_by_name(&self, row: usize, column: &str) -> Option<&Value>;

    /// Every value of one column, top to bottom
    fn column_values(&self, column: usize) -> Vec<&Value> {
        (0..self.row_count())
            .filter_map(|row| self.value_at(row, column))
            .collect()
    }

    /// Formatted cell, empty for null or out of range
    fn display_at(&self, row: usize, column: usize) -> String {
        self.value_at(row, column)
            .map(Value::to_display_string)
            .unwrap_or_default()
    }
}

impl TableModel for Table {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, column: usize) -> Option<&str> {
        self.columns.get(column).map(|c| c.name())
    }

    fn column_type(&self, column: usize) -> Option<ColumnType> {
        self.columns.get(column).map(|c| *c.column_type())
    }

    fn value_at(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    fn value_by_name(&self, row: usize, column: &str) -> Option<&Value> {
        self.column_index(column).and_then(|c| self.value_at(row, c))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::users;
    use super::*;

    #[test]
    fn test_projection() {
        let mut table = users();
        table.add_row([("ID", Value::from(1i64)), ("NAME", "a".into())]).unwrap();
        table.add_row([("ID", Value::from(2i64)), ("NAME", "b".into()), ("AGE", Value::from(9))]).unwrap();

        let model: &dyn TableModel = &table;
        assert_eq!(model.row_count(), 2);
        assert_eq!(model.column_count(), 3);
        assert_eq!(model.column_name(1), Some("NAME"));
        assert_eq!(model.column_type(2), Some(ColumnType::Integer));
        assert_eq!(model.value_by_name(1, "age"), Some(&Value::Integer(9)));
        assert_eq!(model.column_values(1), vec![&Value::Text("a".into()), &Value::Text("b".into())]);
        assert_eq!(model.display_at(0, 2), "");
        assert_eq!(model.display_at(1, 0), "2");
        assert_eq!(model.display_at(9, 9), "");
    }
}
