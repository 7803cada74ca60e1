//! Data models of the table engine
//!
//! Values and column types, column descriptors, key-value sets, rows,
//! indices and the table aggregate that owns them.

mod value;
mod column;
mod key_values;
mod row;
mod index;
mod table;

pub use value::{Value, ValueType, ColumnType, CoercionError};
pub use column::{Column, ColumnLink, Validator, AUTO_VALUE_SENTINEL};
pub use key_values::KeyValues;
pub use row::{Row, RowState};
pub use index::{Index, IndexChange, IndexDef, IndexKind};
pub use table::{
    ChangeSummary, FillMode, ResultSet, RowHandle, Table, TableBuilder, TableModel,
};
