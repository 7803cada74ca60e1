//! Table change notifications
//!
//! Listeners are called synchronously on the mutating thread, after the
//! mutation has been applied. They only receive the event, never the table.

use std::fmt::Debug;
use serde::{Serialize, Deserialize};

/// A change applied to a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableEvent {
    /// A row was appended at this position
    RowInserted {
        /// Row position
        row: usize,
    },

    /// A row changed. `column` is set for single-cell updates.
    RowUpdated {
        /// Row position
        row: usize,
        /// Changed column position
        column: Option<usize>,
    },

    /// The row formerly at this position was removed
    RowDeleted {
        /// Former row position
        row: usize,
    },

    /// Columns, indices or the whole row set changed
    StructureChanged,
}

/// Receives table events
pub trait TableListener: Send + Sync {
    /// Called after `table` applied a change
    fn table_changed(&self, table: &str, event: &TableEvent);
}

impl<F> TableListener for F
where
    F: Fn(&str, &TableEvent) + Send + Sync,
{
    fn table_changed(&self, table: &str, event: &TableEvent) {
        self(table, event)
    }
}
