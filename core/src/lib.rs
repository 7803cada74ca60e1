//! # Rowbound Core
//!
//! In-memory tables with typed columns, unique indices, change tracking and
//! synchronization with a relational store.
//! The store itself sits behind the `Connection` and `StatementBuilder` traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod models;
pub mod registry;
pub mod schema;
pub mod shared;
pub mod sync;
pub mod utils;

/// Re-export common types for ease of use
pub use config::{CoreConfig, SyncConfig, TableConfig};
pub use crypto::{HashComputer, KeyHash};
pub use error::{CoreError, Result};
pub use events::{TableEvent, TableListener};
pub use models::{
    Column, ColumnType, FillMode, KeyValues, ResultSet, Row, RowState, Table, TableBuilder, Value,
};
pub use registry::{JoinPath, JoinPathResolver, TableRegistry};
pub use shared::SharedTable;
pub use sync::{Connection, StatementBuilder, SyncReport, Synchronizer};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hash a key given as name-value pairs with the default algorithm.
///
/// All-null keys hash to [`KeyHash::EMPTY`].
pub fn key_hash<'a, I>(pairs: I) -> KeyHash
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    HashComputer::new(Default::default(), true).compute(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hash_matches_table_hashing() {
        let table = Table::builder("t")
            .column(Column::new("ID", ColumnType::Integer).not_null())
            .primary_key(["ID"])
            .build()
            .unwrap();
        let id = Value::Integer(3);
        assert_eq!(key_hash([("ID", &id)]), table.hash_computer().compute([("ID", &id)]));
        assert!(key_hash([("ID", &Value::Null)]).is_empty());
    }
}
