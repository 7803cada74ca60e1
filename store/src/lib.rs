//! # Rowbound SQLite Store
//!
//! SQLite backing for rowbound tables: a `Connection` over `rusqlite`, a
//! statement builder for the SQLite dialect, and helpers that load tables
//! and check them against the database schema.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod connection;
pub mod convert;
pub mod error;

pub use builder::SqlStatementBuilder;
pub use config::StoreConfig;
pub use connection::SqliteConnection;
pub use error::{Result, StoreError};

use log::info;

use rowbound_core::models::{FillMode, Table};
use rowbound_core::registry::JoinPathResolver;
use rowbound_core::schema::{self, DriftReport};
use rowbound_core::sync::Synchronizer;
use rowbound_core::SyncConfig;

/// Select every row of `table` from the database and load it.
///
/// Linked columns are joined in when a resolver is given.
pub fn load_table(
    conn: &mut SqliteConnection,
    table: &mut Table,
    mode: FillMode,
    resolver: Option<&dyn JoinPathResolver>,
) -> rowbound_core::Result<usize> {
    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());
    let count = sync.load(table, mode, resolver, conn)?;
    info!("{}: {} rows loaded from SQLite", table.name(), count);
    Ok(count)
}

/// Compare the declared columns of `table` with the database and react
/// according to the connection's drift policy
pub fn check_schema(conn: &SqliteConnection, table: &mut Table) -> rowbound_core::Result<DriftReport> {
    let store_columns = conn.introspect_columns(table.name())?;
    schema::reconcile(table, &store_columns, conn.config().drift_policy)
}
