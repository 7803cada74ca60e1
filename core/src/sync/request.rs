//! Write and select requests handed to the statement builder

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::models::{KeyValues, Row, Table, Value};
use crate::registry::{JoinPath, JoinPathResolver};

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteKind {
    /// INSERT
    Insert,

    /// UPDATE keyed by primary key
    Update,

    /// DELETE keyed by a key-value set
    Delete,
}

/// Dialect-neutral description of one write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// Kind of write
    pub kind: WriteKind,

    /// Target table
    pub table: String,

    /// Target schema
    pub schema: Option<String>,

    /// Written columns; empty for deletes
    pub columns: Vec<String>,

    /// Values aligned to `columns`
    pub values: Vec<Value>,

    /// Row identity for updates and deletes; empty for inserts
    pub key: KeyValues,

    /// Store-generated columns an insert should report back
    pub generated: Vec<String>,
}

impl WriteRequest {
    /// INSERT of a row's persistent values. Auto-generated columns still
    /// holding their placeholder are left to the store and listed in
    /// `generated`.
    pub fn insert(table: &Table, row: &Row) -> Self {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        let mut generated = Vec::new();
        for (column, value) in table.columns().iter().zip(row.values()) {
            if !column.is_persistent() {
                continue;
            }
            if column.is_pending_auto_value(value) {
                generated.push(column.name().to_string());
                continue;
            }
            columns.push(column.name().to_string());
            values.push(value.clone());
        }
        WriteRequest {
            kind: WriteKind::Insert,
            table: table.name().to_string(),
            schema: table.schema().map(str::to_string),
            columns,
            values,
            key: KeyValues::new(),
            generated,
        }
    }

    /// UPDATE of every persistent value, keyed by `key`
    pub fn update(table: &Table, row: &Row, key: KeyValues) -> Self {
        let (columns, values) = table
            .columns()
            .iter()
            .zip(row.values())
            .filter(|(c, _)| c.is_persistent())
            .map(|(c, v)| (c.name().to_string(), v.clone()))
            .unzip();
        WriteRequest {
            kind: WriteKind::Update,
            table: table.name().to_string(),
            schema: table.schema().map(str::to_string),
            columns,
            values,
            key,
            generated: Vec::new(),
        }
    }

    /// DELETE of the rows matching `key`
    pub fn delete(table: &Table, key: KeyValues) -> Self {
        WriteRequest {
            kind: WriteKind::Delete,
            table: table.name().to_string(),
            schema: table.schema().map(str::to_string),
            columns: Vec::new(),
            values: Vec::new(),
            key,
            generated: Vec::new(),
        }
    }
}

/// Dialect-neutral description of a select
#[derive(Debug, Clone, PartialEq)]
pub struct SelectRequest {
    /// Source table
    pub table: String,

    /// Source schema
    pub schema: Option<String>,

    /// Alias of the source table
    pub alias: String,

    /// Persistent columns read from the source table
    pub columns: Vec<String>,

    /// Linked columns with the joins producing them
    pub joins: Vec<(String, JoinPath)>,

    /// Restricts the select to one key
    pub key: Option<KeyValues>,
}

impl SelectRequest {
    /// Select every persistent column of a table, plus linked columns the
    /// resolver can place. Without a resolver linked columns are skipped.
    pub fn for_table(table: &Table, resolver: Option<&dyn JoinPathResolver>, key: Option<KeyValues>) -> Result<Self> {
        let mut columns = Vec::new();
        let mut joins = Vec::new();
        for column in table.columns() {
            if column.is_persistent() {
                columns.push(column.name().to_string());
            } else if let (Some(resolver), Some(_)) = (resolver, column.link()) {
                joins.push((column.name().to_string(), resolver.resolve(column)?));
            }
        }
        Ok(SelectRequest {
            table: table.name().to_string(),
            schema: table.schema().map(str::to_string),
            alias: table.alias().unwrap_or(table.name()).to_string(),
            columns,
            joins,
            key,
        })
    }
}

/// Statement text with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text
    pub sql: String,

    /// Parameters in placeholder order
    pub params: Vec<Value>,

    /// Columns whose store-generated values the statement returns
    pub returning: Vec<String>,
}

impl Statement {
    /// Statement without generated columns
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Statement { sql: sql.into(), params, returning: Vec::new() }
    }
}

/// Renders requests into statements for one store dialect
pub trait StatementBuilder {
    /// Render a write
    fn write(&self, request: &WriteRequest) -> Result<Statement>;

    /// Render a select
    fn select(&self, request: &SelectRequest) -> Result<Statement>;
}
