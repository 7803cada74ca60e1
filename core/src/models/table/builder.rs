//! Table construction
//!
//! Columns and indices are registered explicitly and validated as a whole
//! when the table is built.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{CoreConfig, HashAlgorithm, TableConfig};
use crate::crypto::HashComputer;
use crate::error::Result;
use crate::events::TableListener;
use crate::models::column::Column;
use crate::models::index::{Index, IndexDef, IndexKind};
use crate::schema::SchemaValidator;
use super::Table;

/// Builder for [`Table`]
#[derive(Default)]
pub struct TableBuilder {
    name: String,
    schema: Option<String>,
    alias: Option<String>,
    columns: Vec<Column>,
    indices: Vec<IndexDef>,
    config: TableConfig,
    algorithm: HashAlgorithm,
    listeners: Vec<Arc<dyn TableListener>>,
}

impl TableBuilder {
    /// Start a table definition
    pub fn new(name: impl Into<String>) -> Self {
        TableBuilder {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Schema the table lives in
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Alias used in joined selects
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Append a column
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare the primary key. The index is named `pk_<table>`.
    pub fn primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let name = format!("pk_{}", self.name);
        self.indices.push(IndexDef::new(name, columns, IndexKind::Primary));
        self
    }

    /// Declare a unique index
    pub fn unique<S: Into<String>>(mut self, name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        self.indices.push(IndexDef::new(name, columns, IndexKind::Unique));
        self
    }

    /// Declare a non-unique index
    pub fn index<S: Into<String>>(mut self, name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        self.indices.push(IndexDef::new(name, columns, IndexKind::NonUnique));
        self
    }

    /// Add a prepared index definition
    pub fn index_def(mut self, def: IndexDef) -> Self {
        self.indices.push(def);
        self
    }

    /// Behavioral flags
    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Key hash algorithm
    pub fn hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Take flags and hash algorithm from a core configuration
    pub fn with_core_config(self, config: &CoreConfig) -> Self {
        self.config(config.table).hash_algorithm(config.hashing.algorithm)
    }

    /// Register a change listener
    pub fn listener(mut self, listener: Arc<dyn TableListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Validate the definition and create an empty table
    pub fn build(self) -> Result<Table> {
        SchemaValidator::validate_definition(&self.name, &self.columns, &self.indices)?;

        let computer = HashComputer::new(self.algorithm, self.config.allow_multiple_nulls);
        let indices = self
            .indices
            .iter()
            .map(|def| Index::new(def, &self.columns, computer))
            .collect::<Result<Vec<_>>>()?;
        let primary = indices.iter().position(|ix| ix.kind() == IndexKind::Primary);

        let mut table = Table {
            name: self.name,
            schema: self.schema,
            alias: self.alias,
            columns: self.columns,
            indices,
            primary,
            rows: Vec::new(),
            pending_deletions: Vec::new(),
            config: self.config,
            computer,
            column_cache: HashMap::new(),
            listeners: self.listeners,
        };
        table.rebuild_column_cache();
        Ok(table)
    }
}
