//! Table registry and join path resolution
//!
//! Linked columns name a table, a column in it and the local foreign-key
//! column. The registry knows the primary keys of registered tables and
//! turns such a link into the join needed to select the value.

use std::collections::HashMap;
use log::debug;

use crate::error::{to_config_error, CoreError, Result};
use crate::models::{Column, Table};
use crate::utils::StringUtils;

/// Join needed to pull a linked column's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPath {
    /// Table holding the value
    pub target_table: String,

    /// Alias of the joined table in the select
    pub target_alias: String,

    /// Column holding the value
    pub target_column: String,

    /// Primary key column of the target table
    pub target_key: String,

    /// Local column referencing the target key
    pub local_column: String,
}

impl JoinPath {
    /// Select-list fragment producing the value under `output` as column name
    pub fn select_fragment(&self, output: &str) -> String {
        format!(
            "{}.{} AS {}",
            StringUtils::quote_identifier(&self.target_alias),
            StringUtils::quote_identifier(&self.target_column),
            StringUtils::quote_identifier(output)
        )
    }

    /// Join condition against the local table known as `local_alias`
    pub fn join_condition(&self, local_alias: &str) -> String {
        format!(
            "{}.{} = {}.{}",
            StringUtils::quote_identifier(&self.target_alias),
            StringUtils::quote_identifier(&self.target_key),
            StringUtils::quote_identifier(local_alias),
            StringUtils::quote_identifier(&self.local_column)
        )
    }
}

/// Resolves linked columns to join paths
pub trait JoinPathResolver {
    /// Join path for a linked column
    fn resolve(&self, column: &Column) -> Result<JoinPath>;
}

#[derive(Debug, Clone)]
struct Registration {
    name: String,
    alias: Option<String>,
    primary_key: Vec<String>,
}

/// Explicit registry of tables available for joins
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, Registration>,
}

impl TableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table by its name, alias and primary key
    pub fn register(&mut self, table: &Table) {
        let primary_key = table
            .primary_key_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        self.register_key(table.name(), table.alias(), primary_key);
    }

    /// Register a table known only by name and key
    pub fn register_key(&mut self, name: &str, alias: Option<&str>, primary_key: Vec<String>) {
        debug!("registered table {} for joins", name);
        self.tables.insert(
            name.to_lowercase(),
            Registration {
                name: name.to_string(),
                alias: alias.map(str::to_string),
                primary_key,
            },
        );
    }

    /// Whether a table is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl JoinPathResolver for TableRegistry {
    fn resolve(&self, column: &Column) -> Result<JoinPath> {
        let link = column
            .link()
            .ok_or_else(|| to_config_error(format!("column {} is not linked", column.name())))?;
        let target = self
            .tables
            .get(&link.table.to_lowercase())
            .ok_or_else(|| to_config_error(format!("table {} is not registered", link.table)))?;
        let target_key = match target.primary_key.as_slice() {
            [key] => key.clone(),
            [] => return Err(CoreError::MissingPrimaryKey(target.name.clone())),
            _ => {
                return Err(to_config_error(format!(
                    "table {} has a composite key and cannot be joined through {}",
                    target.name, link.via
                )))
            }
        };

        Ok(JoinPath {
            target_table: target.name.clone(),
            target_alias: target
                .alias
                .clone()
                .unwrap_or_else(|| format!("{}_{}", target.name, column.name().to_lowercase())),
            target_column: link.column.clone(),
            target_key,
            local_column: link.via.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnLink, ColumnType};

    fn customers() -> Table {
        Table::builder("customers")
            .alias("c")
            .column(Column::new("ID", ColumnType::BigInt).not_null())
            .column(Column::new("NAME", ColumnType::Text))
            .primary_key(["ID"])
            .build()
            .unwrap()
    }

    fn linked() -> Column {
        Column::new("CUSTOMER_NAME", ColumnType::Text).linked(ColumnLink {
            table: "Customers".into(),
            column: "NAME".into(),
            via: "CUSTOMER_ID".into(),
        })
    }

    #[test]
    fn test_resolve() {
        let mut registry = TableRegistry::new();
        registry.register(&customers());
        assert!(registry.contains("CUSTOMERS"));

        let path = registry.resolve(&linked()).unwrap();
        assert_eq!(path.target_table, "customers");
        assert_eq!(path.target_key, "ID");
        assert_eq!(path.select_fragment("CUSTOMER_NAME"), "\"c\".\"NAME\" AS \"CUSTOMER_NAME\"");
        assert_eq!(path.join_condition("o"), "\"c\".\"ID\" = \"o\".\"CUSTOMER_ID\"");
    }

    #[test]
    fn test_resolve_errors() {
        let mut registry = TableRegistry::new();
        assert!(matches!(registry.resolve(&linked()), Err(CoreError::ConfigError(_))));
        assert!(matches!(
            registry.resolve(&Column::new("X", ColumnType::Text)),
            Err(CoreError::ConfigError(_))
        ));

        registry.register_key("customers", None, Vec::new());
        assert!(matches!(registry.resolve(&linked()), Err(CoreError::MissingPrimaryKey(_))));

        registry.register_key("customers", None, vec!["A".into(), "B".into()]);
        assert!(matches!(registry.resolve(&linked()), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_default_alias() {
        let mut registry = TableRegistry::new();
        registry.register_key("customers", None, vec!["ID".into()]);
        let path = registry.resolve(&linked()).unwrap();
        assert_eq!(path.target_alias, "customers_customer_name");
    }
}
