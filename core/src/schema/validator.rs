//! Table definition validation
//!
//! This module checks a table definition before the table is built.

use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Column, IndexDef, IndexKind};

/// Table definition error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table has no name
    #[error("Table name must not be empty")]
    EmptyTableName,

    /// Table has no columns
    #[error("Table {0} has no columns")]
    NoColumns(String),

    /// Column already exists
    #[error("Column {0} already exists in table {1}")]
    ColumnAlreadyExists(String, String),

    /// Column does not exist
    #[error("Column {0} does not exist in table {1}")]
    ColumnNotFound(String, String),

    /// Index already exists
    #[error("Index {0} already exists in table {1}")]
    IndexAlreadyExists(String, String),

    /// Index without columns
    #[error("Index {0} in table {1} has no columns")]
    EmptyIndex(String, String),

    /// More than one primary index
    #[error("Table {0} declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// Nullable column in primary key
    #[error("Primary key column {0} in table {1} cannot be nullable")]
    NullablePrimaryKey(String, String),

    /// Linked column participating in writes
    #[error("Linked column {0} in table {1} cannot be persistent")]
    PersistentLinkedColumn(String, String),

    /// Default value of the wrong type
    #[error("Default value of column {0} in table {1} does not fit its type: {2}")]
    InvalidDefault(String, String, String),
}

/// Schema validation result
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Table definition validator
#[derive(Debug, Clone)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate columns and indices of a table definition
    pub fn validate_definition(table: &str, columns: &[Column], indices: &[IndexDef]) -> ValidationResult<()> {
        if table.trim().is_empty() {
            return Err(ValidationError::EmptyTableName);
        }
        if columns.is_empty() {
            return Err(ValidationError::NoColumns(table.to_string()));
        }

        let mut names = HashSet::new();
        for column in columns {
            Self::validate_column(table, column)?;
            if !names.insert(column.name().to_lowercase()) {
                return Err(ValidationError::ColumnAlreadyExists(
                    column.name().to_string(),
                    table.to_string(),
                ));
            }
        }

        let mut index_names = HashSet::new();
        let mut primary_seen = false;
        for index in indices {
            Self::validate_index(table, columns, index)?;
            if !index_names.insert(index.name.to_lowercase()) {
                return Err(ValidationError::IndexAlreadyExists(index.name.clone(), table.to_string()));
            }
            if index.kind == IndexKind::Primary {
                if primary_seen {
                    return Err(ValidationError::MultiplePrimaryKeys(table.to_string()));
                }
                primary_seen = true;
            }
        }

        Ok(())
    }

    /// Validate one column on its own
    pub fn validate_column(table: &str, column: &Column) -> ValidationResult<()> {
        if column.link().is_some() && column.is_persistent() {
            return Err(ValidationError::PersistentLinkedColumn(
                column.name().to_string(),
                table.to_string(),
            ));
        }
        if let Some(default) = column.default() {
            column.column_type().coerce(default.clone()).map_err(|e| {
                ValidationError::InvalidDefault(column.name().to_string(), table.to_string(), e.to_string())
            })?;
        }
        Ok(())
    }

    /// Validate one index against the columns it covers
    pub fn validate_index(table: &str, columns: &[Column], index: &IndexDef) -> ValidationResult<()> {
        if index.columns.is_empty() {
            return Err(ValidationError::EmptyIndex(index.name.clone(), table.to_string()));
        }
        for name in &index.columns {
            let column = columns
                .iter()
                .find(|c| c.matches_name(name))
                .ok_or_else(|| ValidationError::ColumnNotFound(name.clone(), table.to_string()))?;

            // Auto-generated keys are null-free once the store assigns them
            if index.kind == IndexKind::Primary && column.is_nullable() && !column.is_auto_generated() {
                return Err(ValidationError::NullablePrimaryKey(
                    column.name().to_string(),
                    table.to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnLink, ColumnType};

    fn columns() -> Vec<Column> {
        vec![
            Column::new("ID", ColumnType::BigInt).not_null(),
            Column::new("NAME", ColumnType::VarChar(40)),
        ]
    }

    #[test]
    fn test_valid_definition() {
        let indices = vec![
            IndexDef::new("PK", ["ID"], IndexKind::Primary),
            IndexDef::new("UQ_NAME", ["name"], IndexKind::Unique),
        ];
        assert!(SchemaValidator::validate_definition("users", &columns(), &indices).is_ok());
    }

    #[test]
    fn test_duplicate_column_names() {
        let mut cols = columns();
        cols.push(Column::new("id", ColumnType::Integer));
        assert_eq!(
            SchemaValidator::validate_definition("users", &cols, &[]),
            Err(ValidationError::ColumnAlreadyExists("id".into(), "users".into()))
        );
    }

    #[test]
    fn test_index_errors() {
        let cols = columns();
        let missing = vec![IndexDef::new("IX", ["AGE"], IndexKind::NonUnique)];
        assert_eq!(
            SchemaValidator::validate_definition("users", &cols, &missing),
            Err(ValidationError::ColumnNotFound("AGE".into(), "users".into()))
        );

        let nullable_pk = vec![IndexDef::new("PK", ["NAME"], IndexKind::Primary)];
        assert_eq!(
            SchemaValidator::validate_definition("users", &cols, &nullable_pk),
            Err(ValidationError::NullablePrimaryKey("NAME".into(), "users".into()))
        );

        let two_pks = vec![
            IndexDef::new("PK", ["ID"], IndexKind::Primary),
            IndexDef::new("PK2", ["ID"], IndexKind::Primary),
        ];
        assert_eq!(
            SchemaValidator::validate_definition("users", &cols, &two_pks),
            Err(ValidationError::MultiplePrimaryKeys("users".into()))
        );

        let empty = vec![IndexDef::new("IX", Vec::<String>::new(), IndexKind::Unique)];
        assert!(matches!(
            SchemaValidator::validate_definition("users", &cols, &empty),
            Err(ValidationError::EmptyIndex(..))
        ));
    }

    #[test]
    fn test_column_errors() {
        let linked = Column::new("CITY", ColumnType::Text)
            .linked(ColumnLink { table: "cities".into(), column: "name".into(), via: "city_id".into() })
            .persistent(true);
        assert!(matches!(
            SchemaValidator::validate_column("users", &linked),
            Err(ValidationError::PersistentLinkedColumn(..))
        ));

        let bad_default = Column::new("AGE", ColumnType::Integer).default_value("old");
        assert!(matches!(
            SchemaValidator::validate_column("users", &bad_default),
            Err(ValidationError::InvalidDefault(..))
        ));

        assert_eq!(SchemaValidator::validate_definition(" ", &columns(), &[]), Err(ValidationError::EmptyTableName));
        assert_eq!(
            SchemaValidator::validate_definition("users", &[], &[]),
            Err(ValidationError::NoColumns("users".into()))
        );
    }
}
