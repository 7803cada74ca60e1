//! SQL rendering for SQLite
//!
//! Identifiers are always quoted and values always bound as `?`
//! parameters. Null key values compare with `IS NULL` and bind nothing.

use rowbound_core::error::{CoreError, Result};
use rowbound_core::models::{KeyValues, Value};
use rowbound_core::sync::{SelectRequest, Statement, StatementBuilder, WriteKind, WriteRequest};
use rowbound_core::utils::StringUtils;

use crate::error::StoreError;

/// Statement builder for the SQLite dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlStatementBuilder;

impl SqlStatementBuilder {
    /// Create a builder
    pub fn new() -> Self {
        SqlStatementBuilder
    }

    fn table_ref(schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", quote(schema), quote(table)),
            None => quote(table),
        }
    }

    /// `WHERE` clause for a key, appending bound values to `params`
    fn where_clause(qualifier: Option<&str>, key: &KeyValues, params: &mut Vec<Value>) -> String {
        let conditions: Vec<String> = key
            .iter()
            .map(|(name, value)| {
                let column = match qualifier {
                    Some(q) => format!("{}.{}", quote(q), quote(name)),
                    None => quote(name),
                };
                if value.is_null() {
                    format!("{} IS NULL", column)
                } else {
                    params.push(value.clone());
                    format!("{} = ?", column)
                }
            })
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    fn insert(request: &WriteRequest) -> Result<Statement> {
        if request.generated.len() > 1 {
            return Err(StoreError::Unsupported(format!(
                "{} has {} store-generated columns, SQLite reports one",
                request.table,
                request.generated.len()
            ))
            .into());
        }
        let target = Self::table_ref(request.schema.as_deref(), &request.table);
        let sql = if request.columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", target)
        } else {
            let columns: Vec<String> = request.columns.iter().map(|c| quote(c)).collect();
            let placeholders = vec!["?"; request.columns.len()].join(", ");
            format!("INSERT INTO {} ({}) VALUES ({})", target, columns.join(", "), placeholders)
        };
        let mut statement = Statement::new(sql, request.values.clone());
        statement.returning = request.generated.clone();
        Ok(statement)
    }

    fn update(request: &WriteRequest) -> Result<Statement> {
        require_key(request)?;
        let assignments: Vec<String> = request.columns.iter().map(|c| format!("{} = ?", quote(c))).collect();
        let mut params = request.values.clone();
        let filter = Self::where_clause(None, &request.key, &mut params);
        let sql = format!(
            "UPDATE {} SET {}{}",
            Self::table_ref(request.schema.as_deref(), &request.table),
            assignments.join(", "),
            filter
        );
        Ok(Statement::new(sql, params))
    }

    fn delete(request: &WriteRequest) -> Result<Statement> {
        require_key(request)?;
        let mut params = Vec::new();
        let filter = Self::where_clause(None, &request.key, &mut params);
        let sql = format!(
            "DELETE FROM {}{}",
            Self::table_ref(request.schema.as_deref(), &request.table),
            filter
        );
        Ok(Statement::new(sql, params))
    }
}

impl StatementBuilder for SqlStatementBuilder {
    fn write(&self, request: &WriteRequest) -> Result<Statement> {
        match request.kind {
            WriteKind::Insert => Self::insert(request),
            WriteKind::Update => Self::update(request),
            WriteKind::Delete => Self::delete(request),
        }
    }

    fn select(&self, request: &SelectRequest) -> Result<Statement> {
        let alias = request.alias.as_str();
        let mut items: Vec<String> = request
            .columns
            .iter()
            .map(|c| format!("{}.{} AS {}", quote(alias), quote(c), quote(c)))
            .collect();
        let mut joins = String::new();
        for (output, path) in &request.joins {
            items.push(path.select_fragment(output));
            joins.push_str(&format!(
                " LEFT JOIN {} AS {} ON {}",
                quote(&path.target_table),
                quote(&path.target_alias),
                path.join_condition(alias)
            ));
        }
        if items.is_empty() {
            return Err(CoreError::ShapeError(format!("nothing to select from {}", request.table)));
        }

        let mut params = Vec::new();
        let filter = match &request.key {
            Some(key) if !key.is_empty() => Self::where_clause(Some(alias), key, &mut params),
            _ => String::new(),
        };
        let sql = format!(
            "SELECT {} FROM {} AS {}{}{}",
            items.join(", "),
            Self::table_ref(request.schema.as_deref(), &request.table),
            quote(alias),
            joins,
            filter
        );
        Ok(Statement::new(sql, params))
    }
}

fn quote(name: &str) -> String {
    StringUtils::quote_identifier(name)
}

/// Updates and deletes without a key would hit every row
fn require_key(request: &WriteRequest) -> Result<()> {
    if request.key.is_empty() {
        return Err(CoreError::ShapeError(format!(
            "{:?} on {} without a key",
            request.kind, request.table
        )));
    }
    Ok(())
}
