//! SQLite connection implementing the engine's store seam

use std::path::Path;
use log::{debug, info};
use rusqlite::{params_from_iter, OpenFlags};

use rowbound_core::error::Result as CoreResult;
use rowbound_core::models::{KeyValues, ResultSet, Value};
use rowbound_core::schema::StoreColumn;
use rowbound_core::sync::{Connection, ExecuteOutcome, Statement};
use rowbound_core::utils::StringUtils;

use crate::config::StoreConfig;
use crate::convert::{column_type_from_decl, from_sql, to_sql};
use crate::error::{Result, StoreError};

/// Connection to one SQLite database
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    config: StoreConfig,
}

impl SqliteConnection {
    /// Open the database the configuration names
    pub fn open(config: StoreConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => Self::open_file(path)?,
            None => rusqlite::Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout())?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        info!(
            "opened SQLite database {}",
            config.path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".into())
        );
        Ok(SqliteConnection { conn, config })
    }

    /// Open a fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    fn open_file(path: &Path) -> Result<rusqlite::Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(rusqlite::Connection::open_with_flags(path, flags)?)
    }

    /// Settings the connection was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run raw SQL, such as DDL, outside the engine
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Columns of a table as the database reports them
    pub fn introspect_columns(&self, table: &str) -> Result<Vec<StoreColumn>> {
        let sql = format!("PRAGMA table_info({})", StringUtils::quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get("name")?;
                let decl: String = row.get("type")?;
                let not_null: bool = row.get("notnull")?;
                let pk: i64 = row.get("pk")?;
                Ok(StoreColumn {
                    name,
                    column_type: column_type_from_decl(&decl),
                    nullable: !not_null && pk == 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("{}: store reports {} columns", table, columns.len());
        Ok(columns)
    }

    fn run(&mut self, statement: &Statement) -> Result<ExecuteOutcome> {
        debug!("execute: {}", StringUtils::abbreviate(&statement.sql, 200));
        let mut stmt = self.conn.prepare_cached(&statement.sql)?;
        let affected = stmt.execute(params_from_iter(statement.params.iter().map(to_sql)))?;
        drop(stmt);

        let mut generated_keys = KeyValues::new();
        match statement.returning.as_slice() {
            [] => {}
            [column] => generated_keys.insert(column.clone(), Value::BigInt(self.conn.last_insert_rowid())),
            more => {
                return Err(StoreError::Unsupported(format!(
                    "{} generated columns in one insert",
                    more.len()
                )))
            }
        }
        Ok(ExecuteOutcome { affected_rows: affected, generated_keys })
    }

    fn select(&mut self, statement: &Statement) -> Result<ResultSet> {
        debug!("query: {}", StringUtils::abbreviate(&statement.sql, 200));
        let mut stmt = self.conn.prepare_cached(&statement.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let mut result = ResultSet::new(columns);
        let mut rows = stmt.query(params_from_iter(statement.params.iter().map(to_sql)))?;
        while let Some(row) = rows.next()? {
            let record = (0..width)
                .map(|i| from_sql(row.get_ref(i)?))
                .collect::<Result<Vec<_>>>()?;
            result.records.push(record);
        }
        Ok(result)
    }

    fn command(&mut self, sql: &str, expect_open: bool) -> Result<()> {
        if self.in_transaction() != expect_open {
            return Err(StoreError::Transaction(format!(
                "{} with{} an open transaction",
                sql,
                if expect_open { "out" } else { "" }
            )));
        }
        self.conn.execute_batch(sql)?;
        debug!("{}", sql);
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute(&mut self, statement: &Statement) -> CoreResult<ExecuteOutcome> {
        Ok(self.run(statement)?)
    }

    fn query(&mut self, statement: &Statement) -> CoreResult<ResultSet> {
        Ok(self.select(statement)?)
    }

    fn begin(&mut self) -> CoreResult<()> {
        Ok(self.command("BEGIN", false)?)
    }

    fn commit(&mut self) -> CoreResult<()> {
        Ok(self.command("COMMIT", true)?)
    }

    fn rollback(&mut self) -> CoreResult<()> {
        Ok(self.command("ROLLBACK", true)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbound_core::error::CoreError;
    use rowbound_core::models::ColumnType;
    use tempfile::tempdir;

    fn with_people() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE people (ID INTEGER PRIMARY KEY AUTOINCREMENT, NAME VARCHAR(20) NOT NULL, NOTE TEXT)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_execute_reports_generated_key() {
        let mut conn = with_people();
        let mut insert = Statement::new("INSERT INTO people (NAME) VALUES (?)", vec![Value::from("a")]);
        insert.returning = vec!["ID".into()];
        let outcome = conn.execute(&insert).unwrap();
        assert_eq!(outcome.affected_rows, 1);
        assert_eq!(outcome.generated_keys.get("ID"), Some(&Value::BigInt(1)));

        let update = Statement::new("UPDATE people SET NOTE = ? WHERE ID = ?", vec![Value::from("n"), Value::from(5i64)]);
        assert_eq!(conn.execute(&update).unwrap().affected_rows, 0);
    }

    #[test]
    fn test_query() {
        let mut conn = with_people();
        conn.execute_batch("INSERT INTO people (NAME, NOTE) VALUES ('a', NULL), ('b', 'x')").unwrap();
        let result = conn
            .query(&Statement::new("SELECT ID, NAME, NOTE FROM people ORDER BY ID", Vec::new()))
            .unwrap();
        assert_eq!(result.columns, vec!["ID", "NAME", "NOTE"]);
        assert_eq!(result.records[1], vec![Value::BigInt(2), Value::from("b"), Value::from("x")]);
        assert_eq!(result.records[0][2], Value::Null);
    }

    #[test]
    fn test_transaction_commands() {
        let mut conn = with_people();
        assert!(matches!(conn.commit(), Err(CoreError::StoreError(_))));

        conn.begin().unwrap();
        assert!(conn.in_transaction());
        assert!(conn.begin().is_err());
        conn.execute(&Statement::new("INSERT INTO people (NAME) VALUES ('gone')", Vec::new())).unwrap();
        conn.rollback().unwrap();

        let count = conn.query(&Statement::new("SELECT COUNT(*) AS N FROM people", Vec::new())).unwrap();
        assert_eq!(count.records[0][0], Value::BigInt(0));
    }

    #[test]
    fn test_introspect_columns() {
        let conn = with_people();
        let columns = conn.introspect_columns("people").unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].column_type, Some(ColumnType::Integer));
        assert!(!columns[0].nullable);
        assert_eq!(columns[1].column_type, Some(ColumnType::VarChar(20)));
        assert!(!columns[1].nullable);
        assert!(columns[2].nullable);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rowbound.db");
        {
            let conn = SqliteConnection::open(StoreConfig::with_path(&path)).unwrap();
            conn.execute_batch("CREATE TABLE t (A INTEGER)").unwrap();
        }
        let conn = SqliteConnection::open(StoreConfig::with_path(&path)).unwrap();
        assert_eq!(conn.introspect_columns("t").unwrap().len(), 1);
    }
}
