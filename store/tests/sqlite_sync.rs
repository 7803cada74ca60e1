//! Tables synchronized against a real SQLite database

use rowbound_core::error::CoreError;
use rowbound_core::models::{Column, ColumnLink, ColumnType, FillMode, KeyValues, RowState, Table, Value};
use rowbound_core::schema::{Drift, DriftPolicy};
use rowbound_core::sync::{Connection, Statement};
use rowbound_core::{SyncConfig, Synchronizer, TableRegistry};
use rowbound_sqlite::{check_schema, load_table, SqlStatementBuilder, SqliteConnection, StoreConfig};
use rstest::{fixture, rstest};

#[fixture]
fn db() -> SqliteConnection {
    let _ = env_logger::builder().is_test(true).try_init();
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE customers (ID INTEGER PRIMARY KEY AUTOINCREMENT, NAME VARCHAR(40) NOT NULL UNIQUE);
         CREATE TABLE orders (
             ID INTEGER PRIMARY KEY AUTOINCREMENT,
             CUSTOMER_ID INTEGER REFERENCES customers(ID),
             AMOUNT DECIMAL(10,2) NOT NULL,
             PAID BOOLEAN NOT NULL DEFAULT 0
         );
         INSERT INTO customers (NAME) VALUES ('ada'), ('brian');",
    )
    .unwrap();
    conn
}

fn customers() -> Table {
    Table::builder("customers")
        .column(Column::new("ID", ColumnType::BigInt).auto_generated())
        .column(Column::new("NAME", ColumnType::VarChar(40)).not_null())
        .primary_key(["ID"])
        .unique("UQ_CUSTOMERS_NAME", ["NAME"])
        .build()
        .unwrap()
}

fn orders() -> Table {
    Table::builder("orders")
        .alias("o")
        .column(Column::new("ID", ColumnType::BigInt).auto_generated())
        .column(Column::new("CUSTOMER_ID", ColumnType::BigInt))
        .column(Column::new("AMOUNT", ColumnType::Decimal { precision: 10, scale: 2 }).not_null())
        .column(Column::new("PAID", ColumnType::Boolean).default_value(false))
        .column(Column::new("CUSTOMER", ColumnType::Text).linked(ColumnLink {
            table: "customers".into(),
            column: "NAME".into(),
            via: "CUSTOMER_ID".into(),
        }))
        .primary_key(["ID"])
        .build()
        .unwrap()
}

fn count(conn: &mut SqliteConnection, sql: &str) -> Value {
    conn.query(&Statement::new(sql, Vec::new())).unwrap().records[0][0].clone()
}

#[rstest]
fn load_insert_update_delete_round_trip(mut db: SqliteConnection) {
    let mut table = customers();
    assert_eq!(load_table(&mut db, &mut table, FillMode::Overwrite, None).unwrap(), 2);
    assert_eq!(table.get_value(0, "NAME").unwrap(), &Value::from("ada"));
    assert!(!table.has_changes());

    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());
    table.add_row([("NAME", Value::from("cleo"))]).unwrap();
    table.set_value(0, "NAME", Value::from("ada l.")).unwrap();
    table.remove_rows(&KeyValues::new().with("NAME", "brian")).unwrap();

    let report = sync.synchronize(&mut table, &mut db).unwrap();
    assert_eq!((report.inserted, report.updated, report.deleted), (1, 1, 1));
    assert_eq!(table.get_value(1, "ID").unwrap(), &Value::BigInt(3));
    assert!(!table.has_changes());

    let mut fresh = customers();
    load_table(&mut db, &mut fresh, FillMode::Overwrite, None).unwrap();
    let names: Vec<String> = fresh.rows().iter().map(|r| r.values()[1].to_display_string()).collect();
    assert_eq!(names, vec!["ada l.", "cleo"]);
}

#[rstest]
fn store_constraint_failure_rolls_back(mut db: SqliteConnection) {
    let mut table = customers();
    load_table(&mut db, &mut table, FillMode::Overwrite, None).unwrap();
    table.remove_row(0).unwrap();

    // Unknown to the in-memory index, rejected by the database
    let mut other = customers();
    other.add_row([("NAME", Value::from("brian"))]).unwrap();

    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());
    let err = sync.synchronize(&mut other, &mut db).unwrap_err();
    assert!(matches!(err, CoreError::SyncError { .. }));
    assert_eq!(other.row(0).unwrap().state(), RowState::Added);
    assert!(!db.in_transaction());

    sync.synchronize(&mut table, &mut db).unwrap();
    assert_eq!(count(&mut db, "SELECT COUNT(*) FROM customers"), Value::BigInt(1));
}

#[rstest]
fn primary_key_change_updates_the_stored_row(mut db: SqliteConnection) {
    let mut table = customers();
    load_table(&mut db, &mut table, FillMode::Overwrite, None).unwrap();
    table.set_value(1, "ID", Value::from(20i64)).unwrap();

    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());
    sync.synchronize(&mut table, &mut db).unwrap();
    assert_eq!(count(&mut db, "SELECT NAME FROM customers WHERE ID = 20"), Value::from("brian"));
    assert_eq!(count(&mut db, "SELECT COUNT(*) FROM customers WHERE ID = 2"), Value::BigInt(0));
}

#[rstest]
fn immediate_operations_write_through(mut db: SqliteConnection) {
    let mut table = customers();
    load_table(&mut db, &mut table, FillMode::Overwrite, None).unwrap();
    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());

    let row = table.add_row_immediate([("NAME", Value::from("dora"))], &sync, &mut db).unwrap();
    assert_eq!(table.get_value(row, "ID").unwrap(), &Value::BigInt(3));
    assert_eq!(table.row(row).unwrap().state(), RowState::Unchanged);

    table.set_value_at_immediate(Value::from("dorothy"), row, 1, &sync, &mut db).unwrap();
    assert_eq!(count(&mut db, "SELECT NAME FROM customers WHERE ID = 3"), Value::from("dorothy"));

    table.remove_rows_immediate(&KeyValues::new().with("ID", 1), &sync, &mut db).unwrap();
    assert!(table.pending_deletions().is_empty());
    assert_eq!(count(&mut db, "SELECT COUNT(*) FROM customers"), Value::BigInt(2));
}

#[rstest]
fn refresh_picks_up_external_changes(mut db: SqliteConnection) {
    let mut table = customers();
    load_table(&mut db, &mut table, FillMode::Overwrite, None).unwrap();
    db.execute_batch("UPDATE customers SET NAME = 'ADA' WHERE ID = 1; DELETE FROM customers WHERE ID = 2;")
        .unwrap();

    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());
    sync.refresh_row(&mut table, 0, None, &mut db).unwrap();
    assert_eq!(table.get_value(0, "NAME").unwrap(), &Value::from("ADA"));

    let err = sync.refresh_row(&mut table, 1, None, &mut db).unwrap_err();
    assert!(matches!(err, CoreError::RowGoneInStore { .. }));

    table.set_value(1, "NAME", Value::from("ghost")).unwrap();
    let err = sync.synchronize(&mut table, &mut db).unwrap_err();
    assert!(matches!(err, CoreError::SyncError { ref source, .. } if matches!(**source, CoreError::RowGoneInStore { .. })));
}

#[rstest]
fn linked_columns_are_joined_in(mut db: SqliteConnection) {
    db.execute_batch("INSERT INTO orders (CUSTOMER_ID, AMOUNT, PAID) VALUES (2, 12.5, 1), (NULL, 3, 0);")
        .unwrap();
    let mut registry = TableRegistry::new();
    registry.register(&customers());

    let mut table = orders();
    load_table(&mut db, &mut table, FillMode::Overwrite, Some(&registry)).unwrap();
    assert_eq!(table.get_value(0, "CUSTOMER").unwrap(), &Value::from("brian"));
    assert_eq!(table.get_value(0, "PAID").unwrap(), &Value::Boolean(true));
    assert_eq!(table.get_value(0, "AMOUNT").unwrap(), &Value::Float(12.5));
    assert_eq!(table.get_value(1, "CUSTOMER").unwrap(), &Value::Null);

    // Linked values never go back to the store
    table.set_value(0, "PAID", Value::from(false)).unwrap();
    let sync = Synchronizer::new(&SqlStatementBuilder, SyncConfig::default());
    sync.synchronize(&mut table, &mut db).unwrap();
    assert_eq!(count(&mut db, "SELECT PAID FROM orders WHERE ID = 1"), Value::BigInt(0));
}

#[rstest]
#[case(DriftPolicy::Accept, true)]
#[case(DriftPolicy::Drop, true)]
#[case(DriftPolicy::Fail, false)]
fn drift_policies(#[case] policy: DriftPolicy, #[case] succeeds: bool) {
    let conn = SqliteConnection::open(StoreConfig { drift_policy: policy, ..StoreConfig::in_memory() }).unwrap();
    conn.execute_batch("CREATE TABLE customers (ID INTEGER PRIMARY KEY, NAME TEXT, EXTRA TEXT)").unwrap();

    let mut table = Table::builder("customers")
        .column(Column::new("ID", ColumnType::BigInt).not_null())
        .column(Column::new("NAME", ColumnType::Text))
        .column(Column::new("NICKNAME", ColumnType::Text))
        .primary_key(["ID"])
        .build()
        .unwrap();

    let result = check_schema(&conn, &mut table);
    assert_eq!(result.is_ok(), succeeds);
    match result {
        Ok(report) => {
            assert!(report.drifts.contains(&Drift::MissingInStore("NICKNAME".into())));
            assert!(report.drifts.contains(&Drift::ExtraInStore("EXTRA".into())));
            let kept = table.column_index("NICKNAME").is_some();
            assert_eq!(kept, policy == DriftPolicy::Accept);
        }
        Err(err) => assert!(matches!(err, CoreError::StructuralDrift { .. })),
    }
}
