//! End-to-end table behavior against a recording store

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rowbound_core::error::CoreError;
use rowbound_core::models::IndexDef;
use rowbound_core::models::IndexKind;
use rowbound_core::sync::{ExecuteOutcome, SelectRequest, Statement, WriteKind, WriteRequest};
use rowbound_core::{
    Column, ColumnType, Connection, FillMode, KeyValues, ResultSet, RowState, StatementBuilder, SyncConfig,
    Synchronizer, Table, TableEvent, Value,
};

/// Renders requests as `KIND table | key` and keeps nothing else
struct PlainBuilder;

impl StatementBuilder for PlainBuilder {
    fn write(&self, request: &WriteRequest) -> rowbound_core::Result<Statement> {
        let kind = match request.kind {
            WriteKind::Insert => "INSERT",
            WriteKind::Update => "UPDATE",
            WriteKind::Delete => "DELETE",
        };
        let mut statement = Statement::new(format!("{} {} | {}", kind, request.table, request.key), request.values.clone());
        statement.returning = request.generated.clone();
        Ok(statement)
    }

    fn select(&self, request: &SelectRequest) -> rowbound_core::Result<Statement> {
        Ok(Statement::new(format!("SELECT {}", request.table), Vec::new()))
    }
}

/// Records committed statements; hands out increasing generated keys
#[derive(Default)]
struct RecordingStore {
    pending: Vec<String>,
    committed: Vec<String>,
    next_key: i64,
    fail_on: Option<&'static str>,
}

impl Connection for RecordingStore {
    fn execute(&mut self, statement: &Statement) -> rowbound_core::Result<ExecuteOutcome> {
        if let Some(prefix) = self.fail_on {
            if statement.sql.starts_with(prefix) {
                return Err(CoreError::StoreError(format!("{} refused", prefix)));
            }
        }
        self.pending.push(statement.sql.clone());
        let mut outcome = ExecuteOutcome::affected(1);
        for column in &statement.returning {
            self.next_key += 1;
            outcome.generated_keys.insert(column.clone(), self.next_key);
        }
        Ok(outcome)
    }

    fn query(&mut self, _statement: &Statement) -> rowbound_core::Result<ResultSet> {
        Ok(ResultSet::new(["ID", "NAME"]))
    }

    fn begin(&mut self) -> rowbound_core::Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn commit(&mut self) -> rowbound_core::Result<()> {
        self.committed.append(&mut self.pending);
        Ok(())
    }

    fn rollback(&mut self) -> rowbound_core::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

fn auto_named() -> Table {
    Table::builder("tags")
        .column(Column::new("ID", ColumnType::BigInt).auto_generated())
        .column(Column::new("NAME", ColumnType::VarChar(32)).not_null())
        .primary_key(["ID"])
        .unique("UQ_TAGS_NAME", ["NAME"])
        .build()
        .unwrap()
}

fn keyed() -> Table {
    let _ = env_logger::builder().is_test(true).try_init();
    Table::builder("people")
        .column(Column::new("ID", ColumnType::Integer).not_null())
        .column(Column::new("NAME", ColumnType::Text))
        .primary_key(["ID"])
        .build()
        .unwrap()
}

fn names(table: &Table) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|r| r.values()[1].to_display_string())
        .collect()
}

#[test]
fn duplicate_name_is_rejected_and_count_stays() {
    let mut table = auto_named();
    table.add_row([("NAME", Value::from("a"))]).unwrap();
    let err = table.add_row([("NAME", Value::from("a"))]).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateKey { .. }));
    assert_eq!(table.row_count(), 1);
}

#[test]
fn added_row_synchronizes_then_tracks_updates() {
    let mut table = keyed();
    let mut store = RecordingStore::default();
    let sync = Synchronizer::new(&PlainBuilder, SyncConfig::default());

    let row = table.add_row([("ID", Value::from(1)), ("NAME", Value::from("x"))]).unwrap();
    assert_eq!(table.row(row).unwrap().state(), RowState::Added);

    let report = sync.synchronize(&mut table, &mut store).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(table.row(row).unwrap().state(), RowState::Unchanged);

    table.set_value(row, "NAME", Value::from("y")).unwrap();
    assert_eq!(table.row(row).unwrap().state(), RowState::Updated);

    sync.synchronize(&mut table, &mut store).unwrap();
    assert_eq!(store.committed, vec!["INSERT people | ", "UPDATE people | ID=1"]);
}

#[test]
fn deferred_delete_issues_one_delete() {
    let mut table = keyed();
    table.add_row([("ID", Value::from(1)), ("NAME", Value::from("x"))]).unwrap();
    table.add_row([("ID", Value::from(2)), ("NAME", Value::from("z"))]).unwrap();
    table.accept_changes();

    table.remove_rows(&KeyValues::new().with("ID", 1)).unwrap();
    assert_eq!(table.pending_deletions().len(), 1);

    let mut store = RecordingStore::default();
    let sync = Synchronizer::new(&PlainBuilder, SyncConfig::default());
    let report = sync.synchronize(&mut table, &mut store).unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(store.committed, vec!["DELETE people | ID=1"]);
    assert!(table.pending_deletions().is_empty());
}

#[test]
fn generated_keys_are_merged_in_insert_order() {
    let mut table = auto_named();
    table.add_row([("NAME", Value::from("a"))]).unwrap();
    table.add_row([("NAME", Value::from("b"))]).unwrap();

    let mut store = RecordingStore::default();
    let sync = Synchronizer::new(&PlainBuilder, SyncConfig::default());
    sync.synchronize(&mut table, &mut store).unwrap();

    assert_eq!(table.get_value(0, "ID").unwrap(), &Value::BigInt(1));
    assert_eq!(table.get_value(1, "ID").unwrap(), &Value::BigInt(2));
    assert_eq!(table.row_by_key(&KeyValues::new().with("ID", 2)).unwrap(), Some(1));
}

#[test]
fn failed_sync_leaves_everything_pending() {
    let mut table = keyed();
    table.add_row([("ID", Value::from(1)), ("NAME", Value::from("x"))]).unwrap();
    table.accept_changes();
    table.remove_row(0).unwrap();
    table.add_row([("ID", Value::from(2)), ("NAME", Value::from("y"))]).unwrap();

    let mut store = RecordingStore { fail_on: Some("INSERT"), ..RecordingStore::default() };
    let sync = Synchronizer::new(&PlainBuilder, SyncConfig::default());
    assert!(sync.synchronize(&mut table, &mut store).is_err());
    assert!(store.committed.is_empty());
    assert_eq!(table.pending_deletions().len(), 1);
    assert_eq!(table.row(0).unwrap().state(), RowState::Added);

    store.fail_on = None;
    sync.synchronize(&mut table, &mut store).unwrap();
    assert_eq!(store.committed, vec!["DELETE people | ID=1", "INSERT people | "]);
}

#[test]
fn fill_modes_order_rows() {
    let source = || {
        ResultSet::new(["ID", "NAME"])
            .with_record(vec![Value::from(10), "p".into()])
            .with_record(vec![Value::from(11), "q".into()])
            .with_record(vec![Value::from(12), "r".into()])
    };
    let seeded = || {
        let mut table = keyed();
        table.add_row([("ID", Value::from(1)), ("NAME", Value::from("a"))]).unwrap();
        table.add_row([("ID", Value::from(2)), ("NAME", Value::from("b"))]).unwrap();
        table
    };

    let mut table = seeded();
    table.fill(source(), FillMode::Overwrite).unwrap();
    assert_eq!(names(&table), vec!["p", "q", "r"]);

    let mut table = seeded();
    table.fill(source(), FillMode::Append).unwrap();
    assert_eq!(names(&table), vec!["a", "b", "p", "q", "r"]);

    let mut table = seeded();
    table.fill(source(), FillMode::Prepend).unwrap();
    assert_eq!(names(&table), vec!["p", "q", "r", "a", "b"]);
    assert_eq!(table.row(3).unwrap().position(), Some(3));
    assert_eq!(table.row_by_key(&KeyValues::new().with("ID", 2)).unwrap(), Some(4));
}

#[test]
fn removing_a_column_keeps_remaining_indices_consistent() {
    let mut table = Table::builder("grid")
        .column(Column::new("ID", ColumnType::Integer).not_null())
        .column(Column::new("SCRATCH", ColumnType::Text))
        .column(Column::new("CODE", ColumnType::VarChar(8)))
        .primary_key(["ID"])
        .index_def(IndexDef::new("UQ_GRID_CODE", ["CODE"], IndexKind::Unique))
        .build()
        .unwrap();
    for i in 0..5 {
        table
            .add_row([("ID", Value::from(i)), ("SCRATCH", Value::from("s")), ("CODE", Value::from(format!("c{}", i)))])
            .unwrap();
    }

    table.remove_column("SCRATCH").unwrap();
    for i in 5..8 {
        table.add_row([("ID", Value::from(i)), ("CODE", Value::from(format!("c{}", i)))]).unwrap();
    }

    assert!(table.add_row([("ID", Value::from(99)), ("CODE", Value::from("c3"))]).is_err());
    assert!(table.add_row([("ID", Value::from(6)), ("CODE", Value::from("new"))]).is_err());
    assert_eq!(table.row_by_key(&KeyValues::new().with("ID", 7)).unwrap(), Some(7));
    assert_eq!(table.get_value(7, "CODE").unwrap(), &Value::Text("c7".into()));
}

#[test]
fn multiple_null_keys_are_allowed() {
    let mut table = Table::builder("contacts")
        .column(Column::new("ID", ColumnType::Integer).not_null())
        .column(Column::new("EMAIL", ColumnType::Text))
        .primary_key(["ID"])
        .unique("UQ_CONTACTS_EMAIL", ["EMAIL"])
        .build()
        .unwrap();
    table.add_row([("ID", Value::from(1))]).unwrap();
    table.add_row([("ID", Value::from(2))]).unwrap();
    assert_eq!(table.row_count(), 2);
}

#[test]
fn listeners_see_every_change_but_no_noops() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut table = keyed();
    table.add_listener(Arc::new(move |_: &str, e: &TableEvent| sink.lock().unwrap().push(e.clone())));

    table.add_row([("ID", Value::from(1)), ("NAME", Value::from("x"))]).unwrap();
    table.set_value(0, "NAME", Value::from("x")).unwrap();
    table.set_value(0, "NAME", Value::from("y")).unwrap();
    table.remove_row(0).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            TableEvent::RowInserted { row: 0 },
            TableEvent::RowUpdated { row: 0, column: Some(1) },
            TableEvent::RowDeleted { row: 0 },
        ]
    );
}

proptest! {
    #[test]
    fn inserted_values_read_back_equal(id in any::<i32>(), name in "[a-zA-Z ]{0,30}", score in -1.0e6f64..1.0e6) {
        let mut table = Table::builder("samples")
            .column(Column::new("ID", ColumnType::Integer).not_null())
            .column(Column::new("NAME", ColumnType::VarChar(30)))
            .column(Column::new("SCORE", ColumnType::Float))
            .primary_key(["ID"])
            .build()
            .unwrap();
        let supplied = vec![Value::BigInt(id as i64), Value::Text(name), Value::Float(score)];
        let row = table.add_row_values(supplied.clone()).unwrap();
        for (column, value) in supplied.iter().enumerate() {
            prop_assert!(table.get_value_at(row, column).unwrap().semantic_eq(value));
        }
    }

    #[test]
    fn fresh_rows_are_never_updated(values in proptest::collection::vec(any::<i16>(), 1..20)) {
        let mut table = keyed();
        for (i, v) in values.iter().enumerate() {
            table.add_row([("ID", Value::from(i as i32)), ("NAME", Value::from(v.to_string()))]).unwrap();
            table.set_value(i, "NAME", Value::from(format!("{}!", v))).unwrap();
        }
        prop_assert!(table.rows().iter().all(|r| r.state() == RowState::Added));
    }
}
