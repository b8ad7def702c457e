#[macro_use]
mod testutil;

use msidb::{Column, CreateTable, Database, ErrorKind, Insert, Select, Value};
use tempfile::TempDir;

// ========================================================================= //

fn new_database(dir: &TempDir, name: &str) -> Database {
    Database::create(dir.path().join(name)).unwrap()
}

fn create_table(db: &mut Database, name: &str, value_column: &str) {
    db.execute(
        CreateTable::new(name)
            .column(Column::build("Key").primary_key().int16())
            .column(Column::build(value_column).nullable().string(0)),
    )
    .unwrap();
}

fn insert_row(db: &mut Database, table: &str, key: i32, val: &str) {
    db.execute(
        Insert::into(table).row(vec![Value::Int(key), Value::from(val)]),
    )
    .unwrap();
}

fn values(db: &mut Database, table: &str) -> Vec<(i32, String)> {
    db.select_rows(Select::table(table).order_by(&["Key"]))
        .unwrap()
        .iter()
        .map(|row| (row.get_int(1), row.get_string(2)))
        .collect()
}

// ========================================================================= //

#[test]
fn merge_adds_new_rows_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = new_database(&dir, "target.msi");
    create_table(&mut target, "T", "Val");
    insert_row(&mut target, "T", 1, "x");

    let mut source = new_database(&dir, "source.msi");
    create_table(&mut source, "T", "Val");
    insert_row(&mut source, "T", 1, "x");
    insert_row(&mut source, "T", 2, "y");
    create_table(&mut source, "U", "Val");
    insert_row(&mut source, "U", 5, "z");

    target.merge(&mut source, Some("MergeErrors")).unwrap();
    assert_eq!(values(&mut target, "T"),
               vec![(1, "x".to_string()), (2, "y".to_string())]);
    assert_eq!(values(&mut target, "U"), vec![(5, "z".to_string())]);
    assert!(!target.has_table("MergeErrors"));

    // Merging the same source again changes nothing.
    target.merge(&mut source, Some("MergeErrors")).unwrap();
    assert_eq!(values(&mut target, "T").len(), 2);
    assert_eq!(values(&mut target, "U").len(), 1);
}

#[test]
fn merge_conflict_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = new_database(&dir, "target.msi");
    create_table(&mut target, "T", "Val");
    insert_row(&mut target, "T", 1, "x");

    let mut source = new_database(&dir, "source.msi");
    create_table(&mut source, "T", "Val");
    insert_row(&mut source, "T", 1, "y");
    insert_row(&mut source, "T", 2, "w");
    create_table(&mut source, "U", "Val");
    insert_row(&mut source, "U", 5, "z");

    assert_error!(target.merge(&mut source, Some("MergeErrors")),
                  ErrorKind::FunctionFailed,
                  "Merge conflicts in 1 table(s)");
    // The conflicting table is untouched, even its non-conflicting rows.
    assert_eq!(values(&mut target, "T"), vec![(1, "x".to_string())]);
    // Other tables are still merged.
    assert_eq!(values(&mut target, "U"), vec![(5, "z".to_string())]);

    let errors = target.select_rows(Select::table("MergeErrors")).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].get_string(1), "T");
    assert_eq!(errors[0].get_int(2), 1);
    let columns = target.columns("MergeErrors").unwrap();
    assert_eq!(columns[0].name(), "Table");
    assert_eq!(columns[1].name(), "NumRowMergeConflicts");
}

#[test]
fn merge_conflict_without_error_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = new_database(&dir, "target.msi");
    create_table(&mut target, "T", "Val");
    insert_row(&mut target, "T", 1, "x");
    let mut source = new_database(&dir, "source.msi");
    create_table(&mut source, "T", "Val");
    insert_row(&mut source, "T", 1, "y");

    assert_error!(target.merge(&mut source, None),
                  ErrorKind::FunctionFailed,
                  "Merge conflicts in 1 table(s)");
    assert_eq!(target.table_names(), vec!["T".to_string()]);
}

#[test]
fn merge_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = new_database(&dir, "target.msi");
    create_table(&mut target, "T", "Val");
    let mut source = new_database(&dir, "source.msi");
    create_table(&mut source, "A", "Val");
    insert_row(&mut source, "A", 1, "a");
    create_table(&mut source, "T", "Other");
    insert_row(&mut source, "T", 1, "y");

    assert_error!(target.merge(&mut source, Some("MergeErrors")),
                  ErrorKind::DatatypeMismatch,
                  "Column \"Other\" of table \"T\" does not match \"Val\"");
    // Nothing is applied when any table fails verification.
    assert!(!target.has_table("A"));
    assert!(values(&mut target, "T").is_empty());
}

#[test]
fn merge_key_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = new_database(&dir, "target.msi");
    target
        .execute(
            CreateTable::new("T")
                .column(Column::build("Key").primary_key().int16())
                .column(Column::build("Val").primary_key().string(0)),
        )
        .unwrap();
    let mut source = new_database(&dir, "source.msi");
    create_table(&mut source, "T", "Val");

    let error = target.merge(&mut source, None).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DatatypeMismatch);
}

#[test]
fn merge_empty_error_table_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = new_database(&dir, "target.msi");
    let mut source = new_database(&dir, "source.msi");
    assert_error!(target.merge(&mut source, Some("")),
                  ErrorKind::InvalidTable,
                  "Merge error table name must not be empty");
}

// ========================================================================= //
