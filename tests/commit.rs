#[macro_use]
mod testutil;

use msidb::{Column, CreateTable, Database, ErrorKind, Insert, OpenMode, Select,
            Value};
use std::fs;
use std::path::Path;

// ========================================================================= //

fn create_table(db: &mut Database, name: &str) {
    db.execute(
        CreateTable::new(name)
            .column(Column::build("Key").primary_key().int16())
            .column(Column::build("Val").nullable().string(0)),
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

fn create_committed(path: &Path) {
    let mut db = Database::create(path).unwrap();
    create_table(&mut db, "Data");
    insert_row(&mut db, "Data", 1, "one");
    db.commit().unwrap();
}

// ========================================================================= //

#[test]
fn created_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    let mut db = Database::create(&path).unwrap();
    create_table(&mut db, "Data");
    db.execute(CreateTable::new("Scratch")
                   .column(Column::build("Key").primary_key().int16())
                   .temporary())
        .unwrap();
    insert_row(&mut db, "Data", 2, "two");
    insert_row(&mut db, "Data", 1, "one");
    assert!(!db.is_table_persistent("Scratch").unwrap());
    db.commit().unwrap();
    assert_eq!(db.mode(), OpenMode::Transact);
    drop(db);

    let mut db = msidb::open(&path).unwrap();
    assert!(db.is_read_only());
    assert_eq!(db.table_names(), vec!["Data".to_string()]);
    assert!(db.is_table_persistent("Data").unwrap());
    assert_eq!(values(&mut db, "Data"),
               vec![(1, "one".to_string()), (2, "two".to_string())]);
    let keys = db.get_primary_keys("Data").unwrap();
    assert_eq!(keys.get_string(0), "Data");
    assert_eq!(keys.get_string(1), "Key");
}

#[test]
fn uncommitted_changes_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    create_committed(&path);

    let mut db = Database::open(&path, OpenMode::Transact).unwrap();
    insert_row(&mut db, "Data", 2, "two");
    drop(db);

    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(values(&mut db, "Data"), vec![(1, "one".to_string())]);
}

#[test]
fn transact_commit_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    create_committed(&path);

    let mut db = Database::open(&path, OpenMode::Transact).unwrap();
    insert_row(&mut db, "Data", 2, "two");
    db.commit().unwrap();
    assert!(!dir.path().join("test.msi.tmp").exists());
    insert_row(&mut db, "Data", 3, "three");
    db.commit().unwrap();
    drop(db);

    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(values(&mut db, "Data"),
               vec![
                   (1, "one".to_string()),
                   (2, "two".to_string()),
                   (3, "three".to_string()),
               ]);
}

#[test]
fn failed_commit_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    create_committed(&path);
    let original = fs::read(&path).unwrap();

    let mut db = Database::open(&path, OpenMode::Transact).unwrap();
    insert_row(&mut db, "Data", 2, "two");
    // A directory in the way of the temporary file makes the commit fail.
    let blocker = dir.path().join("test.msi.tmp");
    fs::create_dir(&blocker).unwrap();
    assert!(db.commit().is_err());
    assert_eq!(fs::read(&path).unwrap(), original);

    // The handle is still usable, and a later commit succeeds.
    assert_eq!(values(&mut db, "Data").len(), 2);
    fs::remove_dir(&blocker).unwrap();
    db.commit().unwrap();
    drop(db);
    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(values(&mut db, "Data"),
               vec![(1, "one".to_string()), (2, "two".to_string())]);
}

#[test]
fn read_only_commit_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    create_committed(&path);
    let original = fs::read(&path).unwrap();
    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert_error!(
        db.execute(Insert::into("Data").row(vec![
            Value::Int(2),
            Value::from("two"),
        ])),
        ErrorKind::AccessDenied,
        "Cannot modify table \"Data\" of a read-only database"
    );
    db.commit().unwrap();
    assert_eq!(fs::read(&path).unwrap(), original);
}

#[test]
fn media_counters() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_eq!(db.media_transform_offset(), 10000);
    assert_eq!(db.media_transform_disk_id(), 30000);
    db.set_media_transform_offset(10010);
    db.set_media_transform_disk_id(30002);
    db.commit().unwrap();
    assert_eq!(db.media_transform_offset(), 10010);
    assert_eq!(db.media_transform_disk_id(), 30002);
}

#[test]
fn open_rejects_non_databases() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.msi");
    assert!(Database::open(&missing, OpenMode::ReadOnly).is_err());

    let text = dir.path().join("text.msi");
    fs::write(&text, b"not a compound file").unwrap();
    let error = Database::open(&text, OpenMode::ReadOnly).err().unwrap();
    assert_eq!(error.kind(), ErrorKind::OpenFailed);

    let plain = dir.path().join("plain.cfb");
    cfb::create(&plain).unwrap().flush().unwrap();
    assert_error!(
        Database::open(&plain, OpenMode::ReadOnly),
        ErrorKind::OpenFailed,
        format!("{:?} is not an installer database (class ID \
                 00000000-0000-0000-0000-000000000000)",
                plain)
    );
}

#[test]
fn open_patch_requires_patch_class() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    create_committed(&path);
    let error = Database::open_patch(&path, OpenMode::ReadOnly).err().unwrap();
    assert_eq!(error.kind(), ErrorKind::OpenFailed);
    assert!(!msidb::open(&path).unwrap().is_patch());
}

// ========================================================================= //
