#[macro_use]
mod testutil;

use msidb::{Alter, Column, ColumnInfoKind, CreateTable, Database, Delete,
            ErrorKind, Expr, Insert, OpenMode, Record, Select, Update, Value};
use std::fs;

// ========================================================================= //

fn create_people(db: &mut Database) {
    db.execute(
        CreateTable::new("People")
            .column(Column::build("Id").primary_key().int16())
            .column(Column::build("Name").string(32))
            .column(Column::build("Age").nullable().int32()),
    )
    .unwrap();
    db.execute(Insert::into("People").rows(vec![
        vec![Value::Int(1), Value::from("Alice"), Value::Int(30)],
        vec![Value::Int(2), Value::from("Bob"), Value::Null],
        vec![Value::Int(3), Value::from("Carol"), Value::Int(45)],
    ]))
    .unwrap();
}

fn names(db: &mut Database) -> Vec<String> {
    db.select_rows(Select::table("People").order_by(&["Id"]))
        .unwrap()
        .iter()
        .map(|row| row.get_string(2))
        .collect()
}

// ========================================================================= //

#[test]
fn fetch_before_execute() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    let mut query = db.open_query(Select::table("People")).unwrap();
    assert_error!(query.fetch(&mut db),
                  ErrorKind::InvalidHandle,
                  "Query must be executed before fetching rows");
}

#[test]
fn fetch_rows_until_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    let select = Select::table("People")
        .columns(&["Name", "Age"])
        .with(Expr::col("Age").gt(Expr::integer(35)));
    let mut query = db.open_query(select).unwrap();
    query.execute(&mut db, None).unwrap();
    let row = query.fetch(&mut db).unwrap().unwrap();
    assert_eq!(row.field_count(), 2);
    assert_eq!(row.get_string(1), "Carol");
    assert_eq!(row.get_int(2), 45);
    assert!(query.fetch(&mut db).unwrap().is_none());
    assert!(query.fetch(&mut db).unwrap().is_none());

    // Executing again rewinds to the first row.
    query.execute(&mut db, None).unwrap();
    assert!(query.fetch(&mut db).unwrap().is_some());
    query.close(&mut db).unwrap();
    query.delete(&mut db);
}

#[test]
fn column_info() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    let query = db.open_query(Select::table("People")).unwrap();
    let names = query.get_column_info(&mut db, ColumnInfoKind::Names).unwrap();
    assert_eq!(names.field_count(), 3);
    assert_eq!(names.get_string(1), "Id");
    assert_eq!(names.get_string(2), "Name");
    assert_eq!(names.get_string(3), "Age");
    let types = query.get_column_info(&mut db, ColumnInfoKind::Types).unwrap();
    assert_eq!(types.get_string(1), "i2");
    assert_eq!(types.get_string(2), "s32");
    assert_eq!(types.get_string(3), "I4");
}

#[test]
fn iterate_counts_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    let mut query = db.open_query(Select::table("People")).unwrap();
    let mut ages = Vec::new();
    let count = query
        .iterate(&mut db, None, |row| {
            if !row.is_null(3) {
                ages.push(row.get_int(3));
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 3);
    ages.sort();
    assert_eq!(ages, vec![30, 45]);
}

#[test]
fn update_matching_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    db.execute(
        Update::table("People")
            .set("Name", "Robert")
            .with(Expr::col("Id").eq(Expr::integer(2))),
    )
    .unwrap();
    assert_eq!(names(&mut db), vec!["Alice", "Robert", "Carol"]);
}

#[test]
fn delete_matching_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    db.execute(
        Delete::from("People").with(Expr::col("Name").eq(Expr::string("Alice"))),
    )
    .unwrap();
    assert_eq!(names(&mut db), vec!["Bob", "Carol"]);
    db.execute(Delete::from("People")).unwrap();
    assert!(names(&mut db).is_empty());
}

#[test]
fn insert_with_params() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    let mut query = db
        .open_query(Insert::into("People").columns(&["Id", "Name"]))
        .unwrap();
    let mut params = Record::new(2);
    params.set_int(1, 4).unwrap();
    params.set_string(2, "Dave").unwrap();
    query.execute(&mut db, Some(&params)).unwrap();
    query.close(&mut db).unwrap();
    assert_eq!(names(&mut db), vec!["Alice", "Bob", "Carol", "Dave"]);
}

#[test]
fn missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_error!(db.open_query(Select::table("Nope")),
                  ErrorKind::BadQuerySyntax,
                  "Table \"Nope\" does not exist");
    assert_error!(db.get_primary_keys("Nope"),
                  ErrorKind::InvalidTable,
                  "No table named \"Nope\"");
}

#[test]
fn missing_column() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    assert_error!(db.open_query(Select::table("People").columns(&["Email"])),
                  ErrorKind::BadQuerySyntax,
                  "Table \"People\" has no column named \"Email\"");
}

#[test]
fn duplicate_primary_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    assert_error!(db.execute(Insert::into("People").row(vec![
                      Value::Int(1),
                      Value::from("Again"),
                      Value::Null,
                  ])),
                  ErrorKind::FunctionFailed,
                  "Table \"People\" already has a row with that primary key");
    assert_eq!(names(&mut db).len(), 3);
}

#[test]
fn null_in_required_column() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    assert_error!(db.execute(Insert::into("People").row(vec![
                      Value::Int(9),
                      Value::Null,
                      Value::Int(1),
                  ])),
                  ErrorKind::FunctionFailed,
                  "Column \"Name\" of table \"People\" cannot be null");
}

#[test]
fn read_only_allows_temporary_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    let mut db = Database::create(&path).unwrap();
    create_people(&mut db);
    db.commit().unwrap();
    drop(db);

    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert_error!(db.execute(Insert::into("People").row(vec![
                      Value::Int(4),
                      Value::from("Dave"),
                      Value::Null,
                  ])),
                  ErrorKind::AccessDenied,
                  "Cannot modify table \"People\" of a read-only database");
    db.execute(
        Insert::into("People")
            .row(vec![Value::Int(4), Value::from("Dave"), Value::Null])
            .temporary(),
    )
    .unwrap();
    assert_eq!(names(&mut db), vec!["Alice", "Bob", "Carol", "Dave"]);
}

#[test]
fn int16_values_must_fit() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    assert_error!(db.execute(Insert::into("People").row(vec![
                      Value::Int(40000),
                      Value::from("Big"),
                      Value::Null,
                  ])),
                  ErrorKind::FunctionFailed,
                  "Value 40000 is out of range for 16-bit column \"Id\"");
    assert_error!(db.execute(Insert::into("People").row(vec![
                      Value::Int(-32768),
                      Value::from("Small"),
                      Value::Null,
                  ])),
                  ErrorKind::FunctionFailed,
                  "Value -32768 is out of range for 16-bit column \"Id\"");
    assert_error!(db.execute(Update::table("People")
                                 .set("Id", Value::Int(32768))
                                 .with(Expr::col("Id").eq(Expr::integer(1)))),
                  ErrorKind::FunctionFailed,
                  "Value 32768 is out of range for 16-bit column \"Id\"");
    db.execute(Insert::into("People").rows(vec![
        vec![Value::Int(32767), Value::from("Max"), Value::Int(70000)],
        vec![Value::Int(-32767), Value::from("Min"), Value::Null],
    ]))
    .unwrap();
    let rows = db
        .select_rows(Select::table("People").order_by(&["Id"]))
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].get_int(1), -32767);
    assert_eq!(rows[4].get_int(1), 32767);
    assert_eq!(rows[4].get_int(3), 70000);
}

#[test]
fn import_rejects_int16_values_that_do_not_fit() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Media.idt");
    fs::write(&idt,
              "DiskId\tLastSequence\r\n\
               i2\ti4\r\n\
               Media\tDiskId\r\n\
               1\t10\r\n\
               65537\t20\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_error!(db.import(&idt),
                  ErrorKind::FunctionFailed,
                  "Value 65537 is out of range for 16-bit column \"DiskId\"");
    let rows = db.select_rows(Select::table("Media")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_int(1), 1);
}

#[test]
fn alter_adds_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.msi");
    let mut db = Database::create(&path).unwrap();
    create_people(&mut db);
    db.execute(Alter::table("People")
                   .add_column(Column::build("Email").nullable().string(64)))
        .unwrap();
    db.execute(Update::table("People")
                   .set("Email", "alice@example.com")
                   .with(Expr::col("Id").eq(Expr::integer(1))))
        .unwrap();
    assert_error!(db.execute(Alter::table("People")
                                 .add_column(Column::build("Email")
                                                 .nullable()
                                                 .string(64))),
                  ErrorKind::BadQuerySyntax,
                  "Table \"People\" already has a column named \"Email\"");
    assert_error!(db.execute(Alter::table("Nobody").hold()),
                  ErrorKind::BadQuerySyntax,
                  "Table \"Nobody\" does not exist");
    db.commit().unwrap();
    drop(db);

    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    let columns = db.columns("People").unwrap();
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[3].name(), "Email");
    let rows = db
        .select_rows(Select::table("People").order_by(&["Id"]))
        .unwrap();
    assert_eq!(rows[0].get_string(4), "alice@example.com");
    assert!(rows[1].is_null(4));
}

#[test]
fn held_column_lasts_until_freed() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    create_people(&mut db);
    let add = Alter::table("People")
        .add_column(Column::build("Scratch").nullable().int16())
        .hold();
    assert_eq!(add.to_string(),
               "ALTER TABLE `People` ADD `Scratch` INT HOLD");
    db.execute(Alter::table("People")
                   .add_column(Column::build("Scratch").nullable().int16())
                   .hold())
        .unwrap();
    assert!(db.columns("People").unwrap()[3].is_temporary());
    db.execute(Alter::table("People").hold()).unwrap();
    db.execute(Alter::table("People").free()).unwrap();
    assert_eq!(db.columns("People").unwrap().len(), 4);
    db.execute(Alter::table("People").free()).unwrap();
    assert_eq!(db.columns("People").unwrap().len(), 3);
    assert_eq!(names(&mut db), vec!["Alice", "Bob", "Carol"]);
    assert_error!(db.execute(Alter::table("People").free()),
                  ErrorKind::FunctionFailed,
                  "Table \"People\" is not held");
}

#[test]
fn freeing_empty_temporary_table_drops_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.execute(
        CreateTable::new("Scratch")
            .column(Column::build("Key").primary_key().int16())
            .temporary(),
    )
    .unwrap();
    assert_error!(db.execute(Alter::table("Scratch")
                                 .add_column(Column::build("Extra").int16())
                                 .free()),
                  ErrorKind::BadQuerySyntax,
                  "Alter of \"Scratch\" needs exactly one action");
    db.execute(Alter::table("Scratch").hold()).unwrap();
    db.execute(Alter::table("Scratch").free()).unwrap();
    assert!(!db.has_table("Scratch"));
}

// ========================================================================= //
