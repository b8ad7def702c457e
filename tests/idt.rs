#[macro_use]
mod testutil;

use msidb::{CodePage, Column, CreateTable, Database, ErrorKind, Insert,
            OpenMode, Select, StreamHandle, Value};
use std::fs;

// ========================================================================= //

const PROPERTY_IDT: &str = "Property\tValue\r\n\
                            s72\tl0\r\n\
                            _Property\tProperty\r\n\
                            ProductCode\t{GUID}\r\n";

fn export_to_string(db: &mut Database, table: &str) -> String {
    let mut output = Vec::new();
    db.export(table, &mut output).unwrap();
    String::from_utf8(output).unwrap()
}

// ========================================================================= //

#[test]
fn import_creates_table() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("_Property.idt");
    fs::write(&idt, PROPERTY_IDT).unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.import(&idt).unwrap();

    assert_eq!(db.table_names(), vec!["_Property".to_string()]);
    let columns = db.columns("_Property").unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name(), "Property");
    assert_eq!(columns[0].type_code(), "s72");
    assert!(columns[0].is_primary_key());
    assert!(!columns[0].is_nullable());
    assert_eq!(columns[1].name(), "Value");
    assert_eq!(columns[1].type_code(), "l0");
    assert!(columns[1].is_localizable());
    assert!(!columns[1].is_primary_key());

    let rows = db.select_rows(Select::table("_Property")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_string(1), "ProductCode");
    assert_eq!(rows[0].get_string(2), "{GUID}");
}

#[test]
fn export_reproduces_import() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("_Property.idt");
    fs::write(&idt, PROPERTY_IDT).unwrap();
    let path = dir.path().join("test.msi");
    let mut db = Database::create(&path).unwrap();
    db.import(&idt).unwrap();
    assert_eq!(export_to_string(&mut db, "_Property"), PROPERTY_IDT);
    db.commit().unwrap();
    drop(db);

    let mut db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(export_to_string(&mut db, "_Property"), PROPERTY_IDT);
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let exported = db.export_to_folder("_Property", &out).unwrap();
    assert_eq!(exported, out.join("_Property.idt"));
    assert_eq!(fs::read_to_string(exported).unwrap(), PROPERTY_IDT);
}

#[test]
fn import_replaces_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Property.idt");
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    fs::write(&idt,
              "Property\tValue\r\ns72\tl0\r\nProperty\tProperty\r\n\
               A\t1\r\nB\t2\r\n")
        .unwrap();
    db.import(&idt).unwrap();
    fs::write(&idt,
              "Property\tValue\r\ns72\tl0\r\nProperty\tProperty\r\nC\t3\r\n")
        .unwrap();
    db.import(&idt).unwrap();
    let rows = db.select_rows(Select::table("Property")).unwrap();
    let names: Vec<String> = rows.iter().map(|row| row.get_string(1)).collect();
    assert_eq!(names, vec!["C".to_string()]);
}

#[test]
fn integers_and_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Media.idt");
    fs::write(&idt,
              "DiskId\tLastSequence\tCabinet\r\n\
               i2\ti4\tS255\r\n\
               Media\tDiskId\r\n\
               1\t70000\tdata.cab\r\n\
               2\t-5\t\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.import(&idt).unwrap();
    let rows = db
        .select_rows(Select::table("Media").order_by(&["DiskId"]))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_int(2), 70000);
    assert_eq!(rows[0].get_string(3), "data.cab");
    assert_eq!(rows[1].get_int(2), -5);
    assert!(rows[1].is_null(3));
    assert_eq!(export_to_string(&mut db, "Media"),
               "DiskId\tLastSequence\tCabinet\r\n\
                i2\ti4\tS255\r\n\
                Media\tDiskId\r\n\
                1\t70000\tdata.cab\r\n\
                2\t-5\t\r\n");
}

#[test]
fn control_characters_become_line_breaks() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Text.idt");
    fs::write(&idt,
              b"Key\tText\r\ns72\tL0\r\nText\tKey\r\n\
                A\tone\x11\x19two\r\nB\tthree\0four\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.import(&idt).unwrap();
    let rows = db.select_rows(Select::table("Text").order_by(&["Key"])).unwrap();
    assert_eq!(rows[0].get_string(2), "one\r\ntwo");
    assert_eq!(rows[1].get_string(2), "three\nfour");
}

#[test]
fn binary_cells_use_sidecar_files() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Binary.idt");
    fs::write(&idt,
              "Name\tData\r\ns72\tv0\r\nBinary\tName\r\nIcon\ticon.bin\r\n")
        .unwrap();
    fs::create_dir(dir.path().join("Binary")).unwrap();
    fs::write(dir.path().join("Binary").join("icon.bin"), b"\x00\x01\x02")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.import(&idt).unwrap();

    let rows = db.select_rows(Select::table("Binary")).unwrap();
    assert_eq!(rows.len(), 1);
    match rows[0].value(2) {
        Some(Value::Stream(stream)) => assert_eq!(stream.data(), b"\x00\x01\x02"),
        other => panic!("expected a stream, got {:?}", other),
    }

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let exported = db.export_to_folder("Binary", &out).unwrap();
    assert_eq!(fs::read_to_string(exported).unwrap(),
               "Name\tData\r\ns72\tv0\r\nBinary\tName\r\nIcon\tIcon\r\n");
    assert_eq!(fs::read(out.join("Binary").join("Icon")).unwrap(),
               b"\x00\x01\x02");
}

#[test]
fn missing_sidecar_file() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Binary.idt");
    fs::write(&idt,
              "Name\tData\r\ns72\tv0\r\nBinary\tName\r\nIcon\tnope.bin\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    let error = db.import(&idt).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::FunctionFailed);
}

#[test]
fn force_codepage() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("_ForceCodepage.idt");
    fs::write(&idt, "\r\n\r\n1252\t_ForceCodepage\r\n").unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_eq!(db.codepage(), CodePage::Utf8);
    db.import(&idt).unwrap();
    assert_eq!(db.codepage(), CodePage::Windows1252);
    assert_eq!(export_to_string(&mut db, "_ForceCodepage"),
               "\r\n\r\n1252\t_ForceCodepage\r\n");
}

#[test]
fn summary_information() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("_SummaryInformation.idt");
    fs::write(&idt,
              "PropertyId\tValue\r\n\
               i2\tl255\r\n\
               _SummaryInformation\tPropertyId\r\n\
               2\tInstallation Database\r\n\
               12\t2009/04/12 10:00:00\r\n\
               14\t200\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.import(&idt).unwrap();
    assert!(db.table_names().is_empty());
    let summary_info = db.summary_info().unwrap();
    assert_eq!(summary_info.title(), Some("Installation Database"));
    assert_eq!(summary_info.page_count(), Some(200));
    assert!(summary_info.creation_time().is_some());

    let exported = export_to_string(&mut db, "_SummaryInformation");
    assert!(exported.starts_with("PropertyId\tValue\r\n\
                                  i2\tl255\r\n\
                                  _SummaryInformation\tPropertyId\r\n"));
    assert!(exported.contains("2\tInstallation Database\r\n"));
    assert!(exported.contains("12\t2009/04/12 10:00:00\r\n"));
    assert!(exported.contains("14\t200\r\n"));
}

#[test]
fn wrong_field_count() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Property.idt");
    fs::write(&idt,
              "Property\tValue\r\ns72\tl0\r\nProperty\tProperty\r\nA\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_error!(db.import(&idt),
                  ErrorKind::FunctionFailed,
                  format!("Row 1 of {:?} has 1 fields, expected 2", idt));
    assert!(!db.has_table("Property"));
}

#[test]
fn mismatched_header() {
    let dir = tempfile::tempdir().unwrap();
    let idt = dir.path().join("Property.idt");
    fs::write(&idt, "Property\tValue\r\ns72\r\nProperty\tProperty\r\n")
        .unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_error!(db.import(&idt),
                  ErrorKind::FunctionFailed,
                  format!("{:?} names 2 columns but gives 1 types", idt));
}

#[test]
fn export_missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    assert_error!(db.export("Nope", Vec::new()),
                  ErrorKind::InvalidTable,
                  "No table named \"Nope\"");
}

#[test]
fn export_as_sql() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::create(dir.path().join("test.msi")).unwrap();
    db.execute(
        CreateTable::new("Media")
            .column(Column::build("DiskId").primary_key().int16())
            .column(Column::build("Cabinet").nullable().string(255))
            .column(Column::build("Data").nullable().binary()),
    )
    .unwrap();
    db.execute(Insert::into("Media").rows(vec![
        vec![Value::Int(1),
             Value::from("it's.cab"),
             Value::from(StreamHandle::from_bytes(vec![1]))],
        vec![Value::Int(2), Value::Null, Value::Null],
    ]))
    .unwrap();
    let mut output = Vec::new();
    db.export_sql("Media", &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(),
               "CREATE TABLE `Media` ( `DiskId` INT NOT NULL, \
                `Cabinet` CHAR(255), `Data` OBJECT PRIMARY KEY `DiskId`)\n\
                INSERT INTO `Media` (`DiskId`, `Cabinet`, `Data`) \
                VALUES (1, 'it\\'s.cab', '')\n\
                INSERT INTO `Media` (`DiskId`) VALUES (2)\n");

    let mut output = Vec::new();
    db.export_sql("_Tables", &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(),
               "INSERT INTO `_Tables` (`Name`) VALUES ('Media')\n");
    assert_error!(db.export_sql("Nope", Vec::new()),
                  ErrorKind::InvalidTable,
                  "No table named \"Nope\"");
}

// ========================================================================= //
