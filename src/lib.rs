//! A library for reading, querying, and writing [Windows
//! Installer](https://en.wikipedia.org/wiki/Windows_Installer) (MSI)
//! databases.
//!
//! An MSI file is a relational database stored within a [Compound File
//! Binary](https://en.wikipedia.org/wiki/Compound_File_Binary_Format) file.
//! A [`Database`] loads its string table and table catalogs when opened,
//! loads table rows on first access, and keeps every change in memory until
//! [`Database::commit`] writes a new file and swaps it into place.
//!
//! Queries are built from typed statements rather than SQL text:
//!
//! ```no_run
//! use msidb::{Database, Expr, OpenMode, Select};
//!
//! let mut db = Database::open("example.msi", OpenMode::ReadOnly)?;
//! let rows = db.select_rows(
//!     Select::table("Property")
//!         .columns(&["Value"])
//!         .with(Expr::col("Property").eq(Expr::string("ProductName"))),
//! )?;
//! for row in rows {
//!     println!("{}", row.get_string(1));
//! }
//! # Ok::<(), msidb::Error>(())
//! ```

#![warn(missing_docs)]

mod internal;

pub use internal::codepage::CodePage;
pub use internal::column::{Column, ColumnBuilder, ColumnType};
pub use internal::database::{Database, OpenMode};
pub use internal::error::{Error, ErrorKind, Result};
pub use internal::expr::Expr;
pub use internal::propset::PropertyValue;
pub use internal::query::{
    Alter, ColumnInfoKind, CreateTable, Delete, Insert, Query, Select,
    Statement, Update,
};
pub use internal::record::{Record, NULL_INT};
pub use internal::storage::StreamHandle;
pub use internal::summary::{
    PropertyType, SummaryInfo, PROPERTY_AUTHOR, PROPERTY_CHARACTER_COUNT,
    PROPERTY_CODEPAGE, PROPERTY_COMMENTS, PROPERTY_CREATING_APP,
    PROPERTY_CREATION_TIME, PROPERTY_KEYWORDS, PROPERTY_LAST_AUTHOR,
    PROPERTY_LAST_PRINTED, PROPERTY_LAST_SAVE_TIME, PROPERTY_PAGE_COUNT,
    PROPERTY_SECURITY, PROPERTY_SUBJECT, PROPERTY_TEMPLATE, PROPERTY_TITLE,
    PROPERTY_UUID, PROPERTY_WORD_COUNT,
};
pub use internal::table::{
    COLUMNS_TABLE, STORAGES_TABLE, STREAMS_TABLE, TABLES_TABLE,
};
pub use internal::value::Value;
pub use internal::view::ColumnInfo;
use std::path::Path;

// ========================================================================= //

/// Opens an existing MSI database at the given path in read-only mode.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Database> {
    Database::open(path, OpenMode::ReadOnly)
}

// ========================================================================= //
