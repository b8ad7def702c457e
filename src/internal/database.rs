use crate::internal::codepage::CodePage;
use crate::internal::column::{bias_int, unbias_int, Column};
use crate::internal::error::{Error, Result};
use crate::internal::query::{self, Query, Select, Statement};
use crate::internal::record::Record;
use crate::internal::storage::{Storage, StreamHandle};
use crate::internal::streamname;
use crate::internal::stringtable::{
    Persistence, StringTable, SHORT_STRING_REF_BYTES,
};
use crate::internal::summary::SummaryInfo;
use crate::internal::table::{
    Table, COLUMNS_TABLE, STORAGES_TABLE, STREAMS_TABLE, TABLES_TABLE,
};
use crate::internal::value::Value;
use crate::internal::view::{StoragesView, StreamsView, TableView, View};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ========================================================================= //

const DATABASE_CLSID: Uuid =
    Uuid::from_u128(0x000c1084_0000_0000_c000_000000000046);
const PATCH_CLSID: Uuid =
    Uuid::from_u128(0x000c1086_0000_0000_c000_000000000046);
const TRANSFORM_CLSID: Uuid =
    Uuid::from_u128(0x000c1082_0000_0000_c000_000000000046);

const INITIAL_MEDIA_TRANSFORM_OFFSET: i32 = 10000;
const INITIAL_MEDIA_TRANSFORM_DISK_ID: i32 = 30000;

// ========================================================================= //

/// How a database file is opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// The database cannot be modified.  Commit is a no-op.
    ReadOnly,
    /// Changes are written to a temporary file that replaces the original
    /// when the database is committed.
    Transact,
    /// Treated the same as `Transact`.
    Direct,
    /// A new, empty database is created at the path when first committed.
    Create,
}

// ========================================================================= //

/// An MSI database: a compound file holding a string table, a set of tables,
/// raw streams, and sub-storages.
///
/// Tables are loaded lazily.  Changes stay in memory until `commit()`.
pub struct Database {
    path: PathBuf,
    mode: OpenMode,
    class_id: Uuid,
    storage: Storage,
    strings: StringTable,
    bytes_per_strref: usize,
    tables: BTreeMap<String, Table>,
    unloaded: BTreeSet<String>,
    media_transform_offset: i32,
    media_transform_disk_id: i32,
}

fn open_compound_file(path: &Path) -> Result<cfb::CompoundFile<fs::File>> {
    let file = fs::File::open(path).map_err(|error| {
        Error::OpenFailed(format!("Cannot open {:?}: {}", path, error))
    })?;
    cfb::CompoundFile::open(file).map_err(|error| {
        Error::OpenFailed(format!("{:?} is not a compound file: {}",
                                  path,
                                  error))
    })
}

impl Database {
    /// Opens the database at the given path.  With `OpenMode::Create`, any
    /// existing file is ignored and replaced at commit.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Database> {
        Database::open_with(path.as_ref(), mode, false)
    }

    /// Starts a new, empty database that will be written to the given path.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Database> {
        Database::open_with(path.as_ref(), OpenMode::Create, false)
    }

    /// Opens a patch file, which must carry the patch class identifier.
    pub fn open_patch<P: AsRef<Path>>(path: P, mode: OpenMode)
                                      -> Result<Database> {
        Database::open_with(path.as_ref(), mode, true)
    }

    fn open_with(path: &Path, mode: OpenMode, is_patch: bool)
                 -> Result<Database> {
        tracing::debug!("opening {:?} ({:?}{})",
                        path,
                        mode,
                        if is_patch { ", patch" } else { "" });
        let mut tables = BTreeMap::new();
        tables.insert(TABLES_TABLE.to_string(), Table::tables_catalog());
        tables.insert(COLUMNS_TABLE.to_string(), Table::columns_catalog());
        let mut db = Database {
            path: path.to_path_buf(),
            mode,
            class_id: if is_patch { PATCH_CLSID } else { DATABASE_CLSID },
            storage: Storage::new(None, mode == OpenMode::ReadOnly),
            strings: StringTable::new(CodePage::default()),
            bytes_per_strref: SHORT_STRING_REF_BYTES,
            tables,
            unloaded: BTreeSet::new(),
            media_transform_offset: INITIAL_MEDIA_TRANSFORM_OFFSET,
            media_transform_disk_id: INITIAL_MEDIA_TRANSFORM_DISK_ID,
        };
        if mode == OpenMode::Create {
            return Ok(db);
        }
        let comp = open_compound_file(path)?;
        let class_id = *comp.root_entry().clsid();
        if is_patch && class_id != PATCH_CLSID {
            open_failed!("{:?} is not a patch (class ID {})", path, class_id);
        }
        if class_id != DATABASE_CLSID
            && class_id != PATCH_CLSID
            && class_id != TRANSFORM_CLSID
        {
            open_failed!("{:?} is not an installer database (class ID {})",
                         path,
                         class_id);
        }
        db.class_id = class_id;
        db.storage = Storage::new(Some(comp), mode == OpenMode::ReadOnly);
        db.load()?;
        Ok(db)
    }

    fn load(&mut self) -> Result<()> {
        let table_streams = self.storage.cache_structure()?;
        let pool = self.storage.read_table_stream(&streamname::encode(
            streamname::STRING_POOL,
            true,
        ))?;
        let data = self.storage.read_table_stream(&streamname::encode(
            streamname::STRING_DATA,
            true,
        ))?;
        let (strings, bytes_per_strref) = StringTable::load(
            pool.as_deref().unwrap_or_default(),
            data.as_deref().unwrap_or_default(),
        )?;
        tracing::debug!("loaded {} strings (codepage {}, {}-byte refs)",
                        strings.num_strings(),
                        strings.codepage().id(),
                        bytes_per_strref);
        self.strings = strings;
        self.bytes_per_strref = bytes_per_strref;
        self.load_catalogs()?;
        for name in table_streams {
            if !self.tables.contains_key(&name) {
                tracing::debug!("ignoring stream of unlisted table {:?}",
                                name);
            }
        }
        Ok(())
    }

    fn lookup_string(&self, id: u32) -> Result<String> {
        match self.strings.get(id) {
            Some(string) => Ok(string.to_string()),
            None => function_failed!("String ID {} is out of range", id),
        }
    }

    fn load_catalogs(&mut self) -> Result<()> {
        for name in [TABLES_TABLE, COLUMNS_TABLE] {
            let stream_name = streamname::encode(name, true);
            if let Some(data) = self.storage.read_table_stream(&stream_name)? {
                if let Some(table) = self.tables.get_mut(name) {
                    table.read_rows(&data, self.bytes_per_strref)?;
                }
            }
        }
        let mut schemas: BTreeMap<String, Vec<(i32, Column)>> =
            BTreeMap::new();
        if let Some(catalog) = self.tables.get(COLUMNS_TABLE) {
            for row in 0..catalog.num_rows() {
                let cells = match catalog.row(row) {
                    Some(cells) => cells,
                    None => continue,
                };
                let table_name = self.lookup_string(cells[0])?;
                let number = unbias_int(cells[1], 2);
                let column_name = self.lookup_string(cells[2])?;
                let type_bits = unbias_int(cells[3], 2);
                let column = match Column::from_bitfield(column_name.clone(),
                                                         type_bits,
                                                         false) {
                    Some(column) => column,
                    None => function_failed!(
                        "Column {:?} of table {:?} has invalid type bits \
                         (0x{:x})",
                        column_name,
                        table_name,
                        type_bits
                    ),
                };
                schemas.entry(table_name).or_default().push((number, column));
            }
        }
        let mut names = Vec::new();
        if let Some(catalog) = self.tables.get(TABLES_TABLE) {
            for row in 0..catalog.num_rows() {
                if let Some(cells) = catalog.row(row) {
                    names.push(self.lookup_string(cells[0])?);
                }
            }
        }
        for name in names {
            let mut columns = schemas.remove(&name).unwrap_or_default();
            if columns.is_empty() {
                tracing::warn!("table {:?} has no columns", name);
                continue;
            }
            columns.sort_by_key(|&(number, _)| number);
            let columns = columns.into_iter().map(|(_, column)| column);
            let table = Table::new(name.clone(), columns.collect(), true);
            self.tables.insert(name.clone(), table);
            self.unloaded.insert(name);
        }
        tracing::debug!("found {} tables", self.unloaded.len());
        Ok(())
    }

    // ===================================================================== //

    /// Returns the path the database was opened from (and commits to).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the mode the database was opened with.  A created database
    /// switches to `Transact` after its first commit.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns true if the database cannot be modified.
    pub fn is_read_only(&self) -> bool {
        self.mode == OpenMode::ReadOnly
    }

    /// Returns true if the file has the patch class identifier.
    pub fn is_patch(&self) -> bool {
        self.class_id == PATCH_CLSID
    }

    /// Returns the code page of the string table.
    pub fn codepage(&self) -> CodePage {
        self.strings.codepage()
    }

    /// Changes the code page of the string table.  Fails once the table
    /// holds any strings that would be saved.
    pub fn set_codepage(&mut self, codepage: CodePage) -> Result<()> {
        self.strings.set_codepage(codepage)
    }

    pub(crate) fn force_codepage(&mut self, id: i32) -> Result<()> {
        self.strings.force_codepage(id)
    }

    pub(crate) fn string_table(&self) -> &StringTable {
        &self.strings
    }

    pub(crate) fn string_table_mut(&mut self) -> &mut StringTable {
        &mut self.strings
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Returns the offset added to media table entries by transforms.
    pub fn media_transform_offset(&self) -> i32 {
        self.media_transform_offset
    }

    /// Sets the offset added to media table entries by transforms.
    pub fn set_media_transform_offset(&mut self, offset: i32) {
        self.media_transform_offset = offset;
    }

    /// Returns the next disk ID to use for media added by transforms.
    pub fn media_transform_disk_id(&self) -> i32 {
        self.media_transform_disk_id
    }

    /// Sets the next disk ID to use for media added by transforms.
    pub fn set_media_transform_disk_id(&mut self, disk_id: i32) {
        self.media_transform_disk_id = disk_id;
    }

    // ===================================================================== //

    /// Returns the names of the user tables in the database, in sorted
    /// order.  The `_Tables` and `_Columns` catalogs are not included.
    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .keys()
            .filter(|name| {
                name.as_str() != TABLES_TABLE && name.as_str() != COLUMNS_TABLE
            })
            .cloned()
            .collect()
    }

    /// Returns true if a table with the given name exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns the columns of a table.
    pub fn columns(&self, table_name: &str) -> Result<Vec<Column>> {
        match self.tables.get(table_name) {
            Some(table) => Ok(table.columns().to_vec()),
            None => invalid_table!("No table named {:?}", table_name),
        }
    }

    /// Returns a record holding the names of the table's primary key
    /// columns, with the table name in field zero.
    pub fn get_primary_keys(&self, table_name: &str) -> Result<Record> {
        let table = match self.tables.get(table_name) {
            Some(table) => table,
            None => invalid_table!("No table named {:?}", table_name),
        };
        let keys: Vec<Value> = table
            .primary_key_indices()
            .into_iter()
            .map(|index| Value::from(table.columns()[index].name()))
            .collect();
        let mut record = Record::from_values(keys);
        record.set_string(0, table_name)?;
        Ok(record)
    }

    /// Returns true if the table is written to disk at commit, or false if
    /// it is temporary.
    pub fn is_table_persistent(&self, table_name: &str) -> Result<bool> {
        match self.tables.get(table_name) {
            Some(table) => Ok(table.is_persistent()),
            None => invalid_table!("No table named {:?}", table_name),
        }
    }

    /// Returns the table, loading its rows from the file on first access.
    pub(crate) fn table(&mut self, name: &str) -> Result<&mut Table> {
        if self.unloaded.contains(name) {
            let stream_name = streamname::encode(name, true);
            if let Some(data) = self.storage.read_table_stream(&stream_name)? {
                if let Some(table) = self.tables.get_mut(name) {
                    table.read_rows(&data, self.bytes_per_strref)?;
                }
            }
            self.unloaded.remove(name);
        }
        match self.tables.get_mut(name) {
            Some(table) => Ok(table),
            None => invalid_table!("No table named {:?}", name),
        }
    }

    fn load_all_tables(&mut self) -> Result<()> {
        let names: Vec<String> = self.unloaded.iter().cloned().collect();
        for name in names {
            self.table(&name)?;
        }
        Ok(())
    }

    fn add_catalog_column(&mut self, table_name: &str, number: usize,
                          column: &Column, persistent: bool) {
        let persistence = if persistent {
            Persistence::Persistent
        } else {
            Persistence::Transient
        };
        let cells = vec![
            self.strings.add_string(table_name, 1, persistence),
            bias_int(number as i32, 2),
            self.strings.add_string(column.name(), 1, persistence),
            bias_int(column.bitfield(), 2),
        ];
        if let Some(catalog) = self.tables.get_mut(COLUMNS_TABLE) {
            catalog.insert_row(cells, None, persistent);
        }
    }

    /// Adds a table and records it in the catalogs.  The caller has already
    /// checked the name and columns.
    pub(crate) fn create_table(&mut self, name: &str, columns: Vec<Column>,
                               persistent: bool)
                               -> Result<()> {
        if self.tables.contains_key(name) {
            function_failed!("Table {:?} already exists", name);
        }
        if persistent && self.is_read_only() {
            access_denied!("Cannot create table {:?} in a read-only database",
                           name);
        }
        let persistence = if persistent {
            Persistence::Persistent
        } else {
            Persistence::Transient
        };
        let name_id = self.strings.add_string(name, 1, persistence);
        if let Some(catalog) = self.tables.get_mut(TABLES_TABLE) {
            catalog.insert_row(vec![name_id], None, persistent);
        }
        for (index, column) in columns.iter().enumerate() {
            let column_persistent = persistent && !column.is_temporary();
            self.add_catalog_column(name, index + 1, column, column_persistent);
        }
        tracing::debug!("created {} table {:?} with {} columns",
                        if persistent { "persistent" } else { "temporary" },
                        name,
                        columns.len());
        let table = Table::new(name.to_string(), columns, persistent);
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Removes a table, its catalog entries, and its binary streams.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if name == TABLES_TABLE || name == COLUMNS_TABLE {
            function_failed!("Cannot drop catalog table {:?}", name);
        }
        let persistent = match self.tables.get(name) {
            Some(table) => table.is_persistent(),
            None => invalid_table!("No table named {:?}", name),
        };
        if persistent && self.is_read_only() {
            access_denied!("Cannot drop table {:?} of a read-only database",
                           name);
        }
        self.tables.remove(name);
        self.unloaded.remove(name);
        if let Ok(id) = self.strings.id_from_string(name) {
            for catalog in [TABLES_TABLE, COLUMNS_TABLE] {
                if let Some(table) = self.tables.get_mut(catalog) {
                    table.retain_rows(|cells| cells[0] != id);
                }
            }
        }
        let prefix = format!("{}.", name);
        let doomed: Vec<String> = self
            .storage
            .streams()
            .filter(|&(raw, _)| {
                let (decoded, is_table) = streamname::decode(raw);
                !is_table && decoded.starts_with(&prefix)
            })
            .map(|(raw, _)| raw.to_string())
            .collect();
        for raw in doomed.iter() {
            self.storage.destroy_stream(raw);
        }
        tracing::debug!("dropped table {:?} ({} streams)", name, doomed.len());
        Ok(())
    }

    /// Appends a column to a table.  Adding with a hold also holds the
    /// table, and the new column is then temporary with one hold of its own.
    pub(crate) fn add_table_column(&mut self, table_name: &str,
                                   column: Column, hold: bool)
                                   -> Result<()> {
        let column = if hold { column.into_temporary() } else { column };
        let (persistent, number) = {
            let table = self.table(table_name)?;
            if table.index_for_column_name(column.name()).is_some() {
                bad_query_syntax!("Table {:?} already has a column named {:?}",
                                  table_name,
                                  column.name());
            }
            (table.is_persistent() && !column.is_temporary(),
             table.columns().len() + 1)
        };
        if persistent && self.is_read_only() {
            access_denied!("Cannot add columns to a read-only database");
        }
        tracing::debug!("adding column {:?} to {:?}", column.name(),
                        table_name);
        self.add_catalog_column(table_name, number, &column, persistent);
        let table = self.table(table_name)?;
        if hold {
            table.hold();
        }
        table.add_column(column, hold);
        Ok(())
    }

    pub(crate) fn hold_table(&mut self, table_name: &str) -> Result<()> {
        let table = self.table(table_name)?;
        table.hold();
        tracing::trace!("{:?} now has {} holds", table_name,
                        table.hold_count());
        Ok(())
    }

    /// Releases one hold on a table.  Temporary columns that are no longer
    /// held are removed, and a temporary table left with no holds and no
    /// rows is dropped.
    pub(crate) fn free_table(&mut self, table_name: &str) -> Result<()> {
        let (released, dropped) = {
            let table = self.table(table_name)?;
            if table.hold_count() == 0 {
                function_failed!("Table {:?} is not held", table_name);
            }
            let released = table.release();
            let dropped = table.hold_count() == 0
                && !table.is_persistent()
                && table.num_rows() == 0;
            (released, dropped)
        };
        if dropped {
            return self.drop_table(table_name);
        }
        for index in released.into_iter().rev() {
            self.remove_table_column(table_name, index + 1)?;
        }
        Ok(())
    }

    /// Removes column number `col` (counting from 1) from a table.
    pub(crate) fn remove_table_column(&mut self, table_name: &str,
                                      col: usize)
                                      -> Result<()> {
        let persistent = {
            let table = self.table(table_name)?;
            let num_cols = table.columns().len();
            if col == 0 || col > num_cols {
                invalid_parameter!("Table {:?} has no column {}",
                                   table_name,
                                   col);
            }
            if num_cols == 1 {
                function_failed!("Cannot remove the last column of {:?}",
                                 table_name);
            }
            table.is_persistent() && !table.columns()[col - 1].is_temporary()
        };
        if persistent && self.is_read_only() {
            access_denied!("Cannot remove columns from a read-only database");
        }
        self.table(table_name)?.remove_column(col - 1);
        if let Ok(id) = self.strings.id_from_string(table_name) {
            if let Some(catalog) = self.tables.get_mut(COLUMNS_TABLE) {
                let removed = bias_int(col as i32, 2);
                catalog.retain_rows(|cells| {
                    !(cells[0] == id && cells[1] == removed)
                });
                for row in 0..catalog.num_rows() {
                    if catalog.cell(row, 0) != Some(id) {
                        continue;
                    }
                    if let Some(raw) = catalog.cell(row, 1) {
                        let number = unbias_int(raw, 2);
                        if number > col as i32 {
                            catalog.set_cell(row, 1, bias_int(number - 1, 2));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ===================================================================== //

    pub(crate) fn open_table_view(&mut self, name: &str)
                                  -> Result<Box<dyn View>> {
        if name == STREAMS_TABLE {
            Ok(Box::new(StreamsView::new(self)))
        } else if name == STORAGES_TABLE {
            Ok(Box::new(StoragesView::new(self)))
        } else {
            Ok(Box::new(TableView::new(self, name)?))
        }
    }

    /// Opens a query for the given statement.  The query must be executed
    /// before rows can be fetched.
    pub fn open_query<S: Into<Statement>>(&mut self, statement: S)
                                          -> Result<Query> {
        let statement = statement.into();
        tracing::trace!("opening query: {}", statement);
        let view = query::build_view(self, statement)?;
        Ok(Query::new(view))
    }

    /// Opens, executes, and closes a query for the given statement.
    pub fn execute<S: Into<Statement>>(&mut self, statement: S) -> Result<()> {
        let mut query = self.open_query(statement)?;
        let result = query.execute(self, None);
        let closed = query.close(self);
        result?;
        closed
    }

    /// Runs a `SELECT` statement and collects every resulting row.
    pub fn select_rows(&mut self, select: Select) -> Result<Vec<Record>> {
        let mut query = self.open_query(select)?;
        let mut rows = Vec::new();
        query.iterate(self, None, |record| {
            rows.push(record);
            Ok(())
        })?;
        Ok(rows)
    }

    // ===================================================================== //

    /// Reads the summary information stream, or returns a fresh
    /// `SummaryInfo` if the database has none.
    pub fn summary_info(&mut self) -> Result<SummaryInfo> {
        match self.storage.get_raw_stream(streamname::SUMMARY_INFO_STREAM_NAME)
        {
            Ok(stream) => SummaryInfo::read(stream),
            Err(error) if error.is_not_found() => Ok(SummaryInfo::new()),
            Err(error) => Err(error),
        }
    }

    /// Replaces the summary information stream.
    pub fn set_summary_info(&mut self, summary_info: &SummaryInfo)
                            -> Result<()> {
        let mut data = Vec::new();
        summary_info.write(&mut data)?;
        self.storage
            .write_raw_stream_data(streamname::SUMMARY_INFO_STREAM_NAME, data)?;
        Ok(())
    }

    /// Returns the decoded names of the raw (non-table) streams.
    pub fn stream_names(&self) -> Vec<String> {
        self.storage
            .streams()
            .map(|(raw, _)| streamname::decode(raw))
            .filter(|(_, is_table)| !is_table)
            .map(|(name, _)| name)
            .collect()
    }

    /// Opens a raw stream for reading.
    pub fn read_stream(&mut self, name: &str) -> Result<StreamHandle> {
        self.storage.get_raw_stream(&streamname::encode(name, false))
    }

    /// Creates or replaces a raw stream.
    pub fn write_stream(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        if !streamname::is_valid(name, false) {
            invalid_parameter!("{:?} is not a valid stream name", name);
        }
        self.storage
            .write_raw_stream_data(&streamname::encode(name, false), data)?;
        Ok(())
    }

    /// Removes a raw stream.
    pub fn remove_stream(&mut self, name: &str) -> Result<()> {
        if self.is_read_only() {
            access_denied!("Cannot remove stream {:?} of a read-only database",
                           name);
        }
        if !self.storage.destroy_stream(&streamname::encode(name, false)) {
            not_found!("No stream named {:?}", name);
        }
        Ok(())
    }

    /// Returns the names of the sub-storages.
    pub fn storage_names(&self) -> Vec<String> {
        self.storage.storage_names()
    }

    /// Creates (or replaces) a sub-storage from a stream holding a complete
    /// compound file image.
    pub fn create_storage(&mut self, name: &str, source: &StreamHandle)
                          -> Result<()> {
        self.storage.create_storage(name, source)
    }

    /// Removes a sub-storage.  Does nothing if there is no such storage.
    pub fn destroy_storage(&mut self, name: &str) -> Result<()> {
        if self.is_read_only() {
            access_denied!("Cannot remove storage {:?} of a read-only \
                            database",
                           name);
        }
        self.storage.destroy_storage(name);
        Ok(())
    }

    /// Layers a transform file over the database.  Streams missing from the
    /// database are looked up in the most recently applied transform first.
    pub fn apply_transform<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let comp = open_compound_file(path)?;
        let class_id = *comp.root_entry().clsid();
        if class_id != TRANSFORM_CLSID {
            function_failed!("{:?} is not a transform (class ID {})",
                             path,
                             class_id);
        }
        self.storage.push_transform(comp);
        tracing::debug!("applied transform {:?} ({} in total)",
                        path,
                        self.storage.num_transforms());
        Ok(())
    }

    // ===================================================================== //

    fn output_path(&self) -> PathBuf {
        if self.mode == OpenMode::Create {
            self.path.clone()
        } else {
            let mut name = self.path.clone().into_os_string();
            name.push(".tmp");
            PathBuf::from(name)
        }
    }

    /// Writes every storage, stream, and persistent table to a new file.
    /// Leaves the original file alone if anything fails, and the database
    /// remains usable either way.
    pub fn commit(&mut self) -> Result<()> {
        if self.is_read_only() {
            tracing::debug!("not committing read-only database {:?}",
                            self.path);
            return Ok(());
        }
        tracing::debug!("committing {:?}", self.path);
        self.load_all_tables()?;
        let (pool, data, bytes_per_strref) = self.strings.save()?;
        let pool_name = streamname::encode(streamname::STRING_POOL, true);
        let data_name = streamname::encode(streamname::STRING_DATA, true);
        self.storage.write_raw_stream_data(&pool_name, pool)?;
        self.storage.write_raw_stream_data(&data_name, data)?;
        let output_path = self.output_path();
        let result = self.write_output(&output_path, bytes_per_strref);
        self.storage.destroy_stream(&pool_name);
        self.storage.destroy_stream(&data_name);
        if let Err(error) = result {
            tracing::debug!("commit failed: {}", error);
            if let Err(remove_error) = fs::remove_file(&output_path) {
                tracing::warn!("could not remove {:?}: {}",
                               output_path,
                               remove_error);
            }
            return Err(error);
        }
        self.storage.close_input();
        let renamed = if output_path != self.path {
            fs::rename(&output_path, &self.path)
        } else {
            Ok(())
        };
        self.storage.set_input(open_compound_file(&self.path)?);
        renamed?;
        self.bytes_per_strref = bytes_per_strref;
        if self.mode == OpenMode::Create {
            self.mode = OpenMode::Transact;
        }
        tracing::debug!("committed {:?}", self.path);
        Ok(())
    }

    fn write_output(&mut self, output_path: &Path, bytes_per_strref: usize)
                    -> Result<()> {
        let file = fs::File::create(output_path)?;
        let mut comp =
            cfb::CompoundFile::create_with_version(cfb::Version::V3, file)?;
        comp.set_storage_clsid("/", self.class_id)?;
        self.storage.load_all_storages()?;
        self.storage.write_storages(&mut comp)?;
        self.storage.write_streams(&mut comp)?;
        for table in self.tables.values() {
            if !table.is_persistent() {
                continue;
            }
            let data = table.write_rows(bytes_per_strref)?;
            tracing::trace!("writing table {:?} ({} bytes)",
                            table.name(),
                            data.len());
            let path = Path::new("/").join(table.stream_name());
            comp.create_stream(&path)?.write_all(&data)?;
        }
        comp.flush()?;
        Ok(())
    }
}

// ========================================================================= //


// ========================================================================= //
