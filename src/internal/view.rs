use crate::internal::column::{bias_int, unbias_int, Column, ColumnType};
use crate::internal::database::Database;
use crate::internal::error::Result;
use crate::internal::record::{Record, NULL_INT};
use crate::internal::storage::StreamHandle;
use crate::internal::streamname;
use crate::internal::stringtable::Persistence;
use crate::internal::table::{STORAGES_TABLE, STREAMS_TABLE};
use crate::internal::value::Value;

// ========================================================================= //

/// Describes one column of a view.
#[derive(Clone, Debug)]
pub struct ColumnInfo {
    table_name: String,
    column: Column,
}

impl ColumnInfo {
    pub(crate) fn new(table_name: &str, column: Column) -> ColumnInfo {
        ColumnInfo { table_name: table_name.to_string(), column }
    }

    /// Returns the name of the column.
    pub fn name(&self) -> &str {
        self.column.name()
    }

    /// Returns the name of the table the column belongs to.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the column definition.
    pub fn column(&self) -> &Column {
        &self.column
    }

    /// Returns the raw type bits of the column.
    pub fn type_bits(&self) -> i32 {
        self.column.bitfield()
    }

    /// Returns true if the column is kept in memory only.
    pub fn is_temporary(&self) -> bool {
        self.column.is_temporary()
    }

    /// Returns the import/export type code (such as `s72`) for the column.
    pub fn type_code(&self) -> String {
        self.column.type_code()
    }
}

// ========================================================================= //

/// The operations shared by every kind of view.
///
/// Rows are numbered from zero and columns from one, matching record fields.
/// Operations a view cannot perform fail with `FunctionFailed`.
pub(crate) trait View {
    /// Returns the raw cell value: a string ID, a biased integer, or a
    /// nonzero flag for a present binary stream.
    fn fetch_int(&self, db: &mut Database, row: usize, col: usize)
                 -> Result<u32>;

    fn fetch_stream(&self, _db: &mut Database, _row: usize, col: usize)
                    -> Result<StreamHandle> {
        function_failed!("View does not hold a stream in column {}", col)
    }

    /// Decodes one row into a record.  Rows past the end yield
    /// `NoMoreItems`.
    fn get_row(&self, db: &mut Database, row: usize) -> Result<Record> {
        let (num_rows, num_cols) = self.get_dimensions(db)?;
        if row >= num_rows {
            no_more_items!("No row {} (view has {} rows)", row, num_rows);
        }
        let mut record = Record::new(num_cols);
        for col in 1..=num_cols {
            let info = self.get_column_info(db, col)?;
            let column = info.column();
            let raw = self.fetch_int(db, row, col)?;
            if column.is_binary() {
                if raw == 0 {
                    continue;
                }
                match self.fetch_stream(db, row, col) {
                    Ok(stream) => record.set_value(col, Value::Stream(stream))?,
                    Err(error) => tracing::warn!(
                        "failed to get stream for {}.{} (row {}): {}",
                        info.table_name(),
                        info.name(),
                        row,
                        error
                    ),
                }
            } else if raw == 0 {
                continue;
            } else if column.is_string() {
                let string = match db.string_table().get(raw) {
                    Some(string) => string.to_string(),
                    None => function_failed!(
                        "String ID {} in {}.{} is out of range",
                        raw,
                        info.table_name(),
                        info.name()
                    ),
                };
                record.set_value(col, Value::Str(string))?;
            } else {
                let width = int_width(column);
                record.set_int(col, unbias_int(raw, width))?;
            }
        }
        Ok(record)
    }

    /// Updates the columns of a row selected by `mask` (bit `n - 1` for
    /// column `n`).
    fn set_row(&mut self, _db: &mut Database, _row: usize, _record: &Record,
               _mask: u32)
               -> Result<()> {
        function_failed!("View does not support updating rows")
    }

    fn insert_row(&mut self, _db: &mut Database, _record: &Record,
                  _row: Option<usize>, _temporary: bool)
                  -> Result<()> {
        function_failed!("View does not support inserting rows")
    }

    fn delete_row(&mut self, _db: &mut Database, _row: usize) -> Result<()> {
        function_failed!("View does not support deleting rows")
    }

    fn execute(&mut self, db: &mut Database, params: Option<&Record>)
               -> Result<()>;

    fn close(&mut self, _db: &mut Database) -> Result<()> {
        Ok(())
    }

    /// Returns (number of rows, number of columns).
    fn get_dimensions(&self, db: &mut Database) -> Result<(usize, usize)>;

    fn get_column_info(&self, db: &mut Database, col: usize)
                       -> Result<ColumnInfo>;

    /// Releases the view.
    fn delete(self: Box<Self>, _db: &mut Database) {}

    /// Finds the next row, starting at `*handle`, whose raw cell in `col`
    /// equals `value`.  Advances `handle` past the match; fails with
    /// `NoMoreItems` when there are no further matches.
    fn find_matching_rows(&self, db: &mut Database, col: usize, value: u32,
                          handle: &mut usize)
                          -> Result<usize> {
        let (num_rows, _) = self.get_dimensions(db)?;
        while *handle < num_rows {
            let row = *handle;
            *handle += 1;
            if self.fetch_int(db, row, col)? == value {
                return Ok(row);
            }
        }
        no_more_items!("No more rows match")
    }

    fn sort(&mut self, _db: &mut Database, _columns: &[String])
            -> Result<()> {
        function_failed!("View does not support sorting")
    }
}

fn int_width(column: &Column) -> usize {
    if column.coltype() == ColumnType::Int16 {
        2
    } else {
        4
    }
}

// The most negative 16-bit value biases to zero, which reads back as null.
const INT16_RANGE: std::ops::RangeInclusive<i32> = -0x7fff..=0x7fff;

fn has_binary_cell(columns: &[Column], cells: &[u32]) -> bool {
    columns
        .iter()
        .zip(cells.iter())
        .any(|(column, &cell)| column.is_binary() && cell != 0)
}

fn check_column(col: usize, num_cols: usize) -> Result<()> {
    if col == 0 || col > num_cols {
        invalid_parameter!(
            "Column {} is out of range (view has {} columns)",
            col,
            num_cols
        );
    }
    Ok(())
}

// ========================================================================= //

/// Computes the cell a record field would occupy, without interning
/// anything.  Returns `None` for a string that is not in the string table
/// yet (and so cannot collide with any existing cell).
fn lookup_cell(db: &Database, column: &Column, record: &Record, field: usize)
               -> Result<Option<u32>> {
    let value = match record.value(field) {
        Some(value) => value,
        None => return Ok(Some(0)),
    };
    if column.is_binary() {
        return match *value {
            Value::Null => Ok(Some(0)),
            Value::Stream(_) => Ok(Some(1)),
            _ => function_failed!(
                "Column {:?} requires a stream value",
                column.name()
            ),
        };
    }
    if let Value::Stream(_) = *value {
        function_failed!("Column {:?} cannot hold a stream", column.name());
    }
    if value.is_null() {
        return Ok(Some(0));
    }
    if column.is_string() {
        let string = record.get_string(field);
        Ok(db.string_table().id_from_string(&string).ok())
    } else {
        let width = int_width(column);
        match record.get_int(field) {
            NULL_INT => Ok(Some(0)),
            number if width == 2 && !INT16_RANGE.contains(&number) => {
                function_failed!("Value {} is out of range for 16-bit \
                                  column {:?}",
                                 number,
                                 column.name())
            }
            number => Ok(Some(bias_int(number, width))),
        }
    }
}

/// Like `lookup_cell`, but interns string values.
fn store_cell(db: &mut Database, column: &Column, record: &Record,
              field: usize, persistence: Persistence)
              -> Result<u32> {
    if column.is_string() && !record.is_null(field) {
        if let Some(Value::Stream(_)) = record.value(field) {
            function_failed!("Column {:?} cannot hold a stream",
                             column.name());
        }
        let string = record.get_string(field);
        return Ok(db.string_table_mut().add_string(&string, 1, persistence));
    }
    Ok(lookup_cell(db, column, record, field)?.unwrap_or(0))
}

// ========================================================================= //

/// A view directly over one table of the database.
pub(crate) struct TableView {
    name: String,
}

impl TableView {
    pub(crate) fn new(db: &mut Database, name: &str) -> Result<TableView> {
        if !db.has_table(name) {
            bad_query_syntax!("Table {:?} does not exist", name);
        }
        Ok(TableView { name: name.to_string() })
    }

    fn columns(&self, db: &mut Database) -> Result<Vec<Column>> {
        Ok(db.table(&self.name)?.columns().to_vec())
    }

    /// Returns the raw stream name for a binary field of a row with the
    /// given cells.
    fn binary_stream_name(&self, db: &mut Database, cells: &[u32])
                          -> Result<String> {
        let table = db.table(&self.name)?;
        let columns = table.columns().to_vec();
        let keys = table.primary_key_indices();
        let mut key_strings = Vec::with_capacity(keys.len());
        for index in keys {
            let column = &columns[index];
            let raw = cells[index];
            if column.is_string() {
                match db.string_table().get(raw) {
                    Some(string) => key_strings.push(string.to_string()),
                    None => function_failed!("String ID {} is out of range",
                                             raw),
                }
            } else {
                key_strings
                    .push(unbias_int(raw, int_width(column)).to_string());
            }
        }
        let name = streamname::binary_stream_name(&self.name, &key_strings);
        Ok(streamname::encode(&name, false))
    }

    /// Stores the data for a row's binary cells.  Streams of temporary rows
    /// are never written to the file.
    fn write_row_streams(&self, db: &mut Database, name: &str,
                         streams: Vec<StreamHandle>, persistent: bool)
                         -> Result<()> {
        for stream in streams {
            let data = stream.data().to_vec();
            if persistent {
                db.storage_mut().write_raw_stream_data(name, data)?;
            } else {
                db.storage_mut().write_transient_stream(name, data);
            }
        }
        Ok(())
    }

    fn check_writable(&self, db: &mut Database, persistent: bool)
                      -> Result<()> {
        if persistent && db.is_read_only() {
            access_denied!("Cannot modify table {:?} of a read-only database",
                           self.name);
        }
        Ok(())
    }
}

impl View for TableView {
    fn fetch_int(&self, db: &mut Database, row: usize, col: usize)
                 -> Result<u32> {
        let table = db.table(&self.name)?;
        check_column(col, table.columns().len())?;
        match table.cell(row, col - 1) {
            Some(value) => Ok(value),
            None => no_more_items!("Table {:?} has no row {}", self.name, row),
        }
    }

    fn fetch_stream(&self, db: &mut Database, row: usize, col: usize)
                    -> Result<StreamHandle> {
        let cells = {
            let table = db.table(&self.name)?;
            check_column(col, table.columns().len())?;
            if !table.columns()[col - 1].is_binary() {
                function_failed!("Column {} of table {:?} is not binary",
                                 col,
                                 self.name);
            }
            match table.row(row) {
                Some(cells) => cells.to_vec(),
                None => {
                    no_more_items!("Table {:?} has no row {}", self.name, row)
                }
            }
        };
        let name = self.binary_stream_name(db, &cells)?;
        db.storage_mut().get_raw_stream(&name)
    }

    fn set_row(&mut self, db: &mut Database, row: usize, record: &Record,
               mask: u32)
               -> Result<()> {
        let (columns, old_cells, persistent) = {
            let table = db.table(&self.name)?;
            let cells = match table.row(row) {
                Some(cells) => cells.to_vec(),
                None => function_failed!("Table {:?} has no row {}",
                                         self.name,
                                         row),
            };
            (table.columns().to_vec(), cells, table.is_row_persistent(row))
        };
        self.check_writable(db, persistent)?;
        let selected =
            |index: usize| index < 32 && (mask & (1 << index)) != 0;
        let mut candidate = old_cells.clone();
        let mut all_known = true;
        let mut key_changed = false;
        for (index, column) in columns.iter().enumerate() {
            if !selected(index) {
                continue;
            }
            if !column.is_nullable()
                && !column.is_binary()
                && record.is_null(index + 1)
            {
                function_failed!("Column {:?} of table {:?} cannot be null",
                                 column.name(),
                                 self.name);
            }
            match lookup_cell(db, column, record, index + 1)? {
                Some(cell) => {
                    key_changed |=
                        column.is_primary_key() && cell != old_cells[index];
                    candidate[index] = cell;
                }
                None if column.is_primary_key() => {
                    all_known = false;
                    key_changed = true;
                }
                None => {}
            }
        }
        if key_changed
            && all_known
            && db.table(&self.name)?.find_row_with_key(&candidate, Some(row))
                .is_some()
        {
            function_failed!("Table {:?} already has a row with that \
                              primary key",
                             self.name);
        }
        let persistence = if persistent {
            Persistence::Persistent
        } else {
            Persistence::Transient
        };
        let mut cells = old_cells.clone();
        let mut streams = Vec::new();
        for (index, column) in columns.iter().enumerate() {
            if !selected(index) {
                continue;
            }
            cells[index] =
                store_cell(db, column, record, index + 1, persistence)?;
            if let Some(Value::Stream(stream)) = record.value(index + 1) {
                streams.push(stream.clone());
            }
        }
        if has_binary_cell(&columns, &old_cells) {
            let old_name = self.binary_stream_name(db, &old_cells)?;
            if !has_binary_cell(&columns, &cells) {
                db.storage_mut().destroy_stream(&old_name);
            } else {
                let new_name = self.binary_stream_name(db, &cells)?;
                if new_name != old_name {
                    if streams.is_empty() {
                        db.storage_mut().rename_stream(&old_name, &new_name)?;
                    } else {
                        db.storage_mut().destroy_stream(&old_name);
                    }
                }
            }
        }
        if !streams.is_empty() {
            let name = self.binary_stream_name(db, &cells)?;
            self.write_row_streams(db, &name, streams, persistent)?;
        }
        let table = db.table(&self.name)?;
        for (index, cell) in cells.into_iter().enumerate() {
            table.set_cell(row, index, cell);
        }
        Ok(())
    }

    fn insert_row(&mut self, db: &mut Database, record: &Record,
                  row: Option<usize>, temporary: bool)
                  -> Result<()> {
        let persistent = !temporary && db.table(&self.name)?.is_persistent();
        self.check_writable(db, persistent)?;
        let columns = self.columns(db)?;
        for (index, column) in columns.iter().enumerate() {
            if !column.is_nullable()
                && !column.is_binary()
                && record.is_null(index + 1)
            {
                function_failed!("Column {:?} of table {:?} cannot be null",
                                 column.name(),
                                 self.name);
            }
        }
        let mut candidate = Vec::with_capacity(columns.len());
        let mut all_known = true;
        for (index, column) in columns.iter().enumerate() {
            match lookup_cell(db, column, record, index + 1)? {
                Some(cell) => candidate.push(cell),
                None => {
                    candidate.push(0);
                    all_known &= !column.is_primary_key();
                }
            }
        }
        if all_known
            && db.table(&self.name)?.find_row_with_key(&candidate, None).is_some()
        {
            function_failed!("Table {:?} already has a row with that \
                              primary key",
                             self.name);
        }
        let persistence = if persistent {
            Persistence::Persistent
        } else {
            Persistence::Transient
        };
        let mut cells = Vec::with_capacity(columns.len());
        let mut streams = Vec::new();
        for (index, column) in columns.iter().enumerate() {
            cells.push(store_cell(db, column, record, index + 1,
                                  persistence)?);
            if let Some(Value::Stream(stream)) = record.value(index + 1) {
                streams.push(stream.clone());
            }
        }
        if !streams.is_empty() {
            let name = self.binary_stream_name(db, &cells)?;
            self.write_row_streams(db, &name, streams, persistent)?;
        }
        tracing::trace!("inserting row into {:?}", self.name);
        db.table(&self.name)?.insert_row(cells, row, persistent);
        Ok(())
    }

    fn delete_row(&mut self, db: &mut Database, row: usize) -> Result<()> {
        let persistent = db.table(&self.name)?.is_row_persistent(row);
        self.check_writable(db, persistent)?;
        let (columns, cells) = {
            let table = db.table(&self.name)?;
            match table.row(row) {
                Some(cells) => (table.columns().to_vec(), cells.to_vec()),
                None => function_failed!("Table {:?} has no row {}",
                                         self.name,
                                         row),
            }
        };
        if has_binary_cell(&columns, &cells) {
            let name = self.binary_stream_name(db, &cells)?;
            db.storage_mut().destroy_stream(&name);
        }
        db.table(&self.name)?.delete_row(row);
        Ok(())
    }

    fn execute(&mut self, db: &mut Database, _params: Option<&Record>)
               -> Result<()> {
        db.table(&self.name)?;
        Ok(())
    }

    fn get_dimensions(&self, db: &mut Database) -> Result<(usize, usize)> {
        let table = db.table(&self.name)?;
        Ok((table.num_rows(), table.columns().len()))
    }

    fn get_column_info(&self, db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        let table = db.table(&self.name)?;
        check_column(col, table.columns().len())?;
        Ok(ColumnInfo::new(&self.name, table.columns()[col - 1].clone()))
    }

    fn find_matching_rows(&self, db: &mut Database, col: usize, value: u32,
                          handle: &mut usize)
                          -> Result<usize> {
        let table = db.table(&self.name)?;
        check_column(col, table.columns().len())?;
        while *handle < table.num_rows() {
            let row = *handle;
            *handle += 1;
            if table.cell(row, col - 1) == Some(value) {
                return Ok(row);
            }
        }
        no_more_items!("No more rows of {:?} match", self.name)
    }
}

// ========================================================================= //

/// The `_Streams` pseudo-table: one row per raw (non-table) stream, with the
/// stream's name and data.
pub(crate) struct StreamsView {
    rows: Vec<(String, u32)>,
}

impl StreamsView {
    pub(crate) fn new(db: &mut Database) -> StreamsView {
        let mut view = StreamsView { rows: Vec::new() };
        view.refresh(db);
        view
    }

    fn columns() -> [Column; 2] {
        [
            Column::build("Name").primary_key().string(62),
            Column::build("Data").nullable().binary(),
        ]
    }

    fn refresh(&mut self, db: &mut Database) {
        let names: Vec<(String, String)> = db
            .storage_mut()
            .streams()
            .filter(|(raw, _)| !streamname::is_table_stream(raw))
            .map(|(raw, _)| (raw.to_string(), streamname::decode(raw).0))
            .collect();
        self.rows = names
            .into_iter()
            .map(|(raw, decoded)| {
                let id = db.string_table_mut().add_string(
                    &decoded,
                    1,
                    Persistence::Transient,
                );
                (raw, id)
            })
            .collect();
    }
}

impl View for StreamsView {
    fn fetch_int(&self, _db: &mut Database, row: usize, col: usize)
                 -> Result<u32> {
        check_column(col, 2)?;
        match self.rows.get(row) {
            Some(&(_, id)) => Ok(if col == 1 { id } else { 1 }),
            None => no_more_items!("{} has no row {}", STREAMS_TABLE, row),
        }
    }

    fn fetch_stream(&self, db: &mut Database, row: usize, col: usize)
                    -> Result<StreamHandle> {
        check_column(col, 2)?;
        match self.rows.get(row) {
            Some((raw, _)) if col == 2 => {
                db.storage_mut().clone_open_stream(raw)
            }
            Some(_) => function_failed!("Column {} of {} is not binary",
                                        col,
                                        STREAMS_TABLE),
            None => no_more_items!("{} has no row {}", STREAMS_TABLE, row),
        }
    }

    fn insert_row(&mut self, db: &mut Database, record: &Record,
                  _row: Option<usize>, _temporary: bool)
                  -> Result<()> {
        let name = record.get_string(1);
        if name.is_empty() {
            function_failed!("Stream name cannot be empty");
        }
        let data = match record.value(2) {
            Some(Value::Stream(stream)) => stream.data().to_vec(),
            _ => function_failed!("Stream {:?} has no data", name),
        };
        let raw = streamname::encode(&name, false);
        if self.rows.iter().any(|(existing, _)| *existing == raw) {
            function_failed!("Stream {:?} already exists", name);
        }
        tracing::debug!("adding stream {:?} ({} bytes)", name, data.len());
        db.storage_mut().write_raw_stream_data(&raw, data)?;
        self.refresh(db);
        Ok(())
    }

    fn set_row(&mut self, db: &mut Database, row: usize, record: &Record,
               mask: u32)
               -> Result<()> {
        let raw = match self.rows.get(row) {
            Some((raw, _)) => raw.clone(),
            None => function_failed!("{} has no row {}", STREAMS_TABLE, row),
        };
        if (mask & 2) != 0 {
            let data = match record.value(2) {
                Some(Value::Stream(stream)) => stream.data().to_vec(),
                _ => Vec::new(),
            };
            db.storage_mut().write_raw_stream_data(&raw, data)?;
        }
        Ok(())
    }

    fn delete_row(&mut self, db: &mut Database, row: usize) -> Result<()> {
        if db.is_read_only() {
            access_denied!("Cannot delete streams of a read-only database");
        }
        match self.rows.get(row) {
            Some((raw, _)) => {
                db.storage_mut().destroy_stream(raw);
            }
            None => function_failed!("{} has no row {}", STREAMS_TABLE, row),
        }
        self.rows.remove(row);
        Ok(())
    }

    fn execute(&mut self, db: &mut Database, _params: Option<&Record>)
               -> Result<()> {
        self.refresh(db);
        Ok(())
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((self.rows.len(), 2))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        check_column(col, 2)?;
        let [name, data] = StreamsView::columns();
        let column = if col == 1 { name } else { data };
        Ok(ColumnInfo::new(STREAMS_TABLE, column))
    }
}

// ========================================================================= //

/// The `_Storages` pseudo-table: one row per sub-storage.  The data column
/// accepts a compound file image on insert or update, but cannot be read
/// back as a stream.
pub(crate) struct StoragesView {
    rows: Vec<(String, u32)>,
}

impl StoragesView {
    pub(crate) fn new(db: &mut Database) -> StoragesView {
        let mut view = StoragesView { rows: Vec::new() };
        view.refresh(db);
        view
    }

    fn refresh(&mut self, db: &mut Database) {
        let names = db.storage_names();
        self.rows = names
            .into_iter()
            .map(|name| {
                let id = db.string_table_mut().add_string(
                    &name,
                    1,
                    Persistence::Transient,
                );
                (name, id)
            })
            .collect();
    }

    fn row_name(&self, row: usize) -> Result<String> {
        match self.rows.get(row) {
            Some((name, _)) => Ok(name.clone()),
            None => function_failed!("{} has no row {}", STORAGES_TABLE, row),
        }
    }
}

impl View for StoragesView {
    fn fetch_int(&self, _db: &mut Database, row: usize, col: usize)
                 -> Result<u32> {
        check_column(col, 2)?;
        match self.rows.get(row) {
            Some(&(_, id)) => Ok(if col == 1 { id } else { 1 }),
            None => no_more_items!("{} has no row {}", STORAGES_TABLE, row),
        }
    }

    fn fetch_stream(&self, _db: &mut Database, _row: usize, col: usize)
                    -> Result<StreamHandle> {
        check_column(col, 2)?;
        function_failed!("Storages cannot be read back as streams")
    }

    // The data column is always left null.
    fn get_row(&self, _db: &mut Database, row: usize) -> Result<Record> {
        match self.rows.get(row) {
            Some((name, _)) => {
                let mut record = Record::new(2);
                record.set_string(1, name)?;
                Ok(record)
            }
            None => no_more_items!("{} has no row {}", STORAGES_TABLE, row),
        }
    }

    fn insert_row(&mut self, db: &mut Database, record: &Record,
                  _row: Option<usize>, _temporary: bool)
                  -> Result<()> {
        let name = record.get_string(1);
        if name.is_empty() {
            function_failed!("Storage name cannot be empty");
        }
        if self.rows.iter().any(|(existing, _)| *existing == name) {
            function_failed!("Storage {:?} already exists", name);
        }
        match record.value(2) {
            Some(Value::Stream(stream)) => db.create_storage(&name, stream)?,
            _ => function_failed!("Storage {:?} has no data", name),
        }
        tracing::debug!("added storage {:?}", name);
        self.refresh(db);
        Ok(())
    }

    fn set_row(&mut self, db: &mut Database, row: usize, record: &Record,
               mask: u32)
               -> Result<()> {
        let name = self.row_name(row)?;
        if (mask & 2) != 0 {
            match record.value(2) {
                Some(Value::Stream(stream)) => {
                    db.create_storage(&name, stream)?
                }
                _ => function_failed!("Storage {:?} needs data", name),
            }
        }
        Ok(())
    }

    fn delete_row(&mut self, db: &mut Database, row: usize) -> Result<()> {
        let name = self.row_name(row)?;
        db.destroy_storage(&name)?;
        self.rows.remove(row);
        Ok(())
    }

    fn execute(&mut self, db: &mut Database, _params: Option<&Record>)
               -> Result<()> {
        self.refresh(db);
        Ok(())
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((self.rows.len(), 2))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        check_column(col, 2)?;
        let column = if col == 1 {
            Column::build("Name").primary_key().string(62)
        } else {
            Column::build("Data").nullable().binary()
        };
        Ok(ColumnInfo::new(STORAGES_TABLE, column))
    }
}

// ========================================================================= //


// ========================================================================= //
