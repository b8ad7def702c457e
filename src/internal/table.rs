use crate::internal::column::{read_cell, write_cell, Column};
use crate::internal::error::Result;
use crate::internal::streamname;
use std::io::Cursor;

// ========================================================================= //

/// The name of the catalog table listing every user table.
pub const TABLES_TABLE: &str = "_Tables";
/// The name of the catalog table describing every user table's columns.
pub const COLUMNS_TABLE: &str = "_Columns";
/// The name of the virtual table listing raw streams.
pub const STREAMS_TABLE: &str = "_Streams";
/// The name of the virtual table listing sub-storages.
pub const STORAGES_TABLE: &str = "_Storages";

// ========================================================================= //

/// A database table held in memory.
///
/// Cells hold raw on-disk values: string-table IDs for string columns, biased
/// integers for integer columns, and a presence flag for binary columns.
pub(crate) struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<u32>>,
    row_persistent: Vec<bool>,
    persistent: bool,
    holds: u32,
    column_holds: Vec<u32>,
}

impl Table {
    pub(crate) fn new(
        name: String,
        columns: Vec<Column>,
        persistent: bool,
    ) -> Table {
        let column_holds = vec![0; columns.len()];
        Table {
            name,
            columns,
            rows: Vec::new(),
            row_persistent: Vec::new(),
            persistent,
            holds: 0,
            column_holds,
        }
    }

    pub(crate) fn tables_catalog() -> Table {
        let columns = vec![Column::build("Name").primary_key().string(64)];
        Table::new(TABLES_TABLE.to_string(), columns, true)
    }

    pub(crate) fn columns_catalog() -> Table {
        let columns = vec![
            Column::build("Table").primary_key().string(64),
            Column::build("Number").primary_key().int16(),
            Column::build("Name").string(64),
            Column::build("Type").int16(),
        ];
        Table::new(COLUMNS_TABLE.to_string(), columns, true)
    }

    /// Returns the name of the table.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the CFB stream that holds this table's data.
    pub(crate) fn stream_name(&self) -> String {
        streamname::encode(&self.name, true)
    }

    /// Returns true if the given string can be used as a table name.
    pub(crate) fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && streamname::is_valid(name, true)
    }

    pub(crate) fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn index_for_column_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub(crate) fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.is_primary_key())
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn row(&self, row: usize) -> Option<&[u32]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<u32> {
        self.rows.get(row).and_then(|cells| cells.get(col)).copied()
    }

    pub(crate) fn set_cell(&mut self, row: usize, col: usize, value: u32) {
        self.rows[row][col] = value;
    }

    pub(crate) fn is_row_persistent(&self, row: usize) -> bool {
        self.row_persistent.get(row).copied().unwrap_or(false)
    }

    /// Returns the index of a row whose primary key cells equal those of
    /// `cells`, skipping `except` if given.
    pub(crate) fn find_row_with_key(
        &self,
        cells: &[u32],
        except: Option<usize>,
    ) -> Option<usize> {
        let keys = self.primary_key_indices();
        if keys.is_empty() {
            return None;
        }
        self.rows.iter().enumerate().position(|(index, row)| {
            Some(index) != except
                && keys.iter().all(|&col| row[col] == cells[col])
        })
    }

    /// Inserts a row of cells at the given index, or at the end.
    pub(crate) fn insert_row(
        &mut self,
        cells: Vec<u32>,
        at: Option<usize>,
        persistent: bool,
    ) {
        debug_assert_eq!(cells.len(), self.columns.len());
        let index = at.unwrap_or(self.rows.len()).min(self.rows.len());
        self.rows.insert(index, cells);
        self.row_persistent.insert(index, persistent && self.persistent);
    }

    pub(crate) fn delete_row(&mut self, row: usize) -> Vec<u32> {
        self.row_persistent.remove(row);
        self.rows.remove(row)
    }

    /// Appends a column with a null cell in every row.  A held column
    /// starts out with one hold.
    pub(crate) fn add_column(&mut self, column: Column, held: bool) {
        self.columns.push(column);
        self.column_holds.push(if held { 1 } else { 0 });
        for row in self.rows.iter_mut() {
            row.push(0);
        }
    }

    pub(crate) fn remove_column(&mut self, col: usize) -> Column {
        for row in self.rows.iter_mut() {
            row.remove(col);
        }
        self.column_holds.remove(col);
        self.columns.remove(col)
    }

    pub(crate) fn hold_count(&self) -> u32 {
        self.holds
    }

    /// Adds a hold to the table and to each of its temporary columns.
    pub(crate) fn hold(&mut self) {
        self.holds += 1;
        for (column, count) in
            self.columns.iter().zip(self.column_holds.iter_mut())
        {
            if column.is_temporary() {
                *count += 1;
            }
        }
    }

    /// Releases one hold.  Returns the indices of temporary columns that are
    /// no longer held, in ascending order.
    pub(crate) fn release(&mut self) -> Vec<usize> {
        self.holds = self.holds.saturating_sub(1);
        let mut released = Vec::new();
        for (index, column) in self.columns.iter().enumerate() {
            let count = &mut self.column_holds[index];
            if column.is_temporary() && *count > 0 {
                *count -= 1;
                if *count == 0 {
                    released.push(index);
                }
            }
        }
        released
    }

    pub(crate) fn retain_rows<F: FnMut(&[u32]) -> bool>(&mut self, mut f: F) {
        let mut index = 0;
        while index < self.rows.len() {
            if f(&self.rows[index]) {
                index += 1;
            } else {
                self.delete_row(index);
            }
        }
    }

    fn row_size(&self, bytes_per_strref: usize) -> usize {
        self.columns
            .iter()
            .filter(|column| !column.is_temporary())
            .map(|column| column.cell_width(bytes_per_strref))
            .sum()
    }

    /// Decodes column-major table stream data, appending the rows.
    pub(crate) fn read_rows(
        &mut self,
        data: &[u8],
        bytes_per_strref: usize,
    ) -> Result<()> {
        let row_size = self.row_size(bytes_per_strref);
        let num_rows = if row_size > 0 { data.len() / row_size } else { 0 };
        if row_size > 0 && data.len() % row_size != 0 {
            tracing::warn!(
                "table {:?} has {} trailing bytes",
                self.name,
                data.len() % row_size
            );
        }
        let mut rows = vec![vec![0u32; self.columns.len()]; num_rows];
        let mut reader = Cursor::new(data);
        for (col, column) in self.columns.iter().enumerate() {
            if column.is_temporary() {
                continue;
            }
            let width = column.cell_width(bytes_per_strref);
            for row in rows.iter_mut() {
                row[col] = read_cell(&mut reader, width)?;
            }
        }
        tracing::trace!("read {} rows of table {:?}", num_rows, self.name);
        self.row_persistent.extend(std::iter::repeat(true).take(num_rows));
        self.rows.extend(rows);
        Ok(())
    }

    /// Encodes the persistent rows and columns as column-major table stream
    /// data.
    pub(crate) fn write_rows(&self, bytes_per_strref: usize) -> Result<Vec<u8>> {
        let rows: Vec<&Vec<u32>> = self
            .rows
            .iter()
            .zip(self.row_persistent.iter())
            .filter(|&(_, &persistent)| persistent)
            .map(|(row, _)| row)
            .collect();
        let mut output =
            Vec::with_capacity(rows.len() * self.row_size(bytes_per_strref));
        for (col, column) in self.columns.iter().enumerate() {
            if column.is_temporary() {
                continue;
            }
            let width = column.cell_width(bytes_per_strref);
            for row in rows.iter() {
                write_cell(&mut output, width, row[col])?;
            }
        }
        Ok(output)
    }
}

// ========================================================================= //


// ========================================================================= //
