//! Import and export of tables in the tab-separated `.idt` text format.
//!
//! A file holds three header lines (column names, column type codes, and
//! the table name followed by its primary key columns) and then one line
//! per row.  Binary cells name a file under a sidecar directory.

use crate::internal::codepage::CodePage;
use crate::internal::column::Column;
use crate::internal::database::Database;
use crate::internal::error::{Error, Result};
use crate::internal::query::{ColumnInfoKind, CreateTable, Insert, Select};
use crate::internal::record::Record;
use crate::internal::table::{
    COLUMNS_TABLE, STORAGES_TABLE, STREAMS_TABLE, TABLES_TABLE,
};
use crate::internal::value::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// ========================================================================= //

const FORCE_CODEPAGE: &str = "_ForceCodepage";
const SUMMARY_INFORMATION: &str = "_SummaryInformation";

// ========================================================================= //

fn decode_field(field: &[u8], codepage: CodePage) -> String {
    let mut bytes = Vec::with_capacity(field.len());
    for &byte in field {
        match byte {
            0 => bytes.push(b'\n'),
            0x19 if bytes.last() == Some(&0x11) => {
                bytes.pop();
                bytes.extend_from_slice(b"\r\n");
            }
            _ => bytes.push(byte),
        }
    }
    codepage.decode(&bytes)
}

fn parse_line(mut line: &[u8], codepage: CodePage) -> Vec<String> {
    while let Some((&b'\r', rest)) = line.split_last() {
        line = rest;
    }
    line.split(|&byte| byte == b'\t')
        .map(|field| {
            let start = field.iter().position(|&b| b != b'\r');
            decode_field(&field[start.unwrap_or(field.len())..], codepage)
        })
        .collect()
}

/// Splits file contents into lines of fields.  Trailing NUL padding is
/// ignored.
fn parse_lines(data: &[u8], codepage: CodePage) -> Vec<Vec<String>> {
    let mut end = data.len();
    while end > 0 && data[end - 1] == 0 {
        end -= 1;
    }
    let data = &data[..end];
    if data.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<Vec<String>> = data
        .split(|&byte| byte == b'\n')
        .map(|line| parse_line(line, codepage))
        .collect();
    if data.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

fn is_blank(fields: &[String]) -> bool {
    fields.len() == 1 && fields[0].is_empty()
}

/// Recognizes the header of a `_ForceCodepage` file, returning the code
/// page text.  The code page usually sits on the third line, after two
/// empty lines.
fn forced_codepage<'a>(columns: &[String], types: &'a [String],
                       labels: &'a [String])
                       -> Option<&'a str> {
    if !is_blank(columns) {
        return None;
    }
    for (row, other) in [(types, labels), (labels, types)] {
        if row.len() == 2 && row[1] == FORCE_CODEPAGE && is_blank(other) {
            return Some(row[0].as_str());
        }
    }
    None
}

fn parse_int(text: &str) -> Result<i32> {
    match text.trim().parse() {
        Ok(number) => Ok(number),
        Err(_) => function_failed!("Invalid integer {:?}", text),
    }
}

// ========================================================================= //

fn escape_text(text: &str) -> String {
    text.replace("\r\n", "\u{11}\u{19}").replace('\n', "\0")
}

fn write_line<W: Write>(writer: &mut W, fields: &[String],
                        codepage: CodePage)
                        -> Result<()> {
    let line = fields.join("\t");
    writer.write_all(&codepage.encode(&line))?;
    writer.write_all(b"\r\n")?;
    Ok(())
}

fn record_fields(record: &Record, start: usize) -> Vec<String> {
    (start..=record.field_count())
        .map(|field| escape_text(&record.get_string(field)))
        .collect()
}

/// Picks the sidecar file name for a binary cell: the stream name without
/// its table prefix.
fn binary_file_name(table: &str, stream_name: Option<&str>, row: usize)
                    -> String {
    match stream_name {
        Some(name) => {
            let prefix = format!("{}.", table);
            name.strip_prefix(prefix.as_str()).unwrap_or(name).to_string()
        }
        None => format!("{}.{}", table, row),
    }
}

// ========================================================================= //

impl Database {
    /// Imports a table from an `.idt` file.  The table is created if it does
    /// not exist yet, and its rows are replaced by those of the file.
    ///
    /// Binary cells name files in a directory alongside the `.idt` file,
    /// named after it without the extension.  A `_ForceCodepage` file sets
    /// the database code page, and a `_SummaryInformation` file sets summary
    /// properties.
    pub fn import<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!("importing {:?}", path);
        let data = fs::read(path).map_err(|error| {
            Error::FunctionFailed(format!("Cannot read {:?}: {}",
                                          path,
                                          error))
        })?;
        let mut lines = parse_lines(&data, self.codepage()).into_iter();
        let columns = lines.next().unwrap_or_default();
        let types = lines.next().unwrap_or_default();
        let labels = lines.next().unwrap_or_default();

        if let Some(codepage) = forced_codepage(&columns, &types, &labels) {
            let id = parse_int(codepage)?;
            return self.force_codepage(id);
        }
        if columns.len() != types.len() {
            function_failed!("{:?} names {} columns but gives {} types",
                             path,
                             columns.len(),
                             types.len());
        }
        let records: Vec<Vec<String>> =
            lines.filter(|fields| !is_blank(fields)).collect();
        for (index, fields) in records.iter().enumerate() {
            if fields.len() != columns.len() {
                function_failed!("Row {} of {:?} has {} fields, expected {}",
                                 index + 1,
                                 path,
                                 fields.len(),
                                 columns.len());
            }
        }
        let table_name = match labels.first() {
            Some(name) if !name.is_empty() => name.as_str(),
            _ => function_failed!("{:?} does not name a table", path),
        };

        if table_name == SUMMARY_INFORMATION {
            return self.import_summary_info(&records, columns.len());
        }
        if !self.has_table(table_name) {
            let statement = create_statement(table_name,
                                             &columns,
                                             &types,
                                             &labels[1..])?;
            if let Err(error) = self.execute(statement) {
                function_failed!("Cannot create table {:?}: {}",
                                 table_name,
                                 error);
            }
        }
        let stream_dir = path.with_extension("");
        let mut rows = Vec::with_capacity(records.len());
        for fields in records.iter() {
            rows.push(build_record(&types, fields, &stream_dir)?);
        }
        self.replace_rows(table_name, &rows)?;
        tracing::debug!("imported {} rows into {:?}", rows.len(), table_name);
        Ok(())
    }

    fn import_summary_info(&mut self, records: &[Vec<String>],
                           num_columns: usize)
                           -> Result<()> {
        let mut summary_info = self.summary_info()?;
        for fields in records.iter() {
            for pair in fields[..num_columns].chunks(2) {
                if let [property, value] = pair {
                    summary_info.set_property_text(property, value)?;
                }
            }
        }
        self.set_summary_info(&summary_info)
    }

    fn replace_rows(&mut self, table_name: &str, rows: &[Record])
                    -> Result<()> {
        let mut view = self.open_table_view(table_name)?;
        let result: Result<()> = (|| {
            let (num_rows, _) = view.get_dimensions(self)?;
            for row in (0..num_rows).rev() {
                view.delete_row(self, row)?;
            }
            for record in rows.iter() {
                view.insert_row(self, record, None, false)?;
            }
            Ok(())
        })();
        view.delete(self);
        result
    }

    /// Writes a table in `.idt` form.  Binary cells hold the name of their
    /// sidecar file, but the files themselves are not written; use
    /// `export_to_folder` for that.
    pub fn export<W: Write>(&mut self, table_name: &str, writer: W)
                            -> Result<()> {
        self.export_table(table_name, writer, None)
    }

    /// Writes `<folder>/<table>.idt`, plus one file per binary cell under
    /// `<folder>/<table>/`.  Returns the path of the `.idt` file.
    pub fn export_to_folder<P: AsRef<Path>>(&mut self, table_name: &str,
                                            folder: P)
                                            -> Result<PathBuf> {
        let folder = folder.as_ref();
        let path = folder.join(format!("{}.idt", table_name));
        let file = fs::File::create(&path)?;
        self.export_table(table_name, file, Some(folder))?;
        Ok(path)
    }

    /// Writes a table as SQL: a `CREATE TABLE` statement and then one
    /// `INSERT` statement per row, listing only its non-null cells.  Catalog
    /// and pseudo-tables get no `CREATE TABLE`.  Binary cells are written
    /// as empty strings.
    pub fn export_sql<W: Write>(&mut self, table_name: &str, mut writer: W)
                                -> Result<()> {
        let builtin = [TABLES_TABLE, COLUMNS_TABLE, STREAMS_TABLE,
                       STORAGES_TABLE]
            .contains(&table_name);
        if !builtin && !self.has_table(table_name) {
            invalid_table!("No table named {:?}", table_name);
        }
        let mut query = self.open_query(Select::table(table_name))?;
        let columns: Vec<Column> = query
            .columns(self)?
            .iter()
            .map(|info| info.column().clone())
            .collect();
        if !builtin {
            let create = CreateTable::new(table_name).columns(columns.clone());
            writeln!(writer, "{}", create)?;
        }
        let count = query.iterate(self, None, |record| {
            let mut names = Vec::with_capacity(columns.len());
            let mut values = Vec::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value = match record.value(index + 1) {
                    None | Some(Value::Null) => continue,
                    Some(Value::Stream(_)) => Value::Str(String::new()),
                    Some(value) => value.clone(),
                };
                names.push(column.name());
                values.push(value);
            }
            let insert = Insert::into(table_name).columns(&names).row(values);
            writeln!(writer, "{}", insert)?;
            Ok(())
        })?;
        tracing::debug!("wrote {} rows of {:?} as SQL", count, table_name);
        Ok(())
    }

    fn export_table<W: Write>(&mut self, table_name: &str, mut writer: W,
                              folder: Option<&Path>)
                              -> Result<()> {
        tracing::debug!("exporting {:?}", table_name);
        let codepage = self.codepage();
        if table_name == FORCE_CODEPAGE {
            let text = format!("\r\n\r\n{}\t{}\r\n", codepage.id(),
                               FORCE_CODEPAGE);
            writer.write_all(text.as_bytes())?;
            return Ok(());
        }
        if table_name == SUMMARY_INFORMATION {
            return self.export_summary_info(writer);
        }
        if !self.has_table(table_name) {
            invalid_table!("No table named {:?}", table_name);
        }

        let mut query = self.open_query(Select::table(table_name))?;
        let names = query.get_column_info(self, ColumnInfoKind::Names)?;
        let types = query.get_column_info(self, ColumnInfoKind::Types)?;
        let keys = self.get_primary_keys(table_name)?;
        write_line(&mut writer, &record_fields(&names, 1), codepage)?;
        write_line(&mut writer, &record_fields(&types, 1), codepage)?;
        write_line(&mut writer, &record_fields(&keys, 0), codepage)?;

        let stream_dir = folder.map(|folder| folder.join(table_name));
        let mut row = 0;
        query.iterate(self, None, |record| {
            row += 1;
            let mut fields = Vec::with_capacity(record.field_count());
            for field in 1..=record.field_count() {
                match record.value(field) {
                    Some(Value::Stream(stream)) => {
                        let name =
                            binary_file_name(table_name, stream.name(), row);
                        if let Some(ref dir) = stream_dir {
                            fs::create_dir_all(dir)?;
                            fs::write(dir.join(&name), stream.data())?;
                        }
                        fields.push(name);
                    }
                    _ => fields.push(escape_text(&record.get_string(field))),
                }
            }
            write_line(&mut writer, &fields, codepage)
        })?;
        tracing::debug!("exported {} rows from {:?}", row, table_name);
        Ok(())
    }

    fn export_summary_info<W: Write>(&mut self, mut writer: W) -> Result<()> {
        let summary_info = self.summary_info()?;
        let codepage = self.codepage();
        let header = [
            vec!["PropertyId".to_string(), "Value".to_string()],
            vec!["i2".to_string(), "l255".to_string()],
            vec![SUMMARY_INFORMATION.to_string(), "PropertyId".to_string()],
        ];
        for fields in header.iter() {
            write_line(&mut writer, fields, codepage)?;
        }
        for (property, value) in summary_info.text_rows() {
            write_line(&mut writer,
                       &[property.to_string(), escape_text(&value)],
                       codepage)?;
        }
        Ok(())
    }
}

// ========================================================================= //

fn create_statement(table_name: &str, columns: &[String], types: &[String],
                    keys: &[String])
                    -> Result<CreateTable> {
    let mut statement = CreateTable::new(table_name);
    for (name, code) in columns.iter().zip(types.iter()) {
        let is_key = keys.iter().any(|key| key == name);
        match Column::from_type_code(name, code, is_key) {
            Some(column) => statement = statement.column(column),
            None => function_failed!("Column {:?} has invalid type {:?}",
                                     name,
                                     code),
        }
    }
    Ok(statement)
}

fn build_record(types: &[String], fields: &[String], stream_dir: &Path)
                -> Result<Record> {
    let mut record = Record::new(fields.len());
    for (index, (code, text)) in types.iter().zip(fields.iter()).enumerate() {
        let field = index + 1;
        let letter = code.chars().next().unwrap_or(' ').to_ascii_lowercase();
        match letter {
            's' | 'l' => record.set_string(field, text)?,
            'i' => {
                if !text.is_empty() {
                    record.set_int(field, parse_int(text)?)?;
                }
            }
            'v' => {
                if !text.is_empty() {
                    let file = stream_dir.join(text);
                    if let Err(error) =
                        record.load_stream_from_file(field, &file)
                    {
                        function_failed!("Cannot load {:?}: {}", file, error);
                    }
                }
            }
            _ => function_failed!("Unhandled column type {:?}", code),
        }
    }
    Ok(record)
}

// ========================================================================= //

#[cfg(test)]
mod tests {
    use super::{forced_codepage, parse_lines};
    use crate::internal::codepage::CodePage;
    use crate::internal::column::{Column, ColumnType};

    fn type_for_code(code: &str) -> Option<ColumnType> {
        Column::from_type_code("", code, false).map(|column| column.coltype())
    }

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|field| field.to_string()).collect()
    }

    #[test]
    fn parse_header_and_rows() {
        let data = b"Property\tValue\r\ns72\tl0\r\n_Property\tProperty\r\n\
                     ProductCode\t{GUID}\r\n";
        let lines = parse_lines(data, CodePage::Utf8);
        assert_eq!(lines,
                   vec![
                       strings(&["Property", "Value"]),
                       strings(&["s72", "l0"]),
                       strings(&["_Property", "Property"]),
                       strings(&["ProductCode", "{GUID}"]),
                   ]);
    }

    #[test]
    fn parse_control_sequences() {
        let data = b"a\0b\tc\x11\x19d\r\n\0\0";
        let lines = parse_lines(data, CodePage::Utf8);
        assert_eq!(lines, vec![strings(&["a\nb", "c\r\nd"])]);
    }

    #[test]
    fn recognize_force_codepage() {
        let lines = parse_lines(b"\r\n\r\n1252\t_ForceCodepage\r\n",
                                CodePage::Utf8);
        assert_eq!(lines.len(), 3);
        assert_eq!(forced_codepage(&lines[0], &lines[1], &lines[2]),
                   Some("1252"));
        let lines = parse_lines(b"A\tB\r\ns72\ts72\r\nT\tA\r\n",
                                CodePage::Utf8);
        assert_eq!(forced_codepage(&lines[0], &lines[1], &lines[2]), None);
    }

    #[test]
    fn type_codes() {
        assert_eq!(type_for_code("s72"), Some(ColumnType::Str(72)));
        assert_eq!(type_for_code("L0"), Some(ColumnType::Str(0)));
        assert_eq!(type_for_code("i2"), Some(ColumnType::Int16));
        assert_eq!(type_for_code("I4"), Some(ColumnType::Int32));
        assert_eq!(type_for_code("i3"), None);
        assert_eq!(type_for_code("v0"), Some(ColumnType::Binary));
        assert_eq!(type_for_code("x1"), None);
    }
}

// ========================================================================= //
