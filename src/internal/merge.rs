use crate::internal::column::Column;
use crate::internal::database::Database;
use crate::internal::error::Result;
use crate::internal::expr::Expr;
use crate::internal::query::{CreateTable, Insert, Select};
use crate::internal::record::Record;
use crate::internal::table::TABLES_TABLE;
use crate::internal::value::Value;

// ========================================================================= //

const ERROR_TABLE_COLUMN: &str = "Table";
const ERROR_COUNT_COLUMN: &str = "NumRowMergeConflicts";

// ========================================================================= //

/// Rows of one source table waiting to be merged into the target.
struct MergeTable {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Record>,
    conflicts: usize,
}

/// Returns true if two column type codes may be merged: string-like columns
/// of the same nullability match regardless of localization, and anything
/// else must match exactly.
fn types_match(code1: &str, code2: &str) -> bool {
    let letter = |code: &str| code.chars().next();
    match (letter(code1), letter(code2)) {
        (Some('s' | 'l'), Some('s' | 'l')) => true,
        (Some('S' | 'L'), Some('S' | 'L')) => true,
        _ => code1 == code2,
    }
}

fn key_condition(columns: &[Column], record: &Record) -> Option<Expr> {
    let mut condition: Option<Expr> = None;
    for (index, column) in columns.iter().enumerate() {
        if !column.is_primary_key() {
            continue;
        }
        let key = Expr::col(column.name());
        let test = match record.value(index + 1) {
            Some(Value::Int(number)) => key.eq(Expr::integer(*number)),
            Some(Value::Str(string)) => key.eq(Expr::string(string.as_str())),
            _ => key.is_null(),
        };
        condition = Some(match condition {
            Some(previous) => previous.and(test),
            None => test,
        });
    }
    condition
}

impl Database {
    fn verify_merge_schema(&self, source: &Database, table_name: &str)
                           -> Result<()> {
        let target_columns = self.columns(table_name)?;
        let source_columns = source.columns(table_name)?;
        for (target, source) in target_columns.iter().zip(source_columns.iter())
        {
            if target.name() != source.name() {
                datatype_mismatch!("Column {:?} of table {:?} does not match \
                                    {:?}",
                                   source.name(),
                                   table_name,
                                   target.name());
            }
        }
        for (target, source) in target_columns.iter().zip(source_columns.iter())
        {
            if !types_match(&target.type_code(), &source.type_code()) {
                datatype_mismatch!("Column {:?} of table {:?} has type {} \
                                    but is merged from type {}",
                                   target.name(),
                                   table_name,
                                   target.type_code(),
                                   source.type_code());
            }
        }
        let target_keys = self.get_primary_keys(table_name)?;
        let source_keys = source.get_primary_keys(table_name)?;
        if target_keys.field_count() != source_keys.field_count() {
            datatype_mismatch!("Table {:?} has {} key columns but is merged \
                                from {}",
                               table_name,
                               target_keys.field_count(),
                               source_keys.field_count());
        }
        for field in 1..=target_keys.field_count() {
            if target_keys.get_string(field) != source_keys.get_string(field) {
                datatype_mismatch!("Key column {} of table {:?} does not \
                                    match",
                                   field,
                                   table_name);
            }
        }
        Ok(())
    }

    fn gather_merge_table(&mut self, source: &mut Database, name: &str)
                          -> Result<MergeTable> {
        let exists = self.has_table(name);
        if exists {
            self.verify_merge_schema(source, name)?;
        }
        let columns = source.columns(name)?;
        let mut table = MergeTable {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
            conflicts: 0,
        };
        for record in source.select_rows(Select::table(name))? {
            if exists {
                if let Some(condition) = key_condition(&table.columns, &record)
                {
                    let select = Select::table(name).with(condition);
                    let existing = self.select_rows(select)?;
                    if let Some(existing) = existing.first() {
                        if !record.compare(existing) {
                            tracing::trace!("merge conflict in {:?}", name);
                            table.conflicts += 1;
                        }
                        continue;
                    }
                }
            }
            table.rows.push(record);
        }
        Ok(table)
    }

    fn apply_merge_table(&mut self, table: &MergeTable) -> Result<()> {
        if !self.has_table(&table.name) {
            let create = CreateTable::new(&table.name)
                .columns(table.columns.clone());
            if let Err(error) = self.execute(create) {
                function_failed!("Cannot create table {:?}: {}",
                                 table.name,
                                 error);
            }
        }
        let mut view = self.open_table_view(&table.name)?;
        let mut result = Ok(());
        for record in table.rows.iter() {
            result = view.insert_row(self, record, None, false);
            if result.is_err() {
                break;
            }
        }
        view.delete(self);
        result
    }

    fn record_merge_conflicts(&mut self, error_table: &str, table_name: &str,
                              conflicts: usize)
                              -> Result<()> {
        if !self.has_table(error_table) {
            self.execute(
                CreateTable::new(error_table)
                    .column(Column::build(ERROR_TABLE_COLUMN)
                                .primary_key()
                                .string(255))
                    .column(Column::build(ERROR_COUNT_COLUMN).int16()),
            )?;
        }
        let count = i32::try_from(conflicts).unwrap_or(i32::MAX);
        self.execute(
            Insert::into(error_table)
                .columns(&[ERROR_TABLE_COLUMN, ERROR_COUNT_COLUMN])
                .row(vec![Value::from(table_name), Value::Int(count)]),
        )
    }

    /// Merges every table of `source` into this database.
    ///
    /// Tables are compared row by row on their primary keys.  A source row
    /// whose key is new is added, and one identical to the existing row is
    /// skipped.  A row that differs is a conflict: any table with conflicts
    /// is left untouched and gets a row in `error_table` (if one is given)
    /// holding its conflict count.  The merge still adds the rows of the
    /// other tables, but fails with `FunctionFailed` if any table had
    /// conflicts.  A table whose columns or keys differ from the target's
    /// fails the whole merge with `DatatypeMismatch` before anything is
    /// changed.
    pub fn merge(&mut self, source: &mut Database, error_table: Option<&str>)
                 -> Result<()> {
        if error_table == Some("") {
            invalid_table!("Merge error table name must not be empty");
        }
        let names: Vec<String> = source
            .select_rows(Select::table(TABLES_TABLE))?
            .iter()
            .map(|record| record.get_string(1))
            .collect();
        tracing::debug!("merging {} tables", names.len());
        let mut tables = Vec::with_capacity(names.len());
        for name in names.iter() {
            tables.push(self.gather_merge_table(source, name)?);
        }

        let mut num_conflicted = 0;
        for table in tables.iter() {
            if table.conflicts > 0 {
                tracing::debug!("table {:?} has {} merge conflicts",
                                table.name,
                                table.conflicts);
                num_conflicted += 1;
                if let Some(error_table) = error_table {
                    self.record_merge_conflicts(error_table,
                                                &table.name,
                                                table.conflicts)?;
                }
            } else {
                tracing::debug!("merging {} rows into {:?}",
                                table.rows.len(),
                                table.name);
                self.apply_merge_table(table)?;
            }
        }
        if num_conflicted > 0 {
            function_failed!("Merge conflicts in {} table(s)", num_conflicted);
        }
        Ok(())
    }
}

// ========================================================================= //


// ========================================================================= //
