use crate::internal::column::Column;
use crate::internal::database::Database;
use crate::internal::error::Result;
use crate::internal::expr::Expr;
use crate::internal::record::Record;
use crate::internal::storage::StreamHandle;
use crate::internal::table::Table;
use crate::internal::value::Value;
use crate::internal::view::{ColumnInfo, View};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

// ========================================================================= //

fn quoted_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("`{}`", name))
        .collect::<Vec<String>>()
        .join(", ")
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

// ========================================================================= //

/// A database query to alter an existing table: add a column to it, or hold
/// it in memory, or release a hold.
///
/// A column added together with a hold is temporary, and it is removed again
/// once the table's last hold is freed.  Freeing the last hold on a temporary
/// table with no rows drops the table.
pub struct Alter {
    table_name: String,
    column: Option<Column>,
    hold: bool,
    free: bool,
}

impl Alter {
    /// Starts building a query that will alter the specified table.
    pub fn table(table_name: &str) -> Alter {
        Alter {
            table_name: table_name.to_string(),
            column: None,
            hold: false,
            free: false,
        }
    }

    /// Adds a new column to the end of the table.
    pub fn add_column(mut self, column: Column) -> Alter {
        self.column = Some(column);
        self
    }

    /// Places a hold on the table.
    pub fn hold(mut self) -> Alter {
        self.hold = true;
        self
    }

    /// Releases one hold on the table.
    pub fn free(mut self) -> Alter {
        self.free = true;
        self
    }
}

impl fmt::Display for Alter {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "ALTER TABLE `{}`", self.table_name)?;
        if let Some(ref column) = self.column {
            write!(formatter, " ADD {}", column.sql_definition())?;
        }
        if self.hold {
            formatter.write_str(" HOLD")?;
        }
        if self.free {
            formatter.write_str(" FREE")?;
        }
        Ok(())
    }
}

// ========================================================================= //

/// A database query to create a new table.
pub struct CreateTable {
    table_name: String,
    columns: Vec<Column>,
    temporary: bool,
}

impl CreateTable {
    /// Starts building a query that will create a table with the given name.
    pub fn new(table_name: &str) -> CreateTable {
        CreateTable {
            table_name: table_name.to_string(),
            columns: Vec::new(),
            temporary: false,
        }
    }

    /// Adds a column to the table.
    pub fn column(mut self, column: Column) -> CreateTable {
        self.columns.push(column);
        self
    }

    /// Adds multiple columns to the table.
    pub fn columns(mut self, columns: Vec<Column>) -> CreateTable {
        self.columns.extend(columns);
        self
    }

    /// Makes the table exist in memory only; it is never written to disk.
    pub fn temporary(mut self) -> CreateTable {
        self.temporary = true;
        self
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let definitions: Vec<String> =
            self.columns.iter().map(Column::sql_definition).collect();
        let keys: Vec<String> = self
            .columns
            .iter()
            .filter(|column| column.is_primary_key())
            .map(|column| column.name().to_string())
            .collect();
        write!(formatter,
               "CREATE TABLE `{}` ( {} PRIMARY KEY {})",
               self.table_name,
               definitions.join(", "),
               quoted_names(&keys))?;
        if self.temporary {
            formatter.write_str(" HOLD")?;
        }
        Ok(())
    }
}

// ========================================================================= //

/// A database query to delete existing rows.
pub struct Delete {
    table_name: String,
    condition: Option<Expr>,
}

impl Delete {
    /// Starts building a query that will delete rows from the specified table.
    pub fn from(table_name: &str) -> Delete {
        Delete { table_name: table_name.to_string(), condition: None }
    }

    /// Adds a restriction on which rows should be deleted by the query; only
    /// rows that match the given boolean expression will be deleted.  (This
    /// method would have been called `where()`, to better match SQL, but
    /// `where` is a reserved word in Rust.)
    pub fn with(mut self, condition: Expr) -> Delete {
        self.condition = and_condition(self.condition, condition);
        self
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "DELETE FROM `{}`", self.table_name)?;
        if let Some(ref condition) = self.condition {
            write!(formatter, " WHERE {}", condition)?;
        }
        Ok(())
    }
}

fn and_condition(existing: Option<Expr>, condition: Expr) -> Option<Expr> {
    Some(match existing {
        Some(existing) => existing.and(condition),
        None => condition,
    })
}

// ========================================================================= //

/// A database query to insert new rows.
///
/// If the query is executed with a parameter record, that record is inserted
/// as an additional row.
pub struct Insert {
    table_name: String,
    column_names: Vec<String>,
    new_rows: Vec<Vec<Value>>,
    temporary: bool,
}

impl Insert {
    /// Starts building a query that will insert rows into the specified table.
    pub fn into(table_name: &str) -> Insert {
        Insert {
            table_name: table_name.to_string(),
            column_names: Vec::new(),
            new_rows: Vec::new(),
            temporary: false,
        }
    }

    /// Names the columns that the inserted values are for, in order.  By
    /// default every column of the table is given a value.
    pub fn columns(mut self, column_names: &[&str]) -> Insert {
        self.column_names = to_strings(column_names);
        self
    }

    /// Adds a new row to be inserted into the table.
    pub fn row(mut self, values: Vec<Value>) -> Insert {
        self.new_rows.push(values);
        self
    }

    /// Adds multiple new rows to be inserted into the table.
    pub fn rows(mut self, mut rows: Vec<Vec<Value>>) -> Insert {
        self.new_rows.append(&mut rows);
        self
    }

    /// Makes the inserted rows temporary; they are never written to disk.
    pub fn temporary(mut self) -> Insert {
        self.temporary = true;
        self
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "INSERT INTO `{}`", self.table_name)?;
        if !self.column_names.is_empty() {
            write!(formatter, " ({})", quoted_names(&self.column_names))?;
        }
        let rows: Vec<String> = self
            .new_rows
            .iter()
            .map(|row| {
                let values: Vec<String> =
                    row.iter().map(Value::to_sql).collect();
                format!("({})", values.join(", "))
            })
            .collect();
        if !rows.is_empty() {
            write!(formatter, " VALUES {}", rows.join(", "))?;
        }
        if self.temporary {
            formatter.write_str(" TEMPORARY")?;
        }
        Ok(())
    }
}

// ========================================================================= //

/// A database query to select rows.
pub struct Select {
    table_name: String,
    condition: Option<Expr>,
    column_names: Vec<String>,
    order_by: Vec<String>,
}

impl Select {
    /// Starts building a query that will select rows from the specified table.
    pub fn table(table_name: &str) -> Select {
        Select {
            table_name: table_name.to_string(),
            condition: None,
            column_names: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Transforms the selected rows to only include the specified columns, in
    /// the order given.
    pub fn columns(mut self, column_names: &[&str]) -> Select {
        self.column_names = to_strings(column_names);
        self
    }

    /// Adds a restriction on which rows should be selected by the query; only
    /// rows that match the given boolean expression will be returned.  (This
    /// method would have been called `where()`, to better match SQL, but
    /// `where` is a reserved word in Rust.)
    pub fn with(mut self, condition: Expr) -> Select {
        self.condition = and_condition(self.condition, condition);
        self
    }

    /// Sorts the selected rows by the given columns.
    pub fn order_by(mut self, column_names: &[&str]) -> Select {
        self.order_by = to_strings(column_names);
        self
    }
}

impl fmt::Display for Select {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("SELECT ")?;
        if self.column_names.is_empty() {
            formatter.write_str("*")?;
        } else {
            formatter.write_str(&quoted_names(&self.column_names))?;
        }
        write!(formatter, " FROM `{}`", self.table_name)?;
        if let Some(ref condition) = self.condition {
            write!(formatter, " WHERE {}", condition)?;
        }
        if !self.order_by.is_empty() {
            write!(formatter, " ORDER BY {}", quoted_names(&self.order_by))?;
        }
        Ok(())
    }
}

// ========================================================================= //

/// A database query to update existing rows.
pub struct Update {
    table_name: String,
    updates: Vec<(String, Value)>,
    condition: Option<Expr>,
}

impl Update {
    /// Starts building a query that will update rows in the specified table.
    pub fn table(table_name: &str) -> Update {
        Update {
            table_name: table_name.to_string(),
            updates: Vec::new(),
            condition: None,
        }
    }

    /// Adds a column value to be set by the query.
    pub fn set<V: Into<Value>>(mut self, column_name: &str, value: V)
                               -> Update {
        self.updates.push((column_name.to_string(), value.into()));
        self
    }

    /// Adds a restriction on which rows should be updated by the query; only
    /// rows that match the given boolean expression will be updated.  (This
    /// method would have been called `where()`, to better match SQL, but
    /// `where` is a reserved word in Rust.)
    pub fn with(mut self, condition: Expr) -> Update {
        self.condition = and_condition(self.condition, condition);
        self
    }
}

impl fmt::Display for Update {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let updates: Vec<String> = self
            .updates
            .iter()
            .map(|(name, value)| format!("`{}` = {}", name, value.to_sql()))
            .collect();
        write!(formatter,
               "UPDATE `{}` SET {}",
               self.table_name,
               updates.join(", "))?;
        if let Some(ref condition) = self.condition {
            write!(formatter, " WHERE {}", condition)?;
        }
        Ok(())
    }
}

// ========================================================================= //

/// Any of the structured query statements.
pub enum Statement {
    /// An `ALTER TABLE` statement.
    Alter(Alter),
    /// A `CREATE TABLE` statement.
    CreateTable(CreateTable),
    /// A `DELETE` statement.
    Delete(Delete),
    /// An `INSERT` statement.
    Insert(Insert),
    /// A `SELECT` statement.
    Select(Select),
    /// An `UPDATE` statement.
    Update(Update),
}

impl fmt::Display for Statement {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Statement::Alter(ref statement) => statement.fmt(formatter),
            Statement::CreateTable(ref statement) => statement.fmt(formatter),
            Statement::Delete(ref statement) => statement.fmt(formatter),
            Statement::Insert(ref statement) => statement.fmt(formatter),
            Statement::Select(ref statement) => statement.fmt(formatter),
            Statement::Update(ref statement) => statement.fmt(formatter),
        }
    }
}

impl From<Alter> for Statement {
    fn from(statement: Alter) -> Statement {
        Statement::Alter(statement)
    }
}

impl From<CreateTable> for Statement {
    fn from(statement: CreateTable) -> Statement {
        Statement::CreateTable(statement)
    }
}

impl From<Delete> for Statement {
    fn from(statement: Delete) -> Statement {
        Statement::Delete(statement)
    }
}

impl From<Insert> for Statement {
    fn from(statement: Insert) -> Statement {
        Statement::Insert(statement)
    }
}

impl From<Select> for Statement {
    fn from(statement: Select) -> Statement {
        Statement::Select(statement)
    }
}

impl From<Update> for Statement {
    fn from(statement: Update) -> Statement {
        Statement::Update(statement)
    }
}

// ========================================================================= //

fn view_column_names(db: &mut Database, view: &dyn View)
                     -> Result<Vec<String>> {
    let (_, num_cols) = view.get_dimensions(db)?;
    let mut names = Vec::with_capacity(num_cols);
    for col in 1..=num_cols {
        names.push(view.get_column_info(db, col)?.name().to_string());
    }
    Ok(names)
}

fn column_number(names: &[String], table_name: &str, name: &str)
                 -> Result<usize> {
    match names.iter().position(|existing| existing == name) {
        Some(index) => Ok(index + 1),
        None => bad_query_syntax!("Table {:?} has no column named {:?}",
                                  table_name,
                                  name),
    }
}

fn filtered_view(db: &mut Database, table_name: &str,
                 condition: Option<Expr>, order_by: Vec<String>)
                 -> Result<Box<dyn View>> {
    let inner = db.open_table_view(table_name)?;
    let names = view_column_names(db, inner.as_ref())?;
    if let Some(ref condition) = condition {
        for name in condition.column_names() {
            column_number(&names, table_name, name)?;
        }
    }
    for name in order_by.iter() {
        column_number(&names, table_name, name)?;
    }
    if condition.is_none() && order_by.is_empty() {
        return Ok(inner);
    }
    Ok(Box::new(WhereView {
        inner,
        names,
        condition,
        order_by,
        rows: Vec::new(),
    }))
}

/// Turns a statement into a tree of views.
pub(crate) fn build_view(db: &mut Database, statement: Statement)
                         -> Result<Box<dyn View>> {
    match statement {
        Statement::Alter(alter) => {
            if !db.has_table(&alter.table_name) {
                bad_query_syntax!("Table {:?} does not exist",
                                  alter.table_name);
            }
            let action = match (alter.column, alter.hold, alter.free) {
                (Some(column), hold, false) => AlterAction::Add(column, hold),
                (None, true, false) => AlterAction::Hold,
                (None, false, true) => AlterAction::Free,
                _ => bad_query_syntax!("Alter of {:?} needs exactly one \
                                        action",
                                       alter.table_name),
            };
            Ok(Box::new(AlterView { table_name: alter.table_name, action }))
        }
        Statement::CreateTable(create) => {
            if !Table::is_valid_name(&create.table_name) {
                bad_query_syntax!("{:?} is not a valid table name",
                                  create.table_name);
            }
            if db.has_table(&create.table_name) {
                bad_query_syntax!("Table {:?} already exists",
                                  create.table_name);
            }
            if create.columns.is_empty() {
                bad_query_syntax!("Table {:?} must have at least one column",
                                  create.table_name);
            }
            if !create.columns.iter().any(Column::is_primary_key) {
                bad_query_syntax!("Table {:?} must have a primary key",
                                  create.table_name);
            }
            let mut seen = HashSet::new();
            for column in create.columns.iter() {
                if !seen.insert(column.name()) {
                    bad_query_syntax!("Table {:?} has more than one column \
                                       named {:?}",
                                      create.table_name,
                                      column.name());
                }
            }
            Ok(Box::new(CreateView {
                table_name: create.table_name,
                columns: create.columns,
                temporary: create.temporary,
            }))
        }
        Statement::Delete(delete) => {
            let inner = filtered_view(db,
                                      &delete.table_name,
                                      delete.condition,
                                      Vec::new())?;
            Ok(Box::new(DeleteView { inner }))
        }
        Statement::Insert(insert) => {
            let inner = db.open_table_view(&insert.table_name)?;
            let names = view_column_names(db, inner.as_ref())?;
            let columns = if insert.column_names.is_empty() {
                (1..=names.len()).collect::<Vec<usize>>()
            } else {
                let mut columns = Vec::new();
                for name in insert.column_names.iter() {
                    columns.push(column_number(&names,
                                               &insert.table_name,
                                               name)?);
                }
                columns
            };
            for row in insert.new_rows.iter() {
                if row.len() != columns.len() {
                    bad_query_syntax!("Insert into {:?} gives {} values \
                                       for {} columns",
                                      insert.table_name,
                                      row.len(),
                                      columns.len());
                }
            }
            Ok(Box::new(InsertView {
                inner,
                num_columns: names.len(),
                columns,
                rows: insert.new_rows,
                temporary: insert.temporary,
            }))
        }
        Statement::Select(select) => {
            let inner = filtered_view(db,
                                      &select.table_name,
                                      select.condition,
                                      select.order_by)?;
            if select.column_names.is_empty() {
                return Ok(inner);
            }
            let names = view_column_names(db, inner.as_ref())?;
            let mut columns = Vec::with_capacity(select.column_names.len());
            for name in select.column_names.iter() {
                columns.push(column_number(&names, &select.table_name, name)?);
            }
            Ok(Box::new(SelectView { inner, columns }))
        }
        Statement::Update(update) => {
            let inner = filtered_view(db,
                                      &update.table_name,
                                      update.condition,
                                      Vec::new())?;
            let names = view_column_names(db, inner.as_ref())?;
            let mut updates = Vec::with_capacity(update.updates.len());
            for (name, value) in update.updates.into_iter() {
                let col = column_number(&names, &update.table_name, &name)?;
                updates.push((col, value));
            }
            Ok(Box::new(UpdateView { inner, updates }))
        }
    }
}

// ========================================================================= //

/// Filters (and optionally sorts) the rows of an inner view.  The matching
/// row numbers are materialized at execute time.
struct WhereView {
    inner: Box<dyn View>,
    names: Vec<String>,
    condition: Option<Expr>,
    order_by: Vec<String>,
    rows: Vec<usize>,
}

impl WhereView {
    fn inner_row(&self, row: usize) -> Result<usize> {
        match self.rows.get(row) {
            Some(&inner_row) => Ok(inner_row),
            None => no_more_items!("No row {} (view has {} rows)",
                                   row,
                                   self.rows.len()),
        }
    }

    fn sort_rows(&mut self, db: &mut Database) -> Result<()> {
        let mut cols = Vec::with_capacity(self.order_by.len());
        for name in self.order_by.iter() {
            cols.push(column_number(&self.names, "<view>", name)?);
        }
        let mut keyed = Vec::with_capacity(self.rows.len());
        for &row in self.rows.iter() {
            let record = self.inner.get_row(db, row)?;
            let keys: Vec<Value> = cols
                .iter()
                .map(|&col| record.value(col).cloned().unwrap_or(Value::Null))
                .collect();
            keyed.push((keys, row));
        }
        keyed.sort_by(|(keys1, _), (keys2, _)| {
            keys1.partial_cmp(keys2).unwrap_or(Ordering::Equal)
        });
        self.rows = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }
}

impl View for WhereView {
    fn fetch_int(&self, db: &mut Database, row: usize, col: usize)
                 -> Result<u32> {
        let row = self.inner_row(row)?;
        self.inner.fetch_int(db, row, col)
    }

    fn fetch_stream(&self, db: &mut Database, row: usize, col: usize)
                    -> Result<StreamHandle> {
        let row = self.inner_row(row)?;
        self.inner.fetch_stream(db, row, col)
    }

    fn get_row(&self, db: &mut Database, row: usize) -> Result<Record> {
        let row = self.inner_row(row)?;
        self.inner.get_row(db, row)
    }

    fn set_row(&mut self, db: &mut Database, row: usize, record: &Record,
               mask: u32)
               -> Result<()> {
        let row = self.inner_row(row)?;
        self.inner.set_row(db, row, record, mask)
    }

    fn delete_row(&mut self, db: &mut Database, row: usize) -> Result<()> {
        let inner_row = self.inner_row(row)?;
        self.inner.delete_row(db, inner_row)?;
        self.rows.remove(row);
        for other in self.rows.iter_mut() {
            if *other > inner_row {
                *other -= 1;
            }
        }
        Ok(())
    }

    fn execute(&mut self, db: &mut Database, params: Option<&Record>)
               -> Result<()> {
        self.inner.execute(db, params)?;
        let (num_rows, _) = self.inner.get_dimensions(db)?;
        self.rows.clear();
        for row in 0..num_rows {
            let matches = match self.condition {
                None => true,
                Some(ref condition) => {
                    let record = self.inner.get_row(db, row)?;
                    let names = &self.names;
                    let lookup = |name: &str| -> Value {
                        names
                            .iter()
                            .position(|existing| existing == name)
                            .and_then(|index| record.value(index + 1))
                            .cloned()
                            .unwrap_or(Value::Null)
                    };
                    condition.matches(&lookup)
                }
            };
            if matches {
                self.rows.push(row);
            }
        }
        if !self.order_by.is_empty() {
            self.sort_rows(db)?;
        }
        tracing::trace!("filter matched {} of {} rows",
                        self.rows.len(),
                        num_rows);
        Ok(())
    }

    fn close(&mut self, db: &mut Database) -> Result<()> {
        self.rows.clear();
        self.inner.close(db)
    }

    fn get_dimensions(&self, db: &mut Database) -> Result<(usize, usize)> {
        let (_, num_cols) = self.inner.get_dimensions(db)?;
        Ok((self.rows.len(), num_cols))
    }

    fn get_column_info(&self, db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        self.inner.get_column_info(db, col)
    }

    fn delete(self: Box<Self>, db: &mut Database) {
        self.inner.delete(db);
    }

    fn sort(&mut self, db: &mut Database, columns: &[String]) -> Result<()> {
        for name in columns.iter() {
            column_number(&self.names, "<view>", name)?;
        }
        self.order_by = columns.to_vec();
        self.sort_rows(db)
    }
}

// ========================================================================= //

/// Projects a subset of an inner view's columns.
struct SelectView {
    inner: Box<dyn View>,
    columns: Vec<usize>,
}

impl SelectView {
    fn inner_col(&self, col: usize) -> Result<usize> {
        match col.checked_sub(1).and_then(|index| self.columns.get(index)) {
            Some(&inner_col) => Ok(inner_col),
            None => invalid_parameter!(
                "Column {} is out of range (view has {} columns)",
                col,
                self.columns.len()
            ),
        }
    }

    fn widen(&self, db: &mut Database, record: &Record, mask: u32)
             -> Result<(Record, u32)> {
        let (_, num_cols) = self.inner.get_dimensions(db)?;
        let mut inner_record = Record::new(num_cols);
        let mut inner_mask = 0;
        for (index, &inner_col) in self.columns.iter().enumerate() {
            if index < 32 && (mask & (1 << index)) == 0 {
                continue;
            }
            let value = record.value(index + 1).cloned().unwrap_or(Value::Null);
            inner_record.set_value(inner_col, value)?;
            if inner_col <= 32 {
                inner_mask |= 1 << (inner_col - 1);
            }
        }
        Ok((inner_record, inner_mask))
    }
}

impl View for SelectView {
    fn fetch_int(&self, db: &mut Database, row: usize, col: usize)
                 -> Result<u32> {
        let col = self.inner_col(col)?;
        self.inner.fetch_int(db, row, col)
    }

    fn fetch_stream(&self, db: &mut Database, row: usize, col: usize)
                    -> Result<StreamHandle> {
        let col = self.inner_col(col)?;
        self.inner.fetch_stream(db, row, col)
    }

    fn get_row(&self, db: &mut Database, row: usize) -> Result<Record> {
        let inner_record = self.inner.get_row(db, row)?;
        let values = self
            .columns
            .iter()
            .map(|&col| inner_record.value(col).cloned().unwrap_or(Value::Null))
            .collect();
        Ok(Record::from_values(values))
    }

    fn set_row(&mut self, db: &mut Database, row: usize, record: &Record,
               mask: u32)
               -> Result<()> {
        let (inner_record, inner_mask) = self.widen(db, record, mask)?;
        self.inner.set_row(db, row, &inner_record, inner_mask)
    }

    fn insert_row(&mut self, db: &mut Database, record: &Record,
                  row: Option<usize>, temporary: bool)
                  -> Result<()> {
        let (inner_record, _) = self.widen(db, record, u32::MAX)?;
        self.inner.insert_row(db, &inner_record, row, temporary)
    }

    fn delete_row(&mut self, db: &mut Database, row: usize) -> Result<()> {
        self.inner.delete_row(db, row)
    }

    fn execute(&mut self, db: &mut Database, params: Option<&Record>)
               -> Result<()> {
        self.inner.execute(db, params)
    }

    fn close(&mut self, db: &mut Database) -> Result<()> {
        self.inner.close(db)
    }

    fn get_dimensions(&self, db: &mut Database) -> Result<(usize, usize)> {
        let (num_rows, _) = self.inner.get_dimensions(db)?;
        Ok((num_rows, self.columns.len()))
    }

    fn get_column_info(&self, db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        let col = self.inner_col(col)?;
        self.inner.get_column_info(db, col)
    }

    fn delete(self: Box<Self>, db: &mut Database) {
        self.inner.delete(db);
    }

    fn sort(&mut self, db: &mut Database, columns: &[String]) -> Result<()> {
        self.inner.sort(db, columns)
    }
}

// ========================================================================= //

struct InsertView {
    inner: Box<dyn View>,
    num_columns: usize,
    columns: Vec<usize>,
    rows: Vec<Vec<Value>>,
    temporary: bool,
}

impl InsertView {
    fn insert(&mut self, db: &mut Database, values: Vec<Value>)
              -> Result<()> {
        let mut record = Record::new(self.num_columns);
        for (&col, value) in self.columns.iter().zip(values.into_iter()) {
            record.set_value(col, value)?;
        }
        self.inner.insert_row(db, &record, None, self.temporary)
    }
}

impl View for InsertView {
    fn fetch_int(&self, _db: &mut Database, row: usize, _col: usize)
                 -> Result<u32> {
        no_more_items!("Insert query has no row {}", row)
    }

    fn execute(&mut self, db: &mut Database, params: Option<&Record>)
               -> Result<()> {
        self.inner.execute(db, None)?;
        for values in self.rows.clone().into_iter() {
            self.insert(db, values)?;
        }
        if let Some(params) = params {
            let values = params.values().to_vec();
            if values.len() < self.columns.len() {
                function_failed!("Insert needs {} parameters, got {}",
                                 self.columns.len(),
                                 values.len());
            }
            self.insert(db, values)?;
        }
        Ok(())
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((0, 0))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        invalid_parameter!("Insert query has no column {}", col)
    }

    fn delete(self: Box<Self>, db: &mut Database) {
        self.inner.delete(db);
    }
}

// ========================================================================= //

struct DeleteView {
    inner: Box<dyn View>,
}

impl View for DeleteView {
    fn fetch_int(&self, _db: &mut Database, row: usize, _col: usize)
                 -> Result<u32> {
        no_more_items!("Delete query has no row {}", row)
    }

    fn execute(&mut self, db: &mut Database, params: Option<&Record>)
               -> Result<()> {
        self.inner.execute(db, params)?;
        let (num_rows, _) = self.inner.get_dimensions(db)?;
        for row in (0..num_rows).rev() {
            self.inner.delete_row(db, row)?;
        }
        tracing::trace!("deleted {} rows", num_rows);
        Ok(())
    }

    fn close(&mut self, db: &mut Database) -> Result<()> {
        self.inner.close(db)
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((0, 0))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        invalid_parameter!("Delete query has no column {}", col)
    }

    fn delete(self: Box<Self>, db: &mut Database) {
        self.inner.delete(db);
    }
}

// ========================================================================= //

struct UpdateView {
    inner: Box<dyn View>,
    updates: Vec<(usize, Value)>,
}

impl View for UpdateView {
    fn fetch_int(&self, _db: &mut Database, row: usize, _col: usize)
                 -> Result<u32> {
        no_more_items!("Update query has no row {}", row)
    }

    fn execute(&mut self, db: &mut Database, params: Option<&Record>)
               -> Result<()> {
        self.inner.execute(db, params)?;
        let (num_rows, num_cols) = self.inner.get_dimensions(db)?;
        let mut record = Record::new(num_cols);
        let mut mask = 0u32;
        for (col, value) in self.updates.iter() {
            record.set_value(*col, value.clone())?;
            if *col <= 32 {
                mask |= 1 << (*col - 1);
            }
        }
        for row in 0..num_rows {
            self.inner.set_row(db, row, &record, mask)?;
        }
        Ok(())
    }

    fn close(&mut self, db: &mut Database) -> Result<()> {
        self.inner.close(db)
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((0, 0))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        invalid_parameter!("Update query has no column {}", col)
    }

    fn delete(self: Box<Self>, db: &mut Database) {
        self.inner.delete(db);
    }
}

// ========================================================================= //

struct CreateView {
    table_name: String,
    columns: Vec<Column>,
    temporary: bool,
}

impl View for CreateView {
    fn fetch_int(&self, _db: &mut Database, row: usize, _col: usize)
                 -> Result<u32> {
        no_more_items!("Create query has no row {}", row)
    }

    fn execute(&mut self, db: &mut Database, _params: Option<&Record>)
               -> Result<()> {
        db.create_table(&self.table_name,
                        self.columns.clone(),
                        !self.temporary)
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((0, 0))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        invalid_parameter!("Create query has no column {}", col)
    }
}

// ========================================================================= //

enum AlterAction {
    Add(Column, bool),
    Hold,
    Free,
}

struct AlterView {
    table_name: String,
    action: AlterAction,
}

impl View for AlterView {
    fn fetch_int(&self, _db: &mut Database, row: usize, _col: usize)
                 -> Result<u32> {
        no_more_items!("Alter query has no row {}", row)
    }

    fn execute(&mut self, db: &mut Database, _params: Option<&Record>)
               -> Result<()> {
        match self.action {
            AlterAction::Add(ref column, hold) => {
                db.add_table_column(&self.table_name, column.clone(), hold)
            }
            AlterAction::Hold => db.hold_table(&self.table_name),
            AlterAction::Free => db.free_table(&self.table_name),
        }
    }

    fn get_dimensions(&self, _db: &mut Database) -> Result<(usize, usize)> {
        Ok((0, 0))
    }

    fn get_column_info(&self, _db: &mut Database, col: usize)
                       -> Result<ColumnInfo> {
        invalid_parameter!("Alter query has no column {}", col)
    }
}

// ========================================================================= //

/// Which attribute of each column `Query::get_column_info` reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnInfoKind {
    /// Column names.
    Names,
    /// Column type codes, such as `s72` or `I2`.
    Types,
}

/// An open query on a database.
///
/// A query must be executed before rows can be fetched.  Closing a query
/// releases its materialized rows, but the query can be executed again.
pub struct Query {
    view: Box<dyn View>,
    row: usize,
    executed: bool,
}

impl Query {
    pub(crate) fn new(view: Box<dyn View>) -> Query {
        Query { view, row: 0, executed: false }
    }

    /// Runs the query, binding the optional parameter record, and resets the
    /// row cursor to the first row.
    pub fn execute(&mut self, db: &mut Database, params: Option<&Record>)
                   -> Result<()> {
        self.row = 0;
        self.executed = false;
        self.view.execute(db, params)?;
        self.executed = true;
        Ok(())
    }

    /// Returns the next row, or `None` once every row has been returned.
    /// Fetching again past the end keeps returning `None`.
    pub fn fetch(&mut self, db: &mut Database) -> Result<Option<Record>> {
        if !self.executed {
            invalid_handle!("Query must be executed before fetching rows");
        }
        match self.view.get_row(db, self.row) {
            Ok(record) => {
                self.row += 1;
                Ok(Some(record))
            }
            Err(error) if error.is_no_more_items() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Releases the rows materialized by `execute`.
    pub fn close(&mut self, db: &mut Database) -> Result<()> {
        self.executed = false;
        self.row = 0;
        self.view.close(db)
    }

    /// Returns a record with one field per column, holding either the
    /// column names or their type codes.
    pub fn get_column_info(&self, db: &mut Database, kind: ColumnInfoKind)
                           -> Result<Record> {
        let (_, num_cols) = self.view.get_dimensions(db)?;
        let mut record = Record::new(num_cols);
        for col in 1..=num_cols {
            let info = self.view.get_column_info(db, col)?;
            match kind {
                ColumnInfoKind::Names => record.set_string(col, info.name())?,
                ColumnInfoKind::Types => {
                    record.set_string(col, &info.type_code())?
                }
            }
        }
        Ok(record)
    }

    /// Returns the column descriptions of the query's result.
    pub fn columns(&self, db: &mut Database) -> Result<Vec<ColumnInfo>> {
        let (_, num_cols) = self.view.get_dimensions(db)?;
        let mut infos = Vec::with_capacity(num_cols);
        for col in 1..=num_cols {
            infos.push(self.view.get_column_info(db, col)?);
        }
        Ok(infos)
    }

    /// Returns (number of rows, number of columns) of the executed query.
    pub fn dimensions(&self, db: &mut Database) -> Result<(usize, usize)> {
        self.view.get_dimensions(db)
    }

    /// Re-sorts the executed rows by the given columns.
    pub fn sort(&mut self, db: &mut Database, column_names: &[&str])
                -> Result<()> {
        self.view.sort(db, &to_strings(column_names))
    }

    /// Executes the query and calls `callback` on each row until the rows
    /// run out or the callback fails.  The query is always closed
    /// afterwards.  Returns the number of rows passed to the callback.
    pub fn iterate<F>(&mut self, db: &mut Database, params: Option<&Record>,
                      mut callback: F)
                      -> Result<usize>
    where
        F: FnMut(Record) -> Result<()>,
    {
        let result = self.run(db, params, &mut callback);
        let closed = self.close(db);
        let count = result?;
        closed?;
        Ok(count)
    }

    fn run<F>(&mut self, db: &mut Database, params: Option<&Record>,
              callback: &mut F)
              -> Result<usize>
    where
        F: FnMut(Record) -> Result<()>,
    {
        self.execute(db, params)?;
        let mut count = 0;
        while let Some(record) = self.fetch(db)? {
            callback(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Releases the query and its views.
    pub fn delete(self, db: &mut Database) {
        self.view.delete(db);
    }
}

// ========================================================================= //


// ========================================================================= //
