//! Physical table layouts and positional rows.

use std::collections::HashMap;

use crate::sql::{lit_bool, lit_float, lit_int, lit_null, lit_str, DataType, Expr};

/// Position of a column within its table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnIndex(pub usize);

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Id,
    Integer,
    Real,
    Boolean,
    Text,
    Json,
    Timestamp,
    Geometry,
}

impl ColumnType {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnType::Id | ColumnType::Integer => DataType::Int64,
            ColumnType::Real => DataType::Float64,
            ColumnType::Boolean => DataType::Bool,
            ColumnType::Text => DataType::Text,
            ColumnType::Json => DataType::Json,
            ColumnType::Timestamp => DataType::TimestampTz,
            ColumnType::Geometry => DataType::Geometry,
        }
    }
}

/// A registered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub index: ColumnIndex,
    pub name: &'static str,
    pub column_type: ColumnType,
}

/// Ordered columns of one entity table.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub table: &'static str,
    columns: Vec<Column>,
    by_name: HashMap<&'static str, ColumnIndex>,
}

impl TableLayout {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: vec![],
            by_name: HashMap::new(),
        }
    }

    /// Register a column, or return the one already registered under `name`.
    pub fn register(&mut self, name: &'static str, column_type: ColumnType) -> Column {
        if let Some(index) = self.by_name.get(name) {
            return self.columns[index.0];
        }
        let column = Column {
            index: ColumnIndex(self.columns.len()),
            name,
            column_type,
        };
        self.columns.push(column);
        self.by_name.insert(name, column.index);
        column
    }

    pub fn column(&self, name: &str) -> Option<Column> {
        self.by_name.get(name).map(|i| self.columns[i.0])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A single column value as the backend stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            SqlValue::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(n) => Some(*n as f64),
            SqlValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Booleans come back from SQLite as 0/1 integers.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            SqlValue::Null => lit_null(),
            SqlValue::Integer(n) => lit_int(*n),
            SqlValue::Real(f) => lit_float(*f),
            SqlValue::Text(s) => lit_str(s),
            SqlValue::Bool(b) => lit_bool(*b),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.into())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(s: Option<String>) -> Self {
        s.map_or(SqlValue::Null, SqlValue::Text)
    }
}

/// A fetched row, addressed by [`ColumnIndex`].
///
/// Columns that were not projected read as `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    values: Vec<SqlValue>,
}

impl StoredRow {
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![SqlValue::Null; width],
        }
    }

    pub fn get(&self, index: ColumnIndex) -> &SqlValue {
        self.values.get(index.0).unwrap_or(&SqlValue::Null)
    }

    pub fn set(&mut self, index: ColumnIndex, value: SqlValue) {
        if index.0 >= self.values.len() {
            self.values.resize(index.0 + 1, SqlValue::Null);
        }
        self.values[index.0] = value;
    }

    /// Builder form of [`StoredRow::set`].
    pub fn with(mut self, column: Column, value: SqlValue) -> Self {
        self.set(column.index, value);
        self
    }
}
