//! Statement execution inside one transaction.

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};
use crate::fields::{Column, SqlValue, StoredRow};
use crate::model::EntityId;
use crate::sql::{Dialect, Insert, Query as SqlQuery, Statement};

/// Executes rendered statements on a connection, usually a transaction.
pub struct Session<'c> {
    conn: &'c Connection,
    dialect: Dialect,
}

impl<'c> Session<'c> {
    pub fn new(conn: &'c Connection, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn render(&self, statement: &impl Statement) -> String {
        let sql = statement.to_sql(self.dialect);
        log::debug!("{}", sql);
        sql
    }

    /// Run a query and return every row as positional values.
    pub fn fetch_values(&self, query: &SqlQuery) -> StoreResult<Vec<Vec<SqlValue>>> {
        let sql = self.render(query);
        let mut stmt = self.conn.prepare(&sql)?;
        let width = stmt.column_count();
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(sql_value))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Run a query whose select list is `projection`, placing each value at
    /// its column's index in a row of `width` slots.
    pub fn fetch_rows(
        &self,
        query: &SqlQuery,
        projection: &[Column],
        width: usize,
    ) -> StoreResult<Vec<StoredRow>> {
        let rows = self.fetch_values(query)?;
        rows.into_iter()
            .map(|values| {
                if values.len() != projection.len() {
                    return Err(StoreError::illegal_state(format!(
                        "expected {} columns, got {}",
                        projection.len(),
                        values.len()
                    )));
                }
                let mut row = StoredRow::new(width);
                for (column, value) in projection.iter().zip(values) {
                    row.set(column.index, value);
                }
                Ok(row)
            })
            .collect()
    }

    /// First column of every row as an id; NULLs are skipped.
    pub fn fetch_ids(&self, query: &SqlQuery) -> StoreResult<Vec<EntityId>> {
        Ok(self
            .fetch_values(query)?
            .into_iter()
            .filter_map(|row| row.first().and_then(SqlValue::as_i64))
            .map(EntityId)
            .collect())
    }

    /// First column of the first row.
    pub fn scalar(&self, query: &SqlQuery) -> StoreResult<SqlValue> {
        Ok(self
            .fetch_values(query)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(SqlValue::Null))
    }

    pub fn scalar_i64(&self, query: &SqlQuery) -> StoreResult<Option<i64>> {
        Ok(self.scalar(query)?.as_i64())
    }

    /// Execute a statement; returns the number of affected rows.
    pub fn execute(&self, statement: &impl Statement) -> StoreResult<usize> {
        let sql = self.render(statement);
        Ok(self.conn.execute(&sql, [])?)
    }

    /// Execute an INSERT with `RETURNING id`.
    pub fn insert_returning_id(&self, insert: Insert) -> StoreResult<EntityId> {
        let insert = insert.returning([crate::sql::col("id")]);
        let sql = self.render(&insert);
        let id = self.conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?;
        Ok(EntityId(id))
    }
}

fn sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Integer(n),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
