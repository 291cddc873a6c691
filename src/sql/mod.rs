//! SQL generation module.
//!
//! Type-safe SQL builder used by the resolver and the writer. The core never
//! concatenates SQL text: it builds these values and renders them per dialect.
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`ddl`] - CREATE TABLE for schema bootstrap
//! - [`dml`] - INSERT, UPDATE, DELETE
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQLite and PostgreSQL/PostGIS dialects

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    and_all, coalesce, col, count_distinct, count_star, func, lit_bool, lit_float, lit_int,
    lit_null, lit_str, max, min, or_all, star, table_col, BinaryOperator, Expr, ExprExt, Literal,
    UnaryOperator,
};
pub use query::{Join, JoinType, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};

pub use ddl::{ColumnDef, CreateTable, ReferentialAction, TableConstraint};
pub use dml::{Delete, Insert, Update};
pub use types::DataType;

/// Anything that renders to a single SQL statement.
pub trait Statement {
    fn to_sql(&self, dialect: Dialect) -> String;
}

impl Statement for Query {
    fn to_sql(&self, dialect: Dialect) -> String {
        Query::to_sql(self, dialect)
    }
}

impl Statement for Insert {
    fn to_sql(&self, dialect: Dialect) -> String {
        Insert::to_sql(self, dialect)
    }
}

impl Statement for Update {
    fn to_sql(&self, dialect: Dialect) -> String {
        Update::to_sql(self, dialect)
    }
}

impl Statement for Delete {
    fn to_sql(&self, dialect: Dialect) -> String {
        Delete::to_sql(self, dialect)
    }
}

impl Statement for CreateTable {
    fn to_sql(&self, dialect: Dialect) -> String {
        CreateTable::to_sql(self, dialect)
    }
}
