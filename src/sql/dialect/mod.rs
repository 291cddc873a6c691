//! SQL Dialect definitions and formatting rules.
//!
//! Trait-based abstraction over the two backends this crate targets:
//!
//! - SQLite, the executing backend (timestamps and geometries kept as text)
//! - PostgreSQL with PostGIS, the reference spatial backend
//!
//! Besides quoting and pagination, the trait carries the hooks for the few
//! constructs whose shape differs per backend: shifting a timestamp by a
//! duration, turning GeoJSON into a geometry, and extracting a JSON path.
//!
//! # Usage
//!
//! ```ignore
//! use sensorthings::sql::{Dialect, SqlDialect};
//!
//! let quoted = Dialect::Sqlite.quote_identifier("things");  // "things"
//! ```

pub mod helpers;
mod postgres;
mod sqlite;

pub use postgres::Postgres;
pub use sqlite::Sqlite;

use super::token::{Token, TokenStream};
use super::types::DataType;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow PostgreSQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal with `''` escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit `LIMIT n OFFSET m`.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Operators and Functions
    // =========================================================================

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to
    /// keep the original. The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    // =========================================================================
    // Time, Geometry and JSON
    // =========================================================================

    /// Shift a timestamp expression by a signed number of milliseconds.
    fn emit_time_shift(&self, timestamp: &TokenStream, millis: i64) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.lparen()
            .append(timestamp)
            .space()
            .push(Token::Plus)
            .space()
            .push(Token::Interval)
            .space()
            .push(Token::LitString(format!("{} milliseconds", millis)))
            .rparen();
        ts
    }

    /// Whether geometry columns hold a native spatial type.
    fn supports_spatial(&self) -> bool {
        true
    }

    /// Convert a GeoJSON text expression into the geometry column's type.
    fn emit_geometry_from_geojson(&self, geojson: &TokenStream) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("ST_GeomFromGeoJSON".into()))
            .lparen()
            .append(geojson)
            .rparen();
        ts
    }

    /// Extract a (text) value from a JSON column by key path.
    fn emit_json_path(&self, json: &TokenStream, path: &[String]) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.lparen()
            .append(json)
            .space()
            .push(Token::Raw("#>>".into()))
            .space()
            .push(Token::LitString(helpers::postgres_text_array(path)))
            .rparen();
        ts
    }

    // =========================================================================
    // DDL Support
    // =========================================================================

    /// Emit a data type for this dialect.
    fn emit_data_type(&self, dt: &DataType) -> String {
        match dt {
            DataType::Bool => "BOOLEAN".into(),
            DataType::Int64 => "BIGINT".into(),
            DataType::Float64 => "DOUBLE PRECISION".into(),
            DataType::Text => "TEXT".into(),
            DataType::Json => "JSONB".into(),
            DataType::TimestampTz => "TIMESTAMPTZ".into(),
            DataType::Geometry => "geometry(Geometry, 4326)".into(),
        }
    }

    /// Emit identity syntax for a key column that also accepts explicit values.
    ///
    /// An empty stream means the primary key alone is enough.
    fn emit_identity(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Raw("GENERATED BY DEFAULT AS IDENTITY".into()));
        ts
    }

    /// Whether this dialect supports IF NOT EXISTS for CREATE statements.
    fn supports_if_not_exists(&self) -> bool {
        true
    }

    /// Whether this dialect supports a RETURNING clause.
    fn supports_returning(&self) -> bool {
        true
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Sqlite => &Sqlite,
            Dialect::Postgres => &Postgres,
        }
    }

    /// Look a dialect up by its display name (`sqlite`, `postgres`).
    pub fn from_name(name: &str) -> Option<Dialect> {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" => Some(Dialect::Sqlite),
            "postgres" | "postgresql" | "postgis" => Some(Dialect::Postgres),
            _ => None,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn emit_time_shift(&self, timestamp: &TokenStream, millis: i64) -> TokenStream {
        self.dialect().emit_time_shift(timestamp, millis)
    }

    fn supports_spatial(&self) -> bool {
        self.dialect().supports_spatial()
    }

    fn emit_geometry_from_geojson(&self, geojson: &TokenStream) -> TokenStream {
        self.dialect().emit_geometry_from_geojson(geojson)
    }

    fn emit_json_path(&self, json: &TokenStream, path: &[String]) -> TokenStream {
        self.dialect().emit_json_path(json, path)
    }

    fn emit_data_type(&self, dt: &DataType) -> String {
        self.dialect().emit_data_type(dt)
    }

    fn emit_identity(&self) -> TokenStream {
        self.dialect().emit_identity()
    }

    fn supports_if_not_exists(&self) -> bool {
        self.dialect().supports_if_not_exists()
    }

    fn supports_returning(&self) -> bool {
        self.dialect().supports_returning()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
