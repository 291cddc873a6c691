//! SQLite SQL dialect.
//!
//! SQLite features and quirks:
//! - ANSI identifier quoting (`"`)
//! - No native timestamp type: instants are ISO-8601 UTC text with
//!   millisecond precision, so text order is time order
//! - No spatial type: geometries are stored as GeoJSON text
//! - `OFFSET` needs a preceding `LIMIT`
//! - `INTEGER PRIMARY KEY` is the rowid, which accepts explicit values
//! - RETURNING (3.35+)

use super::super::token::{Token, TokenStream};
use super::super::types::DataType;
use super::helpers;
use super::SqlDialect;

/// Format string producing the crate's canonical timestamp text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%fZ";

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_required_limit(limit, offset)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_sqlite(name)
    }

    fn emit_time_shift(&self, timestamp: &TokenStream, millis: i64) -> TokenStream {
        let seconds = millis as f64 / 1000.0;
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("STRFTIME".into()))
            .lparen()
            .push(Token::LitString(TIMESTAMP_FORMAT.into()))
            .comma()
            .space()
            .append(timestamp)
            .comma()
            .space()
            .push(Token::LitString(format!("{:+.3} seconds", seconds)))
            .rparen();
        ts
    }

    fn supports_spatial(&self) -> bool {
        false
    }

    fn emit_geometry_from_geojson(&self, geojson: &TokenStream) -> TokenStream {
        geojson.clone()
    }

    fn emit_json_path(&self, json: &TokenStream, path: &[String]) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("JSON_EXTRACT".into()))
            .lparen()
            .append(json)
            .comma()
            .space()
            .push(Token::LitString(helpers::sqlite_json_path(path)))
            .rparen();
        ts
    }

    fn emit_data_type(&self, dt: &DataType) -> String {
        match dt {
            DataType::Bool => "BOOLEAN".into(),
            DataType::Int64 => "INTEGER".into(),
            DataType::Float64 => "REAL".into(),
            DataType::Text | DataType::Json | DataType::TimestampTz | DataType::Geometry => {
                "TEXT".into()
            }
        }
    }

    fn emit_identity(&self) -> TokenStream {
        TokenStream::new()
    }
}
