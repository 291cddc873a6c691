//! PostgreSQL (PostGIS) SQL dialect.
//!
//! PostgreSQL features used here:
//! - ANSI identifier quoting (`"`)
//! - Native boolean, JSONB and TIMESTAMPTZ types
//! - `geometry` columns via PostGIS
//! - RETURNING clause
//! - Identity columns that accept explicit values

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    // Uses default emit_limit_offset, emit_time_shift (INTERVAL arithmetic),
    // emit_geometry_from_geojson, emit_json_path (#>>) and emit_data_type.

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_postgres(name)
    }
}
