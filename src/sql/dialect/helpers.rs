//! Shared helper functions for SQL dialect implementations.
//!
//! Reusable building blocks the dialects compose to implement
//! `SqlDialect` with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: SQLite, Postgres
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a key path as a Postgres text array literal body: `{"a","b"}`.
pub fn postgres_text_array(path: &[String]) -> String {
    let items: Vec<String> = path
        .iter()
        .map(|p| format!("\"{}\"", p.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", items.join(","))
}

/// Render a key path as a SQLite JSON path: `$."a"."b"`.
pub fn sqlite_json_path(path: &[String]) -> String {
    let mut out = String::from("$");
    for p in path {
        out.push_str(&format!(".\"{}\"", p.replace('"', "\\\"")));
    }
    out
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Row counts above `i64::MAX` saturate.
fn clamp_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Emit LIMIT ... OFFSET ... (standard SQL).
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(clamp_count(lim)));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(clamp_count(off)));
    }

    ts
}

/// Emit LIMIT ... OFFSET ... where OFFSET is only legal after a LIMIT.
/// Used by: SQLite (`LIMIT -1` means unbounded)
pub fn emit_limit_offset_required_limit(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    match (limit, offset) {
        (None, Some(off)) => {
            let mut ts = TokenStream::new();
            ts.push(Token::Limit)
                .space()
                .push(Token::LitInt(-1))
                .space()
                .push(Token::Offset)
                .space()
                .push(Token::LitInt(clamp_count(off)));
            ts
        }
        _ => emit_limit_offset_standard(limit, offset),
    }
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for Postgres dialect.
pub fn remap_function_postgres(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "IFNULL" => Some("COALESCE"),
        "INSTR" => Some("STRPOS"),
        "SUBSTR" => Some("SUBSTRING"),
        _ => None,
    }
}

/// Remap functions for SQLite dialect.
pub fn remap_function_sqlite(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRPOS" => Some("INSTR"),
        "SUBSTRING" => Some("SUBSTR"),
        "CHAR_LENGTH" => Some("LENGTH"),
        _ => None,
    }
}
