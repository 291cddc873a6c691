//! SQL-level data types for DDL generation.
//!
//! Column types the schema bootstrap needs. Each dialect decides the concrete
//! spelling through `SqlDialect::emit_data_type`; SQLite collapses most of
//! them to TEXT.

use std::fmt;

/// SQL-level data type for DDL generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type.
    Bool,

    /// 64-bit signed integer (BIGINT). Keys and the result discriminator.
    Int64,

    /// 64-bit floating point (DOUBLE PRECISION).
    Float64,

    /// Variable-length string.
    Text,

    /// JSON document.
    Json,

    /// Timestamp with timezone.
    TimestampTz,

    /// Spatial geometry (PostGIS `geometry`).
    Geometry,
}

impl DataType {
    /// Parse a SQL data type from a string.
    ///
    /// ```ignore
    /// use sensorthings::sql::types::DataType;
    ///
    /// assert_eq!(DataType::parse("bigint"), Some(DataType::Int64));
    /// assert_eq!(DataType::parse("jsonb"), Some(DataType::Json));
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => Some(DataType::Bool),
            "int" | "integer" | "bigint" | "int64" | "int8" => Some(DataType::Int64),
            "real" | "double" | "float" | "float8" | "float64" | "double precision" => {
                Some(DataType::Float64)
            }
            "text" | "string" | "varchar" => Some(DataType::Text),
            "json" | "jsonb" => Some(DataType::Json),
            "timestamptz" | "timestamp with time zone" | "timestamp" => {
                Some(DataType::TimestampTz)
            }
            "geometry" => Some(DataType::Geometry),
            _ => None,
        }
    }

    /// Returns true if this is a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// Returns true if this is a temporal type.
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::TimestampTz)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "BOOLEAN"),
            DataType::Int64 => write!(f, "BIGINT"),
            DataType::Float64 => write!(f, "DOUBLE PRECISION"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Json => write!(f, "JSON"),
            DataType::TimestampTz => write!(f, "TIMESTAMP WITH TIME ZONE"),
            DataType::Geometry => write!(f, "GEOMETRY"),
        }
    }
}
