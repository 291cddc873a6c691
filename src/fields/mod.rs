//! Property field registry.
//!
//! Maps every (entity type, property) pair to the columns that store it.
//! Composite properties span several columns:
//!
//! ```text
//! phenomenonTime     -> phenomenon_time_start, phenomenon_time_end
//! unitOfMeasurement  -> unit_name, unit_symbol, unit_definition
//! result             -> result_type, result_number, result_boolean,
//!                       result_string, result_json
//! location / feature -> <source json>, geom
//! ```
//!
//! Columns are registered on first use and addressed by [`ColumnIndex`]
//! afterwards, so decoding a [`StoredRow`] never looks names up.

pub mod layout;
pub mod mapping;
mod registry;

pub use layout::{Column, ColumnIndex, ColumnType, SqlValue, StoredRow, TableLayout};
pub use mapping::{
    is_geojson_encoding, is_valid_geojson, result_kind, Decoded, DirectKind, Field, FieldMapping,
    ListKind, TimeShape, WriteContext, COMPLEX_OBSERVATION_TYPE, EMPTY_BOUNDS_END,
    EMPTY_BOUNDS_START, GEOJSON_ENCODINGS,
};
pub use registry::{global, EntityFields, FieldRegistry};
