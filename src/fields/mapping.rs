//! Mapping strategies between entity properties and columns.
//!
//! Each [`FieldMapping`] variant knows which columns back a property, how
//! to decode a [`StoredRow`] into a [`Value`], and how to encode a value
//! into column assignments.

use crate::error::{StoreError, StoreResult};
use crate::model::{
    format_timestamp, parse_timestamp, EntityId, EntityType, TimeInterval, TimeValue,
    UnitOfMeasurement, Value,
};
use crate::schema::LinkTable;

use super::layout::{Column, SqlValue, StoredRow};

/// Encodings whose geometry is parsed into the spatial column.
pub const GEOJSON_ENCODINGS: [&str; 2] = ["application/geo+json", "application/vnd.geo+json"];

/// The fixed observation type of every MultiDatastream.
pub const COMPLEX_OBSERVATION_TYPE: &str =
    "http://www.opengis.net/def/observation-type/ogc-om/2.0/om_complex-observation";

/// Bounds of a stream with no observations: start after every end.
pub const EMPTY_BOUNDS_START: &str = "9999-12-31T23:59:59.999Z";
pub const EMPTY_BOUNDS_END: &str = "0001-01-01T00:00:00.000Z";

/// Discriminator values of the polymorphic observation result.
pub mod result_kind {
    pub const NUMBER: i64 = 0;
    pub const BOOLEAN: i64 = 1;
    pub const JSON: i64 = 2;
    pub const STRING: i64 = 3;
}

pub fn is_geojson_encoding(encoding: &str) -> bool {
    GEOJSON_ENCODINGS.contains(&encoding)
}

/// A named column accessor of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub column: Column,
}

/// Outcome of decoding one property from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Value(Value),
    /// A foreign key or the entity's own id.
    Reference(Option<EntityId>),
    /// Not stored on this row (link tables, child collections).
    Unmapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectKind {
    Text,
    /// Any JSON value, stored as JSON text.
    Json,
    /// A nullable timestamp.
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Units,
    Texts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeShape {
    /// Instant or interval; an instant has start = end.
    Value,
    /// Interval only.
    Interval,
    /// Store-maintained bounds; start > end means "no observations".
    Bounds,
}

/// Extra input some encoders need.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteContext<'a> {
    /// Encoding of the entity's geometry, for geometry pairs.
    pub encoding_type: Option<&'a str>,
}

/// How one property is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMapping {
    Static(Value),
    Id(Column),
    Direct {
        column: Column,
        kind: DirectKind,
    },
    /// A JSON object column.
    JsonMap(Column),
    Unit {
        name: Column,
        symbol: Column,
        definition: Column,
    },
    JsonList {
        column: Column,
        kind: ListKind,
    },
    TimePair {
        start: Column,
        end: Column,
        shape: TimeShape,
    },
    Result {
        kind: Column,
        number: Column,
        boolean: Column,
        string: Column,
        json: Column,
    },
    Geometry {
        source: Column,
        parsed: Column,
    },
    ForeignKey {
        column: Column,
        target: EntityType,
    },
    /// One-to-many; the key lives on the target table.
    Children {
        target: EntityType,
    },
    LinkEdge(LinkTable),
    OrderedLinkEdge(LinkTable),
}

type Assignments = Vec<(Column, SqlValue)>;

impl FieldMapping {
    /// Named column accessors, in a fixed order.
    pub fn fields(&self) -> Vec<Field> {
        let f = |key, column| Field { key, column };
        match self {
            FieldMapping::Id(c) => vec![f("id", *c)],
            FieldMapping::Direct { column, .. } => vec![f("v", *column)],
            FieldMapping::JsonMap(c) | FieldMapping::JsonList { column: c, .. } => {
                vec![f("j", *c)]
            }
            FieldMapping::Unit {
                name,
                symbol,
                definition,
            } => vec![
                f("name", *name),
                f("symbol", *symbol),
                f("definition", *definition),
            ],
            FieldMapping::TimePair { start, end, .. } => vec![f("start", *start), f("end", *end)],
            FieldMapping::Result {
                kind,
                number,
                boolean,
                string,
                json,
            } => vec![
                f("t", *kind),
                f("n", *number),
                f("b", *boolean),
                f("s", *string),
                f("j", *json),
            ],
            FieldMapping::Geometry { source, parsed } => {
                vec![f("source", *source), f("parsed", *parsed)]
            }
            FieldMapping::ForeignKey { column, .. } => vec![f("id", *column)],
            FieldMapping::Static(_)
            | FieldMapping::Children { .. }
            | FieldMapping::LinkEdge(_)
            | FieldMapping::OrderedLinkEdge(_) => vec![],
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        self.fields().into_iter().map(|f| f.column).collect()
    }

    /// Look up one accessor by key.
    pub fn field(&self, key: &str) -> Option<Column> {
        self.fields()
            .into_iter()
            .find(|f| f.key == key)
            .map(|f| f.column)
    }

    pub fn read(&self, row: &StoredRow) -> StoreResult<Decoded> {
        let value = match self {
            FieldMapping::Static(v) => v.clone(),
            FieldMapping::Id(c) | FieldMapping::ForeignKey { column: c, .. } => {
                return Ok(Decoded::Reference(row.get(c.index).as_i64().map(EntityId)));
            }
            FieldMapping::Direct { column, kind } => read_direct(row.get(column.index), *kind)?,
            FieldMapping::JsonMap(c) => read_json(row.get(c.index))?,
            FieldMapping::Unit {
                name,
                symbol,
                definition,
            } => {
                let unit = UnitOfMeasurement {
                    name: text_of(row.get(name.index)),
                    symbol: text_of(row.get(symbol.index)),
                    definition: text_of(row.get(definition.index)),
                };
                if unit == UnitOfMeasurement::default() {
                    Value::Null
                } else {
                    Value::Unit(unit)
                }
            }
            FieldMapping::JsonList { column, kind } => match row.get(column.index).as_text() {
                None => Value::Null,
                Some(text) => match kind {
                    ListKind::Units => Value::Units(serde_json::from_str(text)?),
                    ListKind::Texts => Value::Texts(serde_json::from_str(text)?),
                },
            },
            FieldMapping::TimePair { start, end, shape } => {
                read_time_pair(row.get(start.index), row.get(end.index), *shape)?
            }
            FieldMapping::Result {
                kind,
                number,
                boolean,
                string,
                json,
            } => match row.get(kind.index).as_i64() {
                None => Value::Null,
                Some(result_kind::NUMBER) => {
                    let exact = text_of(row.get(string.index))
                        .and_then(|t| t.parse::<serde_json::Number>().ok());
                    Value::Json(match exact {
                        Some(n) => serde_json::Value::Number(n),
                        None => row
                            .get(number.index)
                            .as_f64()
                            .map_or(serde_json::Value::Null, number_to_json),
                    })
                }
                Some(result_kind::BOOLEAN) => Value::Json(
                    row.get(boolean.index)
                        .as_bool()
                        .map_or(serde_json::Value::Null, serde_json::Value::Bool),
                ),
                Some(result_kind::STRING) => Value::Json(
                    text_of(row.get(string.index))
                        .map_or(serde_json::Value::Null, serde_json::Value::String),
                ),
                Some(_) => read_json(row.get(json.index))?,
            },
            FieldMapping::Geometry { source, .. } => read_json(row.get(source.index))?,
            FieldMapping::Children { .. }
            | FieldMapping::LinkEdge(_)
            | FieldMapping::OrderedLinkEdge(_) => return Ok(Decoded::Unmapped),
        };
        Ok(Decoded::Value(value))
    }

    /// Encode a value into column assignments.
    ///
    /// Every column of the mapping is assigned, so sibling slots of a
    /// composite property are cleared.
    pub fn write(&self, value: &Value, ctx: &WriteContext<'_>) -> StoreResult<Assignments> {
        match self {
            FieldMapping::Static(fixed) => {
                let matches = value.is_null()
                    || value == fixed
                    || value.as_text().is_some() && value.as_text() == fixed.as_text();
                if matches {
                    Ok(vec![])
                } else {
                    Err(StoreError::IllegalArgument(format!(
                        "value must be {}",
                        fixed.to_json()
                    )))
                }
            }
            FieldMapping::Id(_) => Ok(vec![]),
            FieldMapping::Direct { column, kind } => {
                Ok(vec![(*column, write_direct(value, *kind)?)])
            }
            FieldMapping::JsonMap(c) => match value {
                Value::Null => Ok(vec![(*c, SqlValue::Null)]),
                Value::Json(v @ serde_json::Value::Object(_)) => {
                    Ok(vec![(*c, SqlValue::Text(v.to_string()))])
                }
                _ => Err(StoreError::IllegalArgument(
                    "value must be a JSON object".into(),
                )),
            },
            FieldMapping::Unit {
                name,
                symbol,
                definition,
            } => {
                let unit = match value {
                    Value::Null => UnitOfMeasurement::default(),
                    Value::Unit(u) => u.clone(),
                    Value::Json(v) => serde_json::from_value(v.clone()).map_err(|e| {
                        StoreError::IllegalArgument(format!("invalid unit of measurement: {}", e))
                    })?,
                    _ => {
                        return Err(StoreError::IllegalArgument(
                            "value must be a unit of measurement".into(),
                        ))
                    }
                };
                Ok(vec![
                    (*name, unit.name.into()),
                    (*symbol, unit.symbol.into()),
                    (*definition, unit.definition.into()),
                ])
            }
            FieldMapping::JsonList { column, kind } => {
                let text = match (value, kind) {
                    (Value::Null, _) => None,
                    (Value::Units(us), ListKind::Units) => Some(serde_json::to_string(us)?),
                    (Value::Texts(ts), ListKind::Texts) => Some(serde_json::to_string(ts)?),
                    (Value::Json(v @ serde_json::Value::Array(_)), ListKind::Units) => {
                        let units: Vec<UnitOfMeasurement> = serde_json::from_value(v.clone())
                            .map_err(|e| StoreError::IllegalArgument(e.to_string()))?;
                        Some(serde_json::to_string(&units)?)
                    }
                    (Value::Json(v @ serde_json::Value::Array(_)), ListKind::Texts) => {
                        let texts: Vec<String> = serde_json::from_value(v.clone())
                            .map_err(|e| StoreError::IllegalArgument(e.to_string()))?;
                        Some(serde_json::to_string(&texts)?)
                    }
                    _ => {
                        return Err(StoreError::IllegalArgument(
                            "value must be a list".into(),
                        ))
                    }
                };
                Ok(vec![(*column, text.into())])
            }
            FieldMapping::TimePair { start, end, shape } => {
                let time = match value {
                    Value::Null => None,
                    Value::Time(t) => Some(*t),
                    Value::Text(s) => Some(TimeValue::parse(s)?),
                    _ => {
                        return Err(StoreError::IllegalArgument(
                            "value must be a time instant or interval".into(),
                        ))
                    }
                };
                if let (TimeShape::Interval, Some(TimeValue::Instant(_))) = (shape, &time) {
                    return Err(StoreError::IllegalArgument(
                        "value must be a time interval".into(),
                    ));
                }
                Ok(vec![
                    (*start, time.map(|t| format_timestamp(&t.start())).into()),
                    (*end, time.map(|t| format_timestamp(&t.end())).into()),
                ])
            }
            FieldMapping::Result {
                kind,
                number,
                boolean,
                string,
                json,
            } => {
                let mut slots = [
                    (*kind, SqlValue::Null),
                    (*number, SqlValue::Null),
                    (*boolean, SqlValue::Null),
                    (*string, SqlValue::Null),
                    (*json, SqlValue::Null),
                ];
                match value {
                    Value::Null | Value::Json(serde_json::Value::Null) => {}
                    Value::Json(serde_json::Value::Number(n)) => {
                        slots[0].1 = SqlValue::Integer(result_kind::NUMBER);
                        slots[1].1 = n.as_f64().map_or(SqlValue::Null, SqlValue::Real);
                        // the double is for filtering; the text keeps the exact number
                        slots[3].1 = SqlValue::Text(n.to_string());
                    }
                    Value::Json(serde_json::Value::Bool(b)) => {
                        slots[0].1 = SqlValue::Integer(result_kind::BOOLEAN);
                        slots[2].1 = SqlValue::Bool(*b);
                    }
                    Value::Json(serde_json::Value::String(s)) | Value::Text(s) => {
                        slots[0].1 = SqlValue::Integer(result_kind::STRING);
                        slots[3].1 = SqlValue::Text(s.clone());
                    }
                    Value::Json(v) => {
                        slots[0].1 = SqlValue::Integer(result_kind::JSON);
                        slots[4].1 = SqlValue::Text(v.to_string());
                    }
                    other => {
                        slots[0].1 = SqlValue::Integer(result_kind::JSON);
                        slots[4].1 = SqlValue::Text(other.to_json().to_string());
                    }
                }
                Ok(slots.into())
            }
            FieldMapping::Geometry { source, parsed } => {
                let geojson = ctx.encoding_type.is_some_and(is_geojson_encoding);
                let json = match value {
                    Value::Null => return Ok(vec![(*source, SqlValue::Null), (*parsed, SqlValue::Null)]),
                    Value::Json(v) => v.clone(),
                    Value::Text(s) if geojson => serde_json::from_str(s).map_err(|e| {
                        StoreError::IllegalArgument(format!("malformed geometry: {}", e))
                    })?,
                    Value::Text(s) => serde_json::Value::String(s.clone()),
                    _ => {
                        return Err(StoreError::IllegalArgument(
                            "value must be a geometry".into(),
                        ))
                    }
                };
                let text = json.to_string();
                let parsed_value = if geojson {
                    if !is_valid_geojson(&json) {
                        return Err(StoreError::IllegalArgument(format!(
                            "malformed geometry: {}",
                            text
                        )));
                    }
                    SqlValue::Text(text.clone())
                } else {
                    SqlValue::Null
                };
                Ok(vec![(*source, SqlValue::Text(text)), (*parsed, parsed_value)])
            }
            FieldMapping::ForeignKey { .. }
            | FieldMapping::Children { .. }
            | FieldMapping::LinkEdge(_)
            | FieldMapping::OrderedLinkEdge(_) => Err(StoreError::IllegalArgument(
                "navigation properties are not written as values".into(),
            )),
        }
    }

    /// Encode a foreign key.
    pub fn write_reference(&self, id: Option<EntityId>) -> StoreResult<Assignments> {
        match self {
            FieldMapping::ForeignKey { column, .. } => Ok(vec![(
                *column,
                id.map_or(SqlValue::Null, |id| SqlValue::Integer(id.0)),
            )]),
            _ => Err(StoreError::IllegalArgument(
                "property is not a foreign key".into(),
            )),
        }
    }

    /// Initial value of store-maintained time bounds.
    pub fn empty_bounds(&self) -> Assignments {
        match self {
            FieldMapping::TimePair {
                start,
                end,
                shape: TimeShape::Bounds,
            } => vec![
                (*start, SqlValue::from(EMPTY_BOUNDS_START)),
                (*end, SqlValue::from(EMPTY_BOUNDS_END)),
            ],
            _ => vec![],
        }
    }
}

fn text_of(value: &SqlValue) -> Option<String> {
    value.as_text().map(str::to_string)
}

fn read_json(value: &SqlValue) -> StoreResult<Value> {
    match value.as_text() {
        None => Ok(Value::Null),
        Some(text) => Ok(Value::Json(serde_json::from_str(text)?)),
    }
}

fn read_direct(value: &SqlValue, kind: DirectKind) -> StoreResult<Value> {
    Ok(match (kind, value) {
        (_, SqlValue::Null) => Value::Null,
        (DirectKind::Text, v) => text_of(v).map_or(Value::Null, Value::Text),
        (DirectKind::Json, v) => read_json(v)?,
        (DirectKind::Instant, v) => match v.as_text() {
            Some(text) => Value::Time(TimeValue::Instant(parse_timestamp(text)?)),
            None => Value::Null,
        },
    })
}

fn write_direct(value: &Value, kind: DirectKind) -> StoreResult<SqlValue> {
    match (kind, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (DirectKind::Text, v) => v
            .as_text()
            .map(SqlValue::from)
            .ok_or_else(|| StoreError::IllegalArgument("value must be text".into())),
        (DirectKind::Json, v) => Ok(SqlValue::Text(v.to_json().to_string())),
        (DirectKind::Instant, Value::Time(TimeValue::Instant(t))) => {
            Ok(SqlValue::Text(format_timestamp(t)))
        }
        (DirectKind::Instant, Value::Text(s)) => Ok(SqlValue::Text(format_timestamp(
            &parse_timestamp(s)?,
        ))),
        (DirectKind::Instant, _) => Err(StoreError::IllegalArgument(
            "value must be a time instant".into(),
        )),
    }
}

fn read_time_pair(start: &SqlValue, end: &SqlValue, shape: TimeShape) -> StoreResult<Value> {
    let (Some(start), Some(end)) = (start.as_text(), end.as_text()) else {
        return Ok(Value::Null);
    };
    let (start, end) = (parse_timestamp(start)?, parse_timestamp(end)?);
    if start > end {
        return Ok(Value::Null);
    }
    let interval = TimeInterval { start, end };
    Ok(Value::Time(match shape {
        TimeShape::Value if start == end => TimeValue::Instant(start),
        _ => TimeValue::Interval(interval),
    }))
}

/// Integral doubles read back as JSON integers.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::json!(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Structural GeoJSON check.
pub fn is_valid_geojson(value: &serde_json::Value) -> bool {
    let Some(kind) = value.get("type").and_then(|t| t.as_str()) else {
        return false;
    };
    match kind {
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon"
        | "MultiPolygon" => value.get("coordinates").is_some_and(|c| c.is_array()),
        "GeometryCollection" => value
            .get("geometries")
            .and_then(|g| g.as_array())
            .is_some_and(|gs| gs.iter().all(is_valid_geojson)),
        "Feature" => value
            .get("geometry")
            .is_some_and(|g| g.is_null() || is_valid_geojson(g)),
        "FeatureCollection" => value
            .get("features")
            .and_then(|f| f.as_array())
            .is_some_and(|fs| fs.iter().all(is_valid_geojson)),
        _ => false,
    }
}
