//! Property values.
//!
//! Timestamps are UTC with millisecond precision. Their text form is fixed
//! width so that text comparison orders them chronologically.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Format a timestamp the way the store persists it.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp, normalizing it to UTC.
pub fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::IllegalArgument(format!("Invalid timestamp '{}': {}", s, e)))
}

/// A closed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<Self> {
        if end < start {
            return Err(StoreError::IllegalArgument(format!(
                "Interval end {} precedes start {}",
                format_timestamp(&end),
                format_timestamp(&start)
            )));
        }
        Ok(Self { start, end })
    }
}

/// A time instant or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    Instant(DateTime<Utc>),
    Interval(TimeInterval),
}

impl TimeValue {
    /// Parse `t` or `start/end`.
    pub fn parse(s: &str) -> StoreResult<Self> {
        match s.split_once('/') {
            Some((start, end)) => Ok(TimeValue::Interval(TimeInterval::new(
                parse_timestamp(start)?,
                parse_timestamp(end)?,
            )?)),
            None => Ok(TimeValue::Instant(parse_timestamp(s)?)),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        match self {
            TimeValue::Instant(t) => *t,
            TimeValue::Interval(i) => i.start,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        match self {
            TimeValue::Instant(t) => *t,
            TimeValue::Interval(i) => i.end,
        }
    }
}

impl std::fmt::Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeValue::Instant(t) => write!(f, "{}", format_timestamp(t)),
            TimeValue::Interval(i) => write!(
                f,
                "{}/{}",
                format_timestamp(&i.start),
                format_timestamp(&i.end)
            ),
        }
    }
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(t: DateTime<Utc>) -> Self {
        TimeValue::Instant(t)
    }
}

/// Unit of measurement triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasurement {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub definition: Option<String>,
}

impl UnitOfMeasurement {
    pub fn new(name: &str, symbol: &str, definition: &str) -> Self {
        Self {
            name: Some(name.into()),
            symbol: Some(symbol.into()),
            definition: Some(definition.into()),
        }
    }
}

/// The value of an entity property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Json(serde_json::Value),
    Time(TimeValue),
    Unit(UnitOfMeasurement),
    Units(Vec<UnitOfMeasurement>),
    Texts(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&TimeValue> {
        match self {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    /// JSON rendering handed to the serialization layer.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Json(v) => v.clone(),
            Value::Time(t) => serde_json::Value::String(t.to_string()),
            Value::Unit(u) => serde_json::to_value(u).unwrap_or_default(),
            Value::Units(us) => serde_json::to_value(us).unwrap_or_default(),
            Value::Texts(ts) => serde_json::to_value(ts).unwrap_or_default(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<TimeValue> for Value {
    fn from(t: TimeValue) -> Self {
        Value::Time(t)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(TimeValue::Instant(t))
    }
}

impl From<UnitOfMeasurement> for Value {
    fn from(u: UnitOfMeasurement) -> Self {
        Value::Unit(u)
    }
}

impl From<Vec<UnitOfMeasurement>> for Value {
    fn from(us: Vec<UnitOfMeasurement>) -> Self {
        Value::Units(us)
    }
}

impl From<Vec<String>> for Value {
    fn from(ts: Vec<String>) -> Self {
        Value::Texts(ts)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Json(serde_json::json!(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Json(serde_json::json!(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Json(serde_json::Value::Bool(b))
    }
}
