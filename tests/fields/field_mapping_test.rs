//! Field mappings written to and read back from stored rows.

use sensorthings::error::StoreError;
use sensorthings::fields::{self, Decoded, SqlValue, StoredRow, WriteContext};
use sensorthings::model::{EntityProperty, EntityType, TimeValue, UnitOfMeasurement, Value};
use serde_json::json;

fn write(
    entity_type: EntityType,
    property: EntityProperty,
    value: Value,
    encoding: Option<&str>,
) -> Result<StoredRow, StoreError> {
    let registry = fields::global();
    let ctx = WriteContext {
        encoding_type: encoding,
    };
    let assignments = registry.write(entity_type, property, &value, &ctx)?;
    Ok(assignments.into_iter().fold(
        StoredRow::new(registry.layout(entity_type).len()),
        |row, (column, value)| row.with(column, value),
    ))
}

fn read(entity_type: EntityType, property: EntityProperty, row: &StoredRow) -> Value {
    match fields::global().read(entity_type, property, row).unwrap() {
        Decoded::Value(value) => value,
        other => panic!("expected a value, got {:?}", other),
    }
}

#[test]
fn test_unit_of_measurement_spans_three_columns() {
    let unit = UnitOfMeasurement::new("degree Celsius", "degC", "http://unitsofmeasure.org/ucum.html#para-30");
    let row = write(
        EntityType::Datastream,
        EntityProperty::UnitOfMeasurement,
        Value::Unit(unit.clone()),
        None,
    )
    .unwrap();

    let layout = fields::global().layout(EntityType::Datastream);
    let symbol = layout.column("unit_symbol").unwrap();
    assert_eq!(row.get(symbol.index), &SqlValue::Text("degC".into()));
    assert_eq!(
        read(EntityType::Datastream, EntityProperty::UnitOfMeasurement, &row),
        Value::Unit(unit)
    );
}

#[test]
fn test_geojson_location_fills_geometry_column() {
    let point = json!({"type": "Point", "coordinates": [8.0, 52.0]});
    let row = write(
        EntityType::Location,
        EntityProperty::Location,
        Value::Json(point.clone()),
        Some("application/geo+json"),
    )
    .unwrap();

    let geom = fields::global()
        .layout(EntityType::Location)
        .column("geom")
        .unwrap();
    assert!(!row.get(geom.index).is_null());
    assert_eq!(
        read(EntityType::Location, EntityProperty::Location, &row),
        Value::Json(point)
    );
}

#[test]
fn test_non_spatial_location_leaves_geometry_null() {
    let row = write(
        EntityType::Location,
        EntityProperty::Location,
        Value::Text("third floor, room 12".into()),
        Some("text/plain"),
    )
    .unwrap();

    let geom = fields::global()
        .layout(EntityType::Location)
        .column("geom")
        .unwrap();
    assert!(row.get(geom.index).is_null());
    assert_eq!(
        read(EntityType::Location, EntityProperty::Location, &row),
        Value::Json(json!("third floor, room 12"))
    );
}

#[test]
fn test_malformed_geojson_is_rejected() {
    let err = write(
        EntityType::FeatureOfInterest,
        EntityProperty::Feature,
        Value::Json(json!({"type": "Point"})),
        Some("application/vnd.geo+json"),
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
}

#[test]
fn test_observation_results_keep_their_type() {
    for result in [json!("on"), json!(true), json!(21.5), json!({"a": [1, 2]})] {
        let row = write(
            EntityType::Observation,
            EntityProperty::Result,
            Value::Json(result.clone()),
            None,
        )
        .unwrap();
        assert_eq!(
            read(EntityType::Observation, EntityProperty::Result, &row),
            Value::Json(result)
        );
    }
}

#[test]
fn test_numeric_results_read_back_exactly() {
    for result in [
        json!(9007199254740993i64),
        json!(-9007199254740993i64),
        json!(u64::MAX),
        json!(0.1),
        json!(1234.5678),
    ] {
        let row = write(
            EntityType::Observation,
            EntityProperty::Result,
            Value::Json(result.clone()),
            None,
        )
        .unwrap();
        assert_eq!(
            read(EntityType::Observation, EntityProperty::Result, &row),
            Value::Json(result)
        );
    }
}

#[test]
fn test_numeric_result_without_text_falls_back_to_double() {
    let registry = fields::global();
    let mut row = write(
        EntityType::Observation,
        EntityProperty::Result,
        Value::Json(json!(12)),
        None,
    )
    .unwrap();
    let string = registry
        .fields(EntityType::Observation, EntityProperty::Result)
        .unwrap()
        .into_iter()
        .find(|f| f.key == "s")
        .unwrap()
        .column;
    row = row.with(string, SqlValue::Null);
    assert_eq!(
        read(EntityType::Observation, EntityProperty::Result, &row),
        Value::Json(json!(12))
    );
}

#[test]
fn test_phenomenon_time_interval() {
    let interval = TimeValue::parse("2024-05-01T00:00:00Z/2024-05-01T06:00:00Z").unwrap();
    let row = write(
        EntityType::Observation,
        EntityProperty::PhenomenonTime,
        Value::Time(interval),
        None,
    )
    .unwrap();
    assert_eq!(
        read(EntityType::Observation, EntityProperty::PhenomenonTime, &row),
        Value::Time(interval)
    );
}

#[test]
fn test_valid_time_must_be_an_interval() {
    let instant = TimeValue::parse("2024-05-01T00:00:00Z").unwrap();
    let err = write(
        EntityType::Observation,
        EntityProperty::ValidTime,
        Value::Time(instant),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
}

#[test]
fn test_multi_datastream_observation_type_is_fixed() {
    let fixed = Value::Text(fields::COMPLEX_OBSERVATION_TYPE.into());
    assert!(write(
        EntityType::MultiDatastream,
        EntityProperty::ObservationType,
        fixed.clone(),
        None
    )
    .is_ok());

    let err = write(
        EntityType::MultiDatastream,
        EntityProperty::ObservationType,
        Value::Text("OM_Measurement".into()),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));

    let row = StoredRow::new(fields::global().layout(EntityType::MultiDatastream).len());
    assert_eq!(
        read(EntityType::MultiDatastream, EntityProperty::ObservationType, &row),
        fixed
    );
}

#[test]
fn test_empty_bounds_read_as_null() {
    let registry = fields::global();
    let mapping = registry
        .mapping(EntityType::Datastream, EntityProperty::PhenomenonTime)
        .unwrap();
    let row = mapping.empty_bounds().into_iter().fold(
        StoredRow::new(registry.layout(EntityType::Datastream).len()),
        |row, (column, value)| row.with(column, value),
    );
    assert_eq!(
        read(EntityType::Datastream, EntityProperty::PhenomenonTime, &row),
        Value::Null
    );
}

#[test]
fn test_unmapped_property_is_client_error() {
    let err = write(
        EntityType::Thing,
        EntityProperty::Result,
        Value::Json(json!(1)),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
}
