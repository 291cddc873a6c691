//! Payload builders and read helpers shared by the store tests.
#![allow(dead_code)]

use serde_json::json;
use sensorthings::model::{
    Entity, EntityId, EntityProperty, EntityType, TimeValue, UnitOfMeasurement,
};
use sensorthings::query::Query;
use sensorthings::Store;

pub const GEOJSON: &str = "application/geo+json";

pub fn store() -> Store {
    Store::open_in_memory().unwrap()
}

pub fn thing(name: &str) -> Entity {
    Entity::new(EntityType::Thing)
        .with(EntityProperty::Name, name)
        .with(EntityProperty::Description, format!("{} thing", name))
}

pub fn location(name: &str, lon: f64, lat: f64) -> Entity {
    Entity::new(EntityType::Location)
        .with(EntityProperty::Name, name)
        .with(EntityProperty::Description, format!("{} location", name))
        .with(EntityProperty::EncodingType, GEOJSON)
        .with(EntityProperty::Location, point(lon, lat))
}

pub fn point(lon: f64, lat: f64) -> serde_json::Value {
    json!({"type": "Point", "coordinates": [lon, lat]})
}

pub fn sensor(name: &str) -> Entity {
    Entity::new(EntityType::Sensor)
        .with(EntityProperty::Name, name)
        .with(EntityProperty::Description, format!("{} sensor", name))
        .with(EntityProperty::EncodingType, "application/pdf")
        .with(EntityProperty::Metadata, format!("https://example.org/{}.pdf", name))
}

pub fn observed_property(name: &str) -> Entity {
    Entity::new(EntityType::ObservedProperty)
        .with(EntityProperty::Name, name)
        .with(EntityProperty::Definition, format!("urn:example:{}", name))
        .with(EntityProperty::Description, format!("{} property", name))
}

/// A Datastream with its own properties only.
pub fn datastream(name: &str) -> Entity {
    Entity::new(EntityType::Datastream)
        .with(EntityProperty::Name, name)
        .with(EntityProperty::Description, format!("{} datastream", name))
        .with(EntityProperty::ObservationType, "OM_Measurement")
        .with(
            EntityProperty::UnitOfMeasurement,
            UnitOfMeasurement::new("degree Celsius", "degC", "ucum:Cel"),
        )
}

/// A MultiDatastream with `types` data types and `units` units.
pub fn multi_datastream(name: &str, types: usize, units: usize) -> Entity {
    Entity::new(EntityType::MultiDatastream)
        .with(EntityProperty::Name, name)
        .with(EntityProperty::Description, format!("{} multi datastream", name))
        .with(
            EntityProperty::MultiObservationDataTypes,
            vec!["OM_Measurement".to_string(); types],
        )
        .with(
            EntityProperty::UnitOfMeasurements,
            vec![UnitOfMeasurement::new("percent", "%", "ucum:%"); units],
        )
}

pub fn observation(phenomenon_time: &str, result: f64) -> Entity {
    Entity::new(EntityType::Observation)
        .with(EntityProperty::PhenomenonTime, time(phenomenon_time))
        .with(EntityProperty::Result, result)
}

pub fn time(text: &str) -> TimeValue {
    TimeValue::parse(text).unwrap()
}

pub fn reference(entity_type: EntityType, id: EntityId) -> Entity {
    Entity::reference(entity_type, id.0)
}

/// A single entity addressed by `path`.
pub fn read_entity(store: &mut Store, path: &str) -> Entity {
    store
        .read_path(path, &Query::new())
        .unwrap()
        .into_entity()
        .unwrap_or_else(|| panic!("{} is not a single entity", path))
}

/// Ids of the collection addressed by `path`, in read order.
pub fn read_ids(store: &mut Store, path: &str) -> Vec<i64> {
    store
        .read_path(path, &Query::new())
        .unwrap()
        .into_collection()
        .unwrap_or_else(|| panic!("{} is not a collection", path))
        .entities
        .iter()
        .filter_map(|e| e.id.map(|id| id.0))
        .collect()
}

pub fn count(store: &mut Store, path: &str) -> usize {
    read_ids(store, path).len()
}
