//! Partial updates of stored entities.

mod fixtures;

use std::collections::BTreeSet;

use fixtures::*;
use sensorthings::model::{
    Entity, EntityId, EntityProperty, EntityType, NavigationProperty, Property, Value,
};
use sensorthings::writer::ChangeKind;
use sensorthings::{Store, StoreError};

use EntityType as T;
use NavigationProperty as N;

struct Station {
    thing: EntityId,
    datastream: EntityId,
    sensor: EntityId,
    property: EntityId,
}

/// Thing 1 at one Location with one Datastream and no observations.
fn station(store: &mut Store) -> Station {
    let datastream = store
        .create(
            &datastream("air")
                .with_link(
                    N::Thing,
                    thing("station").with_member(N::Locations, location("roof", 8.4, 49.0)),
                )
                .with_link(N::Sensor, sensor("dht22"))
                .with_link(N::ObservedProperty, observed_property("temperature")),
        )
        .unwrap()
        .id;
    Station {
        thing: EntityId(1),
        datastream,
        sensor: EntityId(1),
        property: EntityId(1),
    }
}

fn observe(store: &mut Store, datastream: EntityId, at: &str) -> EntityId {
    store
        .create(&observation(at, 1.0).with_link(N::Datastream, reference(T::Datastream, datastream)))
        .unwrap()
        .id
}

fn phenomenon_time(store: &mut Store, datastream: EntityId) -> Option<Value> {
    read_entity(store, &format!("Datastreams({})", datastream))
        .get(EntityProperty::PhenomenonTime)
        .cloned()
}

#[test]
fn test_changed_set_is_what_was_supplied() {
    let mut store = store();
    let s = station(&mut store);
    let changes = store
        .update(
            T::Thing,
            s.thing,
            &Entity::new(T::Thing).with(EntityProperty::Name, "renamed"),
        )
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Updated);
    assert_eq!(
        changes[0].changed,
        BTreeSet::from([Property::Entity(EntityProperty::Name)])
    );

    let stored = read_entity(&mut store, "Things(1)");
    assert_eq!(stored.get(EntityProperty::Name), Some(&Value::from("renamed")));
    assert_eq!(
        stored.get(EntityProperty::Description),
        Some(&Value::from("station thing"))
    );
}

#[test]
fn test_required_property_cannot_be_nulled() {
    let mut store = store();
    let s = station(&mut store);
    let err = store
        .update(T::Thing, s.thing, &Entity::new(T::Thing).with(EntityProperty::Name, Value::Null))
        .unwrap_err();
    assert!(matches!(err, StoreError::IncompleteEntity(_)));
}

#[test]
fn test_optional_property_can_be_nulled() {
    let mut store = store();
    let s = station(&mut store);
    store
        .update(
            T::Thing,
            s.thing,
            &Entity::new(T::Thing).with(EntityProperty::Properties, serde_json::json!({"a": 1})),
        )
        .unwrap();
    store
        .update(
            T::Thing,
            s.thing,
            &Entity::new(T::Thing).with(EntityProperty::Properties, Value::Null),
        )
        .unwrap();
    let stored = read_entity(&mut store, "Things(1)");
    assert_eq!(stored.get(EntityProperty::Properties), None);
}

#[test]
fn test_missing_entity() {
    let mut store = store();
    let err = store
        .update(T::Thing, EntityId(5), &Entity::new(T::Thing).with(EntityProperty::Name, "x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NoSuchEntity(_)));
}

#[test]
fn test_relations_must_exist() {
    let mut store = store();
    let s = station(&mut store);
    let err = store
        .update(
            T::Datastream,
            s.datastream,
            &Entity::new(T::Datastream).with_link(N::Sensor, reference(T::Sensor, EntityId(9))),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::NoSuchEntity(_)));

    let err = store
        .update(
            T::Datastream,
            s.datastream,
            &Entity::new(T::Datastream).with_link(N::Sensor, sensor("new")),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
    assert_eq!(count(&mut store, "Sensors"), 1);

    let err = store
        .update(
            T::Datastream,
            s.datastream,
            &Entity::new(T::Datastream).with_null_link(N::Sensor),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IncompleteEntity(_)));
}

#[test]
fn test_relink_to_other_sensor() {
    let mut store = store();
    let s = station(&mut store);
    let other = store.create(&sensor("bme280")).unwrap().id;
    let changes = store
        .update(
            T::Datastream,
            s.datastream,
            &Entity::new(T::Datastream).with_link(N::Sensor, reference(T::Sensor, other)),
        )
        .unwrap();
    assert_eq!(
        changes[0].changed,
        BTreeSet::from([Property::Navigation(N::Sensor)])
    );
    let linked = read_entity(&mut store, &format!("Datastreams({})/Sensor", s.datastream));
    assert_eq!(linked.id, Some(other));
    assert_eq!(read_ids(&mut store, &format!("Sensors({})/Datastreams", s.sensor)), Vec::<i64>::new());
}

#[test]
fn test_observation_owner_exclusivity() {
    let mut store = store();
    let s = station(&mut store);
    let multi = store
        .create(
            &multi_datastream("climate", 1, 1)
                .with_link(N::Thing, reference(T::Thing, s.thing))
                .with_link(N::Sensor, reference(T::Sensor, s.sensor))
                .with_member(N::ObservedProperties, reference(T::ObservedProperty, s.property)),
        )
        .unwrap()
        .id;
    let obs = observe(&mut store, s.datastream, "2024-05-01T10:00:00Z");

    let err = store
        .update(
            T::Observation,
            obs,
            &Entity::new(T::Observation)
                .with_link(N::MultiDatastream, reference(T::MultiDatastream, multi)),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));

    let err = store
        .update(
            T::Observation,
            obs,
            &Entity::new(T::Observation).with_null_link(N::Datastream),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IncompleteEntity(_)));

    let err = store
        .update(
            T::Observation,
            obs,
            &Entity::new(T::Observation).with_null_link(N::FeatureOfInterest),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IncompleteEntity(_)));
}

#[test]
fn test_observation_moves_between_owners() {
    let mut store = store();
    let s = station(&mut store);
    let multi = store
        .create(
            &multi_datastream("climate", 1, 1)
                .with_link(N::Thing, reference(T::Thing, s.thing))
                .with_link(N::Sensor, reference(T::Sensor, s.sensor))
                .with_member(N::ObservedProperties, reference(T::ObservedProperty, s.property)),
        )
        .unwrap()
        .id;
    let obs = observe(&mut store, s.datastream, "2024-05-01T10:00:00Z");

    // a scalar result does not fit a MultiDatastream
    let err = store
        .update(
            T::Observation,
            obs,
            &Entity::new(T::Observation)
                .with_null_link(N::Datastream)
                .with_link(N::MultiDatastream, reference(T::MultiDatastream, multi)),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));

    store
        .update(
            T::Observation,
            obs,
            &Entity::new(T::Observation)
                .with(EntityProperty::Result, serde_json::json!([4.5]))
                .with_null_link(N::Datastream)
                .with_link(N::MultiDatastream, reference(T::MultiDatastream, multi)),
        )
        .unwrap();

    assert_eq!(phenomenon_time(&mut store, s.datastream), None);
    let moved = read_entity(&mut store, &format!("MultiDatastreams({})", multi));
    assert_eq!(
        moved.get(EntityProperty::PhenomenonTime),
        Some(&Value::Time(time("2024-05-01T10:00:00Z/2024-05-01T10:00:00Z")))
    );
}

#[test]
fn test_observation_time_update_recomputes_bounds() {
    let mut store = store();
    let s = station(&mut store);
    let first = observe(&mut store, s.datastream, "2024-05-01T10:00:00Z");
    observe(&mut store, s.datastream, "2024-05-01T12:00:00Z");
    assert_eq!(
        phenomenon_time(&mut store, s.datastream),
        Some(Value::Time(time("2024-05-01T10:00:00Z/2024-05-01T12:00:00Z")))
    );

    store
        .update(
            T::Observation,
            first,
            &Entity::new(T::Observation)
                .with(EntityProperty::PhenomenonTime, time("2024-05-01T11:00:00Z")),
        )
        .unwrap();
    assert_eq!(
        phenomenon_time(&mut store, s.datastream),
        Some(Value::Time(time("2024-05-01T11:00:00Z/2024-05-01T12:00:00Z")))
    );
}

#[test]
fn test_location_change_regenerates_feature() {
    let mut store = store();
    let s = station(&mut store);
    let first = observe(&mut store, s.datastream, "2024-05-01T10:00:00Z");
    store
        .update(
            T::Location,
            EntityId(1),
            &Entity::new(T::Location).with(EntityProperty::Location, point(9.0, 50.0)),
        )
        .unwrap();
    let second = observe(&mut store, s.datastream, "2024-05-01T11:00:00Z");

    let feature = |store: &mut Store, obs: EntityId| {
        read_entity(store, &format!("Observations({})/FeatureOfInterest", obs))
    };
    let old = feature(&mut store, first);
    let new = feature(&mut store, second);
    assert_ne!(old.id, new.id);
    assert_eq!(new.get(EntityProperty::Feature), Some(&Value::Json(point(9.0, 50.0))));
    assert_eq!(old.get(EntityProperty::Feature), Some(&Value::Json(point(8.4, 49.0))));
}

#[test]
fn test_locations_update_records_history() {
    let mut store = store();
    let s = station(&mut store);
    let garden = store.create(&location("garden", 8.5, 49.1)).unwrap().id;
    let changes = store
        .update(
            T::Thing,
            s.thing,
            &Entity::new(T::Thing).with_members(N::Locations, vec![reference(T::Location, garden)]),
        )
        .unwrap();
    assert!(changes
        .iter()
        .any(|c| c.kind == ChangeKind::Created && c.entity_type == T::HistoricalLocation));
    assert_eq!(read_ids(&mut store, "Things(1)/Locations"), vec![garden.0]);
    assert_eq!(count(&mut store, "Things(1)/HistoricalLocations"), 2);
}

#[test]
fn test_collection_members_must_exist() {
    let mut store = store();
    let s = station(&mut store);
    let err = store
        .update(
            T::Thing,
            s.thing,
            &Entity::new(T::Thing).with_member(N::Locations, location("new", 0.0, 0.0)),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
    assert_eq!(count(&mut store, "Locations"), 1);
}

#[test]
fn test_multi_datastream_arity_on_update() {
    let mut store = store();
    let s = station(&mut store);
    let multi = store
        .create(
            &multi_datastream("climate", 1, 1)
                .with_link(N::Thing, reference(T::Thing, s.thing))
                .with_link(N::Sensor, reference(T::Sensor, s.sensor))
                .with_member(N::ObservedProperties, reference(T::ObservedProperty, s.property)),
        )
        .unwrap()
        .id;
    let humidity = store.create(&observed_property("humidity")).unwrap().id;

    let err = store
        .update(
            T::MultiDatastream,
            multi,
            &Entity::new(T::MultiDatastream)
                .with_member(N::ObservedProperties, reference(T::ObservedProperty, humidity)),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));

    let grown = multi_datastream("climate", 2, 2)
        .with_member(N::ObservedProperties, reference(T::ObservedProperty, humidity));
    store.update(T::MultiDatastream, multi, &grown).unwrap();
    assert_eq!(
        read_ids(&mut store, &format!("MultiDatastreams({})/ObservedProperties", multi)),
        vec![s.property.0, humidity.0]
    );
}
