//! Cascading deletes and the bookkeeping they trigger.

mod fixtures;

use fixtures::*;
use sensorthings::model::{EntityId, EntityProperty, EntityType, NavigationProperty, Value};
use sensorthings::writer::ChangeKind;
use sensorthings::{Store, StoreError};

use EntityType as T;
use NavigationProperty as N;

/// Thing 1 at Location 1 with Datastream 1 and observations at `times`.
fn station(store: &mut Store, times: &[&str]) -> EntityId {
    store
        .create(
            &datastream("air")
                .with_link(
                    N::Thing,
                    thing("station").with_member(N::Locations, location("roof", 8.4, 49.0)),
                )
                .with_link(N::Sensor, sensor("dht22"))
                .with_link(N::ObservedProperty, observed_property("temperature"))
                .with_members(
                    N::Observations,
                    times.iter().map(|t| observation(t, 1.0)).collect(),
                ),
        )
        .unwrap()
        .id
}

fn phenomenon_time(store: &mut Store, datastream: EntityId) -> Option<Value> {
    read_entity(store, &format!("Datastreams({})", datastream))
        .get(EntityProperty::PhenomenonTime)
        .cloned()
}

#[test]
fn test_thing_delete_cascades() {
    let mut store = store();
    station(&mut store, &["2024-05-01T10:00:00Z", "2024-05-01T11:00:00Z"]);

    let changes = store.delete(T::Thing, EntityId(1)).unwrap();
    assert!(changes.iter().all(|c| c.kind == ChangeKind::Deleted));
    let deleted = |ty| changes.iter().filter(|c| c.entity_type == ty).count();
    assert_eq!(deleted(T::Thing), 1);
    assert_eq!(deleted(T::Datastream), 1);
    assert_eq!(deleted(T::Observation), 2);
    assert_eq!(deleted(T::HistoricalLocation), 1);

    assert_eq!(count(&mut store, "Things"), 0);
    assert_eq!(count(&mut store, "Datastreams"), 0);
    assert_eq!(count(&mut store, "Observations"), 0);
    assert_eq!(count(&mut store, "HistoricalLocations"), 0);
    // shared entities survive
    assert_eq!(count(&mut store, "Locations"), 1);
    assert_eq!(count(&mut store, "Sensors"), 1);
    assert_eq!(count(&mut store, "ObservedProperties"), 1);
    assert_eq!(count(&mut store, "FeaturesOfInterest"), 1);
}

#[test]
fn test_observation_delete_recomputes_bounds() {
    let mut store = store();
    let ds = station(
        &mut store,
        &["2024-05-01T10:00:00Z", "2024-05-01T11:00:00Z", "2024-05-01T12:00:00Z"],
    );

    store.delete(T::Observation, EntityId(3)).unwrap();
    assert_eq!(
        phenomenon_time(&mut store, ds),
        Some(Value::Time(time("2024-05-01T10:00:00Z/2024-05-01T11:00:00Z")))
    );

    store.delete(T::Observation, EntityId(1)).unwrap();
    store.delete(T::Observation, EntityId(2)).unwrap();
    assert_eq!(phenomenon_time(&mut store, ds), None);

    // an emptied stream widens again from scratch
    store
        .create(
            &observation("2024-06-01T00:00:00Z", 2.0)
                .with_link(N::Datastream, reference(T::Datastream, ds)),
        )
        .unwrap();
    assert_eq!(
        phenomenon_time(&mut store, ds),
        Some(Value::Time(time("2024-06-01T00:00:00Z/2024-06-01T00:00:00Z")))
    );
}

#[test]
fn test_location_delete_removes_orphaned_history() {
    let mut store = store();
    station(&mut store, &[]);
    let garden = store.create(&location("garden", 8.5, 49.1)).unwrap().id;
    // Thing 1 now has a history entry for each Location
    store
        .update(
            T::Thing,
            EntityId(1),
            &sensorthings::model::Entity::new(T::Thing)
                .with_members(N::Locations, vec![reference(T::Location, garden)]),
        )
        .unwrap();
    assert_eq!(count(&mut store, "HistoricalLocations"), 2);

    store.delete(T::Location, EntityId(1)).unwrap();
    assert_eq!(count(&mut store, "HistoricalLocations"), 1);
    assert_eq!(read_ids(&mut store, "Things(1)/Locations"), vec![garden.0]);
    assert_eq!(count(&mut store, "Things"), 1);
}

#[test]
fn test_feature_delete_clears_location_cache() {
    let mut store = store();
    let ds = station(&mut store, &["2024-05-01T10:00:00Z"]);

    let changes = store.delete(T::FeatureOfInterest, EntityId(1)).unwrap();
    assert!(changes
        .iter()
        .any(|c| c.entity_type == T::Observation && c.kind == ChangeKind::Deleted));
    assert_eq!(count(&mut store, "Observations"), 0);
    assert_eq!(phenomenon_time(&mut store, ds), None);

    let obs = store
        .create(
            &observation("2024-05-01T11:00:00Z", 1.0)
                .with_link(N::Datastream, reference(T::Datastream, ds)),
        )
        .unwrap()
        .id;
    // a fresh feature is generated from the Thing's Location
    let feature = read_entity(&mut store, &format!("Observations({})/FeatureOfInterest", obs));
    assert!(feature.id.is_some());
    assert_eq!(count(&mut store, "FeaturesOfInterest"), 1);
}

#[test]
fn test_observed_property_delete_removes_its_streams() {
    let mut store = store();
    station(&mut store, &[]);
    let humidity = store.create(&observed_property("humidity")).unwrap().id;
    store
        .create(
            &multi_datastream("climate", 2, 2)
                .with_link(N::Thing, reference(T::Thing, EntityId(1)))
                .with_link(N::Sensor, reference(T::Sensor, EntityId(1)))
                .with_members(
                    N::ObservedProperties,
                    vec![
                        reference(T::ObservedProperty, EntityId(1)),
                        reference(T::ObservedProperty, humidity),
                    ],
                ),
        )
        .unwrap();

    store.delete(T::ObservedProperty, humidity).unwrap();
    assert_eq!(count(&mut store, "MultiDatastreams"), 0);
    assert_eq!(count(&mut store, "Datastreams"), 1);
    assert_eq!(count(&mut store, "ObservedProperties"), 1);
}

#[test]
fn test_missing_entity() {
    let mut store = store();
    let err = store.delete(T::Sensor, EntityId(3)).unwrap_err();
    assert!(matches!(err, StoreError::NoSuchEntity(_)));
}
