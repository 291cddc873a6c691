//! Cascading creates: nested payloads, generated features, history and
//! the id policy.

mod fixtures;

use fixtures::*;
use serde_json::json;
use sensorthings::fields::COMPLEX_OBSERVATION_TYPE;
use sensorthings::model::{
    Entity, EntityId, EntityProperty, EntityType, NavigationProperty, TimeValue, Value,
};
use sensorthings::writer::{ChangeKind, IdGenerationMode};
use sensorthings::{Store, StoreError};

use EntityType as T;
use NavigationProperty as N;

/// Thing 1 at Location 1, with Sensor 1 and ObservedProperty 1.
fn station(store: &mut Store) -> (EntityId, EntityId, EntityId) {
    let thing = store
        .create(&thing("station").with_member(N::Locations, location("roof", 8.4, 49.0)))
        .unwrap()
        .id;
    let sensor = store.create(&sensor("dht22")).unwrap().id;
    let property = store.create(&observed_property("temperature")).unwrap().id;
    (thing, sensor, property)
}

fn feature_of(store: &mut Store, observation: EntityId) -> EntityId {
    read_entity(store, &format!("Observations({})/FeatureOfInterest", observation))
        .id
        .unwrap()
}

#[test]
fn test_nested_datastream_create() {
    let mut store = store();
    let payload = datastream("air")
        .with_link(
            N::Thing,
            thing("station").with_member(N::Locations, location("roof", 8.4, 49.0)),
        )
        .with_link(N::Sensor, sensor("dht22"))
        .with_link(N::ObservedProperty, observed_property("temperature"))
        .with_members(
            N::Observations,
            vec![
                observation("2024-05-01T11:00:00Z", 21.0),
                observation("2024-05-01T10:00:00Z", 20.5),
                observation("2024-05-01T12:00:00Z", 19.5),
            ],
        );

    let outcome = store.create(&payload).unwrap();
    assert_eq!(outcome.changes.len(), 10);
    assert!(outcome.changes.iter().all(|c| c.kind == ChangeKind::Created));
    let created = |ty| outcome.changes.iter().filter(|c| c.entity_type == ty).count();
    assert_eq!(created(T::Thing), 1);
    assert_eq!(created(T::Location), 1);
    assert_eq!(created(T::HistoricalLocation), 1);
    assert_eq!(created(T::FeatureOfInterest), 1);
    assert_eq!(created(T::Observation), 3);
    assert_eq!(outcome.changes.last().unwrap().entity_type, T::Datastream);

    let ds = read_entity(&mut store, &format!("Datastreams({})", outcome.id));
    assert_eq!(
        ds.get(EntityProperty::PhenomenonTime),
        Some(&Value::Time(time("2024-05-01T10:00:00Z/2024-05-01T12:00:00Z")))
    );
    assert_eq!(ds.get(EntityProperty::ResultTime), None);

    assert_eq!(count(&mut store, "Observations"), 3);
    assert_eq!(count(&mut store, "FeaturesOfInterest"), 1);
    assert_eq!(count(&mut store, "HistoricalLocations"), 1);
    assert_eq!(count(&mut store, "Things(1)/Locations"), 1);
}

#[test]
fn test_generated_feature_copies_location() {
    let mut store = store();
    let (thing, sensor, property) = station(&mut store);
    let ds = store
        .create(
            &datastream("air")
                .with_link(N::Thing, reference(T::Thing, thing))
                .with_link(N::Sensor, reference(T::Sensor, sensor))
                .with_link(N::ObservedProperty, reference(T::ObservedProperty, property)),
        )
        .unwrap()
        .id;
    let obs = store
        .create(
            &observation("2024-05-01T10:00:00Z", 1.0).with_link(N::Datastream, reference(T::Datastream, ds)),
        )
        .unwrap()
        .id;

    let feature = read_entity(&mut store, &format!("Observations({})/FeatureOfInterest", obs));
    assert_eq!(feature.get(EntityProperty::Name), Some(&Value::from("roof")));
    assert_eq!(feature.get(EntityProperty::EncodingType), Some(&Value::from(GEOJSON)));
    assert_eq!(
        feature.get(EntityProperty::Feature),
        Some(&Value::Json(point(8.4, 49.0)))
    );
}

#[test]
fn test_feature_is_reused_until_the_thing_moves() {
    let mut store = store();
    let (thing, sensor, property) = station(&mut store);
    let ds = store
        .create(
            &datastream("air")
                .with_link(N::Thing, reference(T::Thing, thing))
                .with_link(N::Sensor, reference(T::Sensor, sensor))
                .with_link(N::ObservedProperty, reference(T::ObservedProperty, property)),
        )
        .unwrap()
        .id;
    let observe = |store: &mut Store, at: &str| {
        let obs = store
            .create(&observation(at, 1.0).with_link(N::Datastream, reference(T::Datastream, ds)))
            .unwrap()
            .id;
        feature_of(store, obs)
    };

    let first = observe(&mut store, "2024-05-01T10:00:00Z");
    assert_eq!(observe(&mut store, "2024-05-01T11:00:00Z"), first);

    // a new Location posted with the Thing becomes its only Location
    let garden = store
        .create(&location("garden", 8.5, 49.1).with_member(N::Things, reference(T::Thing, thing)))
        .unwrap()
        .id;
    assert_eq!(read_ids(&mut store, "Things(1)/Locations"), vec![garden.0]);
    let second = observe(&mut store, "2024-05-01T12:00:00Z");
    assert_ne!(second, first);

    // moving back reuses the feature cached on the first Location
    store
        .update(
            T::Thing,
            thing,
            &Entity::new(T::Thing)
                .with_members(N::Locations, vec![reference(T::Location, EntityId(1))]),
        )
        .unwrap();
    assert_eq!(observe(&mut store, "2024-05-01T13:00:00Z"), first);

    assert_eq!(count(&mut store, "FeaturesOfInterest"), 2);
    assert_eq!(count(&mut store, "HistoricalLocations"), 3);
    assert_eq!(count(&mut store, &format!("Locations({})/HistoricalLocations", garden)), 1);
}

#[test]
fn test_observation_without_location_or_feature_fails() {
    let mut store = store();
    let thing = store.create(&thing("bare")).unwrap().id;
    let sensor = store.create(&sensor("dht22")).unwrap().id;
    let property = store.create(&observed_property("temperature")).unwrap().id;
    let ds = store
        .create(
            &datastream("air")
                .with_link(N::Thing, reference(T::Thing, thing))
                .with_link(N::Sensor, reference(T::Sensor, sensor))
                .with_link(N::ObservedProperty, reference(T::ObservedProperty, property)),
        )
        .unwrap()
        .id;
    let err = store
        .create(&observation("2024-05-01T10:00:00Z", 1.0).with_link(N::Datastream, reference(T::Datastream, ds)))
        .unwrap_err();
    assert!(matches!(err, StoreError::NoSuchEntity(_)));
    assert_eq!(count(&mut store, "Observations"), 0);
}

#[test]
fn test_multi_datastream_arity() {
    let mut store = store();
    let (thing, sensor, _) = station(&mut store);
    let a = store.create(&observed_property("a")).unwrap().id;
    let b = store.create(&observed_property("b")).unwrap().id;
    let c = store.create(&observed_property("c")).unwrap().id;
    let multi = |types, units| {
        multi_datastream("climate", types, units)
            .with_link(N::Thing, reference(T::Thing, thing))
            .with_link(N::Sensor, reference(T::Sensor, sensor))
            .with_members(
                N::ObservedProperties,
                vec![
                    reference(T::ObservedProperty, b),
                    reference(T::ObservedProperty, a),
                    reference(T::ObservedProperty, c),
                ],
            )
    };

    let err = store.create(&multi(2, 3)).unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
    assert_eq!(count(&mut store, "MultiDatastreams"), 0);

    let id = store.create(&multi(3, 3)).unwrap().id;
    assert_eq!(
        read_ids(&mut store, &format!("MultiDatastreams({})/ObservedProperties", id)),
        vec![b.0, a.0, c.0]
    );
    let stored = read_entity(&mut store, &format!("MultiDatastreams({})", id));
    assert_eq!(
        stored.get(EntityProperty::ObservationType),
        Some(&Value::from(COMPLEX_OBSERVATION_TYPE))
    );
}

#[test]
fn test_multi_datastream_result_arity() {
    let mut store = store();
    let (thing, sensor, property) = station(&mut store);
    let other = store.create(&observed_property("humidity")).unwrap().id;
    let multi = store
        .create(
            &multi_datastream("climate", 2, 2)
                .with_link(N::Thing, reference(T::Thing, thing))
                .with_link(N::Sensor, reference(T::Sensor, sensor))
                .with_members(
                    N::ObservedProperties,
                    vec![
                        reference(T::ObservedProperty, property),
                        reference(T::ObservedProperty, other),
                    ],
                ),
        )
        .unwrap()
        .id;
    let posted = |result: serde_json::Value| {
        Entity::new(T::Observation)
            .with(EntityProperty::Result, result)
            .with_link(N::MultiDatastream, reference(T::MultiDatastream, multi))
    };

    let err = store.create(&posted(json!([20.5]))).unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
    let err = store.create(&posted(json!(20.5))).unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));

    let id = store.create(&posted(json!([20.5, 61]))).unwrap().id;
    let obs = read_entity(&mut store, &format!("Observations({})", id));
    assert_eq!(obs.get(EntityProperty::Result), Some(&Value::Json(json!([20.5, 61]))));
}

#[test]
fn test_observation_needs_exactly_one_owner() {
    let mut store = store();
    let (thing, sensor, property) = station(&mut store);
    let ds = store
        .create(
            &datastream("air")
                .with_link(N::Thing, reference(T::Thing, thing))
                .with_link(N::Sensor, reference(T::Sensor, sensor))
                .with_link(N::ObservedProperty, reference(T::ObservedProperty, property)),
        )
        .unwrap()
        .id;
    let multi = store
        .create(
            &multi_datastream("climate", 1, 1)
                .with_link(N::Thing, reference(T::Thing, thing))
                .with_link(N::Sensor, reference(T::Sensor, sensor))
                .with_member(N::ObservedProperties, reference(T::ObservedProperty, property)),
        )
        .unwrap()
        .id;

    let both = observation("2024-05-01T10:00:00Z", 1.0)
        .with_link(N::Datastream, reference(T::Datastream, ds))
        .with_link(N::MultiDatastream, reference(T::MultiDatastream, multi));
    assert!(matches!(
        store.create(&both).unwrap_err(),
        StoreError::IllegalArgument(_)
    ));

    let neither = observation("2024-05-01T10:00:00Z", 1.0);
    assert!(matches!(
        store.create(&neither).unwrap_err(),
        StoreError::IncompleteEntity(_)
    ));
}

#[test]
fn test_missing_required_relation() {
    let mut store = store();
    let payload = datastream("air")
        .with_link(N::Thing, thing("station"))
        .with_link(N::ObservedProperty, observed_property("temperature"));
    assert!(matches!(
        store.create(&payload).unwrap_err(),
        StoreError::IncompleteEntity(_)
    ));
    // nothing is written when the check fails
    assert_eq!(count(&mut store, "Things"), 0);
}

#[test]
fn test_missing_required_property() {
    let mut store = store();
    let payload = Entity::new(T::Thing).with(EntityProperty::Name, "x");
    assert!(matches!(
        store.create(&payload).unwrap_err(),
        StoreError::IncompleteEntity(_)
    ));
}

#[test]
fn test_phenomenon_time_defaults_to_now() {
    let mut store = store();
    let (thing, sensor, property) = station(&mut store);
    let payload = datastream("air")
        .with_link(N::Thing, reference(T::Thing, thing))
        .with_link(N::Sensor, reference(T::Sensor, sensor))
        .with_link(N::ObservedProperty, reference(T::ObservedProperty, property))
        .with_member(
            N::Observations,
            Entity::new(T::Observation).with(EntityProperty::Result, 3.0),
        );
    store.create(&payload).unwrap();
    let obs = read_entity(&mut store, "Observations(1)");
    assert!(matches!(
        obs.get(EntityProperty::PhenomenonTime),
        Some(Value::Time(TimeValue::Instant(_)))
    ));
}

#[test]
fn test_derived_bounds_are_not_client_writable() {
    let mut store = store();
    let (thing, sensor, property) = station(&mut store);
    let payload = datastream("air")
        .with(EntityProperty::PhenomenonTime, time("2020-01-01T00:00:00Z/2020-02-01T00:00:00Z"))
        .with_link(N::Thing, reference(T::Thing, thing))
        .with_link(N::Sensor, reference(T::Sensor, sensor))
        .with_link(N::ObservedProperty, reference(T::ObservedProperty, property));
    let id = store.create(&payload).unwrap().id;
    let ds = read_entity(&mut store, &format!("Datastreams({})", id));
    assert_eq!(ds.get(EntityProperty::PhenomenonTime), None);
}

#[test]
fn test_unknown_reference_is_not_found() {
    let mut store = store();
    let payload = observation("2024-05-01T10:00:00Z", 1.0)
        .with_link(N::Datastream, reference(T::Datastream, EntityId(77)));
    assert!(matches!(
        store.create(&payload).unwrap_err(),
        StoreError::NoSuchEntity(_)
    ));
}

#[test]
fn test_partial_payload_with_unknown_id_is_not_found() {
    let mut store = store();
    let (thing, _, property) = station(&mut store);
    let stream = |sensor: Entity| {
        datastream("air")
            .with_link(N::Thing, reference(T::Thing, thing))
            .with_link(N::Sensor, sensor)
            .with_link(N::ObservedProperty, reference(T::ObservedProperty, property))
    };

    let partial = Entity::reference(T::Sensor, 99).with(EntityProperty::Name, "x");
    assert!(matches!(
        store.create(&stream(partial)).unwrap_err(),
        StoreError::NoSuchEntity(_)
    ));
    assert_eq!(count(&mut store, "Datastreams"), 0);

    // a complete payload is created under a server id
    let complete = sensor("sht31").with_id(99);
    store.create(&stream(complete)).unwrap();
    assert_eq!(count(&mut store, "Sensors"), 2);
    assert_eq!(
        read_entity(&mut store, "Datastreams(1)/Sensor").id,
        Some(EntityId(2))
    );
}

#[test]
fn test_server_generated_ids_ignore_client_ids() {
    let mut store = store();
    let outcome = store.create(&thing("a").with_id(42)).unwrap();
    assert_eq!(outcome.id, EntityId(1));
}

#[test]
fn test_client_generated_ids() {
    let mut store = Store::open_in_memory()
        .unwrap()
        .with_id_mode(IdGenerationMode::ClientGeneratedOnly);
    assert!(matches!(
        store.create(&thing("a")).unwrap_err(),
        StoreError::IncompleteEntity(_)
    ));

    // generated HistoricalLocations still get server ids
    let outcome = store
        .create(
            &thing("a")
                .with_id(7)
                .with_member(N::Locations, location("roof", 1.0, 2.0).with_id(8)),
        )
        .unwrap();
    assert_eq!(outcome.id, EntityId(7));
    assert_eq!(read_ids(&mut store, "Things(7)/Locations"), vec![8]);
    assert_eq!(count(&mut store, "HistoricalLocations"), 1);
}

#[test]
fn test_mixed_id_generation() {
    let mut store = Store::open_in_memory()
        .unwrap()
        .with_id_mode(IdGenerationMode::ServerAndClientGenerated);
    assert_eq!(store.create(&thing("a").with_id(42)).unwrap().id, EntityId(42));
    assert_eq!(store.create(&thing("b")).unwrap().id, EntityId(43));
    assert_eq!(store.create(&thing("c").with_id(-5)).unwrap().id, EntityId(44));
}
