//! Reads through the public store API: paths, query options and the
//! shapes the serialization layer receives.

#[path = "../writer/fixtures.rs"]
mod fixtures;

use fixtures::*;
use serde_json::json;
use sensorthings::model::{EntityId, EntityProperty, EntityType, Link, NavigationProperty};
use sensorthings::query::{prop, Expand, FilterExpr, PropertyPath, Query, SortDir};
use sensorthings::store::ReadOutcome;
use sensorthings::{Store, StoreError};

use EntityProperty as P;
use NavigationProperty as N;

/// Things 1..=3 named a, b, c; Thing 1 owns Datastream 1 named "air".
fn populated() -> Store {
    let mut store = store();
    for (name, owner) in [("a", "alice"), ("b", "bob"), ("c", "carol")] {
        store
            .create(&thing(name).with(P::Properties, json!({"owner": owner, "floor": 2})))
            .unwrap();
    }
    store
        .create(
            &datastream("air")
                .with_link(N::Thing, reference(EntityType::Thing, EntityId(1)))
                .with_link(N::Sensor, sensor("dht22"))
                .with_link(N::ObservedProperty, observed_property("temperature")),
        )
        .unwrap();
    store
}

fn read(store: &mut Store, path: &str, query: Query) -> ReadOutcome {
    store.read_path(path, &query).unwrap()
}

fn ids(outcome: ReadOutcome) -> Vec<i64> {
    outcome
        .into_collection()
        .unwrap()
        .entities
        .iter()
        .filter_map(|e| e.id.map(|id| id.0))
        .collect()
}

#[test]
fn test_single_entity() {
    let mut store = populated();
    let thing = read_entity(&mut store, "Things(2)");
    assert_eq!(thing.id, Some(EntityId(2)));
    assert_eq!(thing.get(P::Name).and_then(|v| v.as_text()), Some("b"));
    assert_eq!(
        thing.get(P::Properties).map(|v| v.to_json()),
        Some(json!({"owner": "bob", "floor": 2}))
    );

    let err = store.read_path("Things(9)", &Query::new()).unwrap_err();
    assert!(matches!(err, StoreError::NoSuchEntity(_)));
}

#[test]
fn test_navigation_reads() {
    let mut store = populated();
    let owner = read_entity(&mut store, "Datastreams(1)/Thing");
    assert_eq!(owner.id, Some(EntityId(1)));
    assert_eq!(read_ids(&mut store, "Things(1)/Datastreams"), vec![1]);
    assert!(read_ids(&mut store, "Things(2)/Datastreams").is_empty());

    // the foreign key comes back as a reference
    let datastream = read_entity(&mut store, "Datastreams(1)");
    assert_eq!(
        datastream.single(N::Sensor).and_then(|s| s.id),
        Some(EntityId(1))
    );
}

#[test]
fn test_property_paths() {
    let mut store = populated();
    assert_eq!(
        read(&mut store, "Things(1)/name", Query::new()),
        ReadOutcome::Property(json!({"name": "a"}))
    );
    assert_eq!(
        read(&mut store, "Things(1)/name/$value", Query::new()),
        ReadOutcome::RawValue("a".into())
    );
    assert_eq!(
        read(&mut store, "Things(3)/properties/owner", Query::new()),
        ReadOutcome::Property(json!({"owner": "carol"}))
    );
    assert_eq!(
        read(&mut store, "Things(3)/properties/floor/$value", Query::new()),
        ReadOutcome::RawValue("2".into())
    );

    let err = store
        .read_path("Things(1)/properties/missing", &Query::new())
        .unwrap_err();
    assert!(matches!(err, StoreError::NoSuchEntity(_)));
}

#[test]
fn test_paging_and_count() {
    let mut store = populated();
    let page = read(&mut store, "Things", Query::new().top(2).count())
        .into_collection()
        .unwrap();
    assert_eq!(page.count, Some(3));
    assert_eq!(page.entities.len(), 2);

    assert_eq!(ids(read(&mut store, "Things", Query::new().skip(1))), vec![2, 3]);
    let uncounted = read(&mut store, "Things", Query::new()).into_collection().unwrap();
    assert_eq!(uncounted.count, None);
}

#[test]
fn test_collection_json_carries_count() {
    let mut store = populated();
    let outcome = read(&mut store, "Things", Query::new().top(1).count());
    let rendered = outcome.to_json();
    assert_eq!(rendered["@iot.count"], json!(3));
    assert_eq!(rendered["value"][0]["@iot.id"], json!(1));
    assert_eq!(rendered["value"][0]["name"], json!("a"));
}

#[test]
fn test_filter_and_order() {
    let mut store = populated();
    let by_owner =
        Query::new().filter(FilterExpr::from(PropertyPath::new(P::Properties).key("owner")).eq("bob"));
    assert_eq!(ids(read(&mut store, "Things", by_owner)), vec![2]);

    let by_datastream = Query::new()
        .filter(FilterExpr::from(PropertyPath::new(P::Name).through(N::Datastreams)).eq("air"));
    assert_eq!(ids(read(&mut store, "Things", by_datastream)), vec![1]);

    let descending = Query::new().order_by(prop(P::Name), SortDir::Desc);
    assert_eq!(ids(read(&mut store, "Things", descending)), vec![3, 2, 1]);
}

#[test]
fn test_select() {
    let mut store = populated();
    let page = read(&mut store, "Things", Query::new().select([P::Name]))
        .into_collection()
        .unwrap();
    let first = &page.entities[0];
    assert_eq!(first.id, Some(EntityId(1)));
    assert!(first.get(P::Name).is_some());
    assert!(first.get(P::Description).is_none());

    let err = store
        .read_path("Things", &Query::new().select([P::Result]))
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalArgument(_)));
}

#[test]
fn test_expand() {
    let mut store = populated();
    let things = read(
        &mut store,
        "Things",
        Query::new().expand(Expand::new(N::Datastreams)),
    )
    .into_collection()
    .unwrap()
    .entities;
    assert_eq!(things[0].members(N::Datastreams).len(), 1);
    assert_eq!(things[1].link(N::Datastreams), Some(&Link::Many(vec![])));

    let datastream = read(
        &mut store,
        "Datastreams(1)",
        Query::new().expand(Expand::new(N::Thing).with_query(Query::new().select([P::Name]))),
    )
    .into_entity()
    .unwrap();
    let thing = datastream.single(N::Thing).unwrap();
    assert_eq!(thing.get(P::Name).and_then(|v| v.as_text()), Some("a"));
}
