//! Resource path parsing and validation against the schema.

use sensorthings::model::{EntityId, EntityProperty, EntityType, NavigationProperty};
use sensorthings::query::{
    parse_order_by, parse_select, EntityElement, PathElement, PathError, ResourcePath, SortDir,
};
use sensorthings::schema;

fn parse(path: &str) -> Result<ResourcePath, PathError> {
    ResourcePath::parse(path, schema::global())
}

#[test]
fn test_collection_path() {
    let path = parse("Things").unwrap();
    assert!(path.is_collection());
    assert_eq!(path.entity_type(), EntityType::Thing);
}

#[test]
fn test_navigation_path() {
    let path = parse("/Things(3)/Datastreams(7)/Observations").unwrap();
    assert!(path.is_collection());
    assert_eq!(path.entity_type(), EntityType::Observation);
    let navs: Vec<_> = path.entity_elements().filter_map(|e| e.navigation).collect();
    assert_eq!(
        navs,
        vec![NavigationProperty::Datastreams, NavigationProperty::Observations]
    );
}

#[test]
fn test_single_valued_navigation_is_not_a_collection() {
    let path = parse("Datastreams(1)/Thing").unwrap();
    assert!(!path.is_collection());
    assert_eq!(path.entity_type(), EntityType::Thing);
}

#[test]
fn test_property_path_with_custom_keys() {
    let path = parse("Things(1)/properties/owner/name").unwrap();
    let property = path.property().unwrap();
    assert_eq!(property.property, EntityProperty::Properties);
    assert_eq!(property.custom_path, vec!["owner", "name"]);
    assert!(!property.raw_value);
    assert!(!path.is_collection());
}

#[test]
fn test_raw_value() {
    let path = parse("Things(1)/name/$value").unwrap();
    assert!(path.property().unwrap().raw_value);
}

#[test]
fn test_unknown_collection() {
    assert_eq!(
        parse("Widgets"),
        Err(PathError::UnknownCollection("Widgets".into()))
    );
}

#[test]
fn test_navigation_requires_single_entity() {
    assert!(matches!(
        parse("Things/Datastreams"),
        Err(PathError::NavigationFromCollection(_))
    ));
}

#[test]
fn test_undeclared_relation() {
    assert!(matches!(
        parse("Sensors(1)/Locations"),
        Err(PathError::UnknownSegment { .. })
    ));
}

#[test]
fn test_property_of_collection() {
    assert!(matches!(
        parse("Things/name"),
        Err(PathError::PropertyOfCollection(_))
    ));
}

#[test]
fn test_id_on_single_valued_navigation() {
    assert!(matches!(
        parse("Datastreams(1)/Thing(2)"),
        Err(PathError::IdOnSingle(_))
    ));
}

#[test]
fn test_custom_path_only_below_json_properties() {
    assert!(matches!(
        parse("Things(1)/name/first"),
        Err(PathError::TrailingSegment(_))
    ));
}

#[test]
fn test_reentry_must_keep_the_type() {
    let ok = ResourcePath::from_elements(
        vec![
            PathElement::Entity(EntityElement::collection(EntityType::Thing)),
            PathElement::Entity(EntityElement::entity(EntityType::Thing, EntityId(4))),
        ],
        schema::global(),
    )
    .unwrap();
    assert_eq!(ok.main_element().id, Some(EntityId(4)));

    let err = ResourcePath::from_elements(
        vec![
            PathElement::Entity(EntityElement::collection(EntityType::Thing)),
            PathElement::Entity(EntityElement::entity(EntityType::Sensor, EntityId(4))),
        ],
        schema::global(),
    );
    assert!(matches!(err, Err(PathError::MalformedSegment(_))));
}

#[test]
fn test_parse_select_and_order_by() {
    let select = parse_select(EntityType::Datastream, "name, Thing").unwrap();
    assert_eq!(select.len(), 2);

    let order = parse_order_by(EntityType::Observation, "phenomenonTime desc, Datastream/name").unwrap();
    assert_eq!(order.len(), 2);
    assert_eq!(order[0].dir, SortDir::Desc);
    assert_eq!(order[1].dir, SortDir::Asc);

    assert!(parse_order_by(EntityType::Observation, "result sideways").is_err());
}
