//! `$filter` and `$orderby` translation through the resolver.

use chrono::{TimeZone, Utc};
use sensorthings::config::QuerySettings;
use sensorthings::fields;
use sensorthings::model::{EntityProperty, NavigationProperty};
use sensorthings::query::{
    call, prop, FilterExpr, FilterFunction, PropertyPath, Query, ResourcePath, SortDir,
};
use sensorthings::resolver::{PathResolver, ResolvedQuery};
use sensorthings::schema;
use sensorthings::sql::Dialect;
use sensorthings::StoreError;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

fn try_resolve(path: &str, query: &Query) -> Result<ResolvedQuery, StoreError> {
    let resolver = PathResolver::new(schema::global(), fields::global(), QuerySettings::default());
    let path = ResourcePath::parse(path, schema::global()).unwrap();
    resolver.resolve(&path, query)
}

/// Resolved SQL on one line, checked to parse as SQLite.
fn sql_of(path: &str, query: &Query) -> (ResolvedQuery, String) {
    let resolved = try_resolve(path, query).unwrap();
    let sql = resolved.sql.to_sql(Dialect::Sqlite);
    Parser::parse_sql(&SQLiteDialect {}, &sql)
        .unwrap_or_else(|e| panic!("invalid SQL {}: {}", sql, e));
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    (resolved, flat)
}

fn through(nav: NavigationProperty, property: EntityProperty) -> FilterExpr {
    PropertyPath::new(property).through(nav).into()
}

fn keyed(property: EntityProperty, key: &str) -> FilterExpr {
    PropertyPath::new(property).key(key).into()
}

#[test]
fn test_filter_on_parent_uses_left_join_without_distinct() {
    let query =
        Query::new().filter(through(NavigationProperty::Datastream, EntityProperty::Name).eq("air"));
    let (resolved, sql) = sql_of("Observations", &query);
    assert!(sql.contains(
        "LEFT JOIN \"datastreams\" AS \"e1\" ON \"e1\".\"id\" = \"e0\".\"datastream_id\""
    ));
    assert!(sql.contains("WHERE \"e1\".\"name\" = 'air'"));
    assert!(!resolved.needs_distinct);
}

#[test]
fn test_filter_on_children_needs_distinct() {
    let query = Query::new()
        .filter(through(NavigationProperty::Datastreams, EntityProperty::Name).eq("air"))
        .count();
    let (resolved, sql) = sql_of("Things", &query);
    assert!(resolved.needs_distinct);
    assert!(sql.starts_with("SELECT DISTINCT"));
    let count = resolved.count.unwrap().to_sql(Dialect::Sqlite);
    assert!(count.contains("COUNT(DISTINCT \"e0\".\"id\")"));
}

#[test]
fn test_navigation_shared_by_filter_and_order_is_joined_once() {
    let query = Query::new()
        .filter(through(NavigationProperty::Datastream, EntityProperty::Name).ne("x"))
        .order_by(
            through(NavigationProperty::Datastream, EntityProperty::Name),
            SortDir::Desc,
        );
    let (_, sql) = sql_of("Observations", &query);
    assert_eq!(sql.matches("LEFT JOIN").count(), 1);
    assert!(sql.contains("ORDER BY \"e1\".\"name\" DESC, \"e0\".\"id\" ASC"));
}

#[test]
fn test_interval_property_against_instant() {
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let query = Query::new().filter(prop(EntityProperty::PhenomenonTime).gt(t));
    let (_, sql) = sql_of("Observations", &query);
    assert!(sql.contains(
        "\"e0\".\"phenomenon_time_start\" >= '2024-01-01T00:00:00.000Z' \
         AND \"e0\".\"phenomenon_time_end\" > '2024-01-01T00:00:00.000Z'"
    ));
}

#[test]
fn test_order_by_interval_sorts_on_both_ends() {
    let query = Query::new().order_by(prop(EntityProperty::PhenomenonTime), SortDir::Asc);
    let (_, sql) = sql_of("Observations", &query);
    assert!(sql.contains(
        "ORDER BY \"e0\".\"phenomenon_time_start\" ASC, \"e0\".\"phenomenon_time_end\" ASC"
    ));
}

#[test]
fn test_json_key_filter() {
    let query = Query::new().filter(keyed(EntityProperty::Properties, "owner").eq("me"));
    let (_, sql) = sql_of("Things", &query);
    assert!(sql.contains("JSON_EXTRACT(\"e0\".\"properties\", '$.\"owner\"') = 'me'"));
}

#[test]
fn test_unit_sub_field() {
    let query = Query::new().filter(keyed(EntityProperty::UnitOfMeasurement, "symbol").eq("°C"));
    let (_, sql) = sql_of("Datastreams", &query);
    assert!(sql.contains("\"e0\".\"unit_symbol\" = '°C'"));

    let bare = Query::new().filter(prop(EntityProperty::UnitOfMeasurement).eq("°C"));
    assert!(matches!(
        try_resolve("Datastreams", &bare),
        Err(StoreError::IllegalArgument(_))
    ));
}

#[test]
fn test_sub_path_on_plain_text_is_rejected() {
    let query = Query::new().filter(keyed(EntityProperty::Name, "first").eq("a"));
    assert!(matches!(
        try_resolve("Things", &query),
        Err(StoreError::IllegalArgument(_))
    ));
}

#[test]
fn test_unknown_navigation_in_filter_is_rejected() {
    let query = Query::new().filter(through(NavigationProperty::Locations, EntityProperty::Name).eq("a"));
    assert!(matches!(
        try_resolve("Sensors", &query),
        Err(StoreError::IllegalArgument(_))
    ));
}

#[test]
fn test_result_compared_as_number() {
    let query = Query::new().filter(prop(EntityProperty::Result).ge(20.5));
    let (_, sql) = sql_of("Observations", &query);
    assert!(sql.contains("\"e0\".\"result_number\" >= 20.5"));
}

#[test]
fn test_substringof() {
    let query = Query::new().filter(call(
        FilterFunction::SubstringOf,
        vec!["temp".into(), prop(EntityProperty::Name)],
    ));
    let (_, sql) = sql_of("Sensors", &query);
    assert!(sql.contains("\"e0\".\"name\" LIKE '%temp%' ESCAPE"));
}

#[test]
fn test_filtered_ordered_link_falls_back_to_distinct() {
    let query = Query::new().filter(prop(EntityProperty::Name).eq("t"));
    let (resolved, sql) = sql_of("MultiDatastreams(1)/ObservedProperties", &query);
    assert!(resolved.needs_distinct);
    assert!(!sql.contains("\"rank\""));
}

#[test]
fn test_function_arity_is_checked() {
    let query = Query::new().filter(call(FilterFunction::StartsWith, vec![prop(EntityProperty::Name)]));
    assert!(matches!(
        try_resolve("Things", &query),
        Err(StoreError::IllegalArgument(_))
    ));
}

#[test]
fn test_time_shifted_out_of_range_is_rejected() {
    let far = Utc.with_ymd_and_hms(9000, 1, 1, 0, 0, 0).unwrap();
    let shifted = FilterExpr::from(far).add(chrono::Duration::days(100_000_000));
    let query = Query::new().filter(prop(EntityProperty::ResultTime).lt(shifted));
    assert!(matches!(
        try_resolve("Observations", &query),
        Err(StoreError::IllegalArgument(_))
    ));
}

#[test]
fn test_duration_overflow_is_rejected() {
    let huge = FilterExpr::from(chrono::Duration::milliseconds(i64::MAX))
        .add(chrono::Duration::milliseconds(1));
    let query = Query::new().filter(
        prop(EntityProperty::ResultTime)
            .add(huge)
            .gt(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    );
    assert!(matches!(
        try_resolve("Observations", &query),
        Err(StoreError::IllegalArgument(_))
    ));
}

#[test]
fn test_non_finite_numbers_are_rejected() {
    for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let query = Query::new().filter(prop(EntityProperty::Result).gt(n));
        assert!(matches!(
            try_resolve("Observations", &query),
            Err(StoreError::IllegalArgument(_))
        ));
    }
}
