//! SQL produced for resource paths: joins, DISTINCT, ordering and paging.

use sensorthings::config::QuerySettings;
use sensorthings::fields;
use sensorthings::model::{EntityId, EntityType, NavigationProperty};
use sensorthings::query::{EntityElement, Expand, PathElement, Query, ResourcePath};
use sensorthings::resolver::{PathResolver, ResolvedQuery};
use sensorthings::schema;
use sensorthings::sql::Dialect;
use sqlparser::dialect::{PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

fn resolver() -> PathResolver<'static> {
    PathResolver::new(schema::global(), fields::global(), QuerySettings::default())
}

fn resolve(path: &str, query: &Query) -> ResolvedQuery {
    let path = ResourcePath::parse(path, schema::global()).unwrap();
    resolver().resolve(&path, query).unwrap()
}

/// Statement text on one line.
fn flat(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render for SQLite and make sure the statement parses.
fn sqlite(resolved: &ResolvedQuery) -> String {
    let sql = resolved.sql.to_sql(Dialect::Sqlite);
    Parser::parse_sql(&SQLiteDialect {}, &sql)
        .unwrap_or_else(|e| panic!("invalid SQL {}: {}", sql, e));
    flat(&sql)
}

#[test]
fn test_navigation_to_children_joins_on_child_key() {
    let resolved = resolve("Things(1)/Datastreams", &Query::new());
    let sql = sqlite(&resolved);
    assert!(sql.contains(
        "INNER JOIN \"datastreams\" AS \"e1\" ON \"e1\".\"thing_id\" = \"e0\".\"id\""
    ));
    assert!(sql.contains("\"e0\".\"id\" = 1"));
    assert!(!resolved.needs_distinct);
    assert!(!resolved.single);
    assert!(sql.contains("LIMIT 100"));
}

#[test]
fn test_navigation_to_parent_needs_distinct() {
    let resolved = resolve("Datastreams(4)/Thing", &Query::new());
    let sql = sqlite(&resolved);
    assert!(sql.contains(
        "INNER JOIN \"things\" AS \"e1\" ON \"e1\".\"id\" = \"e0\".\"thing_id\""
    ));
    assert!(resolved.single);
    assert!(resolved.needs_distinct);
    assert!(sql.starts_with("SELECT DISTINCT"));
    assert!(!sql.contains("LIMIT"));
}

#[test]
fn test_link_table_navigation() {
    let resolved = resolve("Things(2)/Locations", &Query::new());
    let sql = sqlite(&resolved);
    assert!(sql.contains("\"things_locations\" AS \"l1\""));
    assert!(sql.contains("\"l1\".\"thing_id\" = \"e0\".\"id\""));
    assert!(sql.contains("\"e2\".\"id\" = \"l1\".\"location_id\""));
    assert!(resolved.needs_distinct);
    assert_eq!(resolved.entity_type, EntityType::Location);
}

#[test]
fn test_ordered_link_reads_in_rank_order_without_distinct() {
    let resolved = resolve("MultiDatastreams(3)/ObservedProperties", &Query::new());
    let sql = sqlite(&resolved);
    assert!(!resolved.needs_distinct);
    assert!(sql.contains("ORDER BY \"l1\".\"rank\" ASC, \"e2\".\"id\" ASC"));

    let inverse = resolve("ObservedProperties(3)/MultiDatastreams", &Query::new());
    let sql = sqlite(&inverse);
    assert!(inverse.needs_distinct);
    assert!(!sql.contains("\"rank\""));
}

#[test]
fn test_reentry_narrows_without_joining() {
    let path = ResourcePath::from_elements(
        vec![
            PathElement::Entity(EntityElement::entity(EntityType::Thing, EntityId(1))),
            PathElement::Entity(EntityElement::via(NavigationProperty::Datastreams)),
            PathElement::Entity(EntityElement::entity(EntityType::Datastream, EntityId(5))),
        ],
        schema::global(),
    )
    .unwrap();
    let resolved = resolver().resolve(&path, &Query::new()).unwrap();
    let sql = sqlite(&resolved);
    assert!(resolved.single);
    assert!(sql.contains("\"e0\".\"id\" = 1 AND \"e1\".\"id\" = 5"));
    assert!(!sql.contains("\"e2\""));
}

#[test]
fn test_count_ignores_paging() {
    let resolved = resolve("Things", &Query::new().top(2).skip(4).count());
    let count = resolved.count.as_ref().unwrap().to_sql(Dialect::Sqlite);
    Parser::parse_sql(&SQLiteDialect {}, &count).unwrap();
    let count = flat(&count);
    assert!(count.contains("COUNT(*)"));
    assert!(!count.contains("LIMIT"));
    assert!(!count.contains("ORDER BY"));

    let single = resolve("Things(1)", &Query::new().count());
    assert!(single.count.is_none());
}

#[test]
fn test_expand_resolves_from_parent() {
    let expand = Expand::new(NavigationProperty::Observations).with_query(Query::new().top(3));
    let resolved = resolver()
        .resolve_expand(EntityType::Datastream, EntityId(9), &expand)
        .unwrap();
    let sql = sqlite(&resolved);
    assert_eq!(resolved.entity_type, EntityType::Observation);
    assert!(sql.contains("\"e0\".\"id\" = 9"));
    assert!(sql.contains("LIMIT 3"));

    let bad = Expand::new(NavigationProperty::Locations);
    assert!(resolver()
        .resolve_expand(EntityType::Sensor, EntityId(1), &bad)
        .is_err());
}

#[test]
fn test_exists_and_related_ids() {
    let exists = resolver()
        .resolve_exists(EntityType::Sensor, EntityId(2))
        .unwrap()
        .to_sql(Dialect::Sqlite);
    assert_eq!(
        flat(&exists),
        "SELECT \"e0\".\"id\" FROM \"sensors\" AS \"e0\" WHERE \"e0\".\"id\" = 2"
    );

    let related = resolver()
        .resolve_related_ids(EntityType::Location, EntityId(2), NavigationProperty::Things)
        .unwrap()
        .to_sql(Dialect::Sqlite);
    Parser::parse_sql(&SQLiteDialect {}, &related).unwrap();
    assert!(flat(&related).starts_with("SELECT DISTINCT \"e2\".\"id\""));
}

#[test]
fn test_postgres_rendering_parses() {
    let resolved = resolve("Things(1)/Datastreams", &Query::new().count());
    let sql = resolved.sql.to_sql(Dialect::Postgres);
    Parser::parse_sql(&PostgreSqlDialect {}, &sql).unwrap();
    let count = resolved.count.unwrap().to_sql(Dialect::Postgres);
    Parser::parse_sql(&PostgreSqlDialect {}, &count).unwrap();
}
