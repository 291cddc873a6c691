//! Mutable state of one resolution.

use std::collections::HashMap;

use crate::error::{StoreError, StoreResult};
use crate::model::{EntityType, NavigationProperty};
use crate::query::EntityElement;
use crate::schema::{JoinShape, Relation, SchemaRegistry};
use crate::sql::{and_all, lit_int, Expr, ExprExt, Join, JoinType, Query as SqlQuery, TableRef};

/// An entity table in the FROM clause with its alias.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTable {
    pub entity_type: EntityType,
    pub table: TableRef,
}

impl EntityTable {
    pub fn id(&self) -> Expr {
        self.table.col("id")
    }

    pub fn col(&self, column: &str) -> Expr {
        self.table.col(column)
    }
}

/// Tables, joins and predicates accumulated while walking a path.
///
/// Created fresh for every resolution and dropped with it.
#[derive(Debug)]
pub struct ResolverContext<'r> {
    schema: &'r SchemaRegistry,
    aliases: usize,
    from: Option<TableRef>,
    joins: Vec<Join>,
    predicates: Vec<Expr>,
    current: Option<EntityTable>,
    needs_distinct: bool,
    rank: Option<Expr>,
    filter_joins: HashMap<(String, NavigationProperty), EntityTable>,
}

impl<'r> ResolverContext<'r> {
    pub fn new(schema: &'r SchemaRegistry) -> Self {
        Self {
            schema,
            aliases: 0,
            from: None,
            joins: vec![],
            predicates: vec![],
            current: None,
            needs_distinct: false,
            rank: None,
            filter_joins: HashMap::new(),
        }
    }

    fn alias(&mut self, prefix: &str) -> String {
        let alias = format!("{}{}", prefix, self.aliases);
        self.aliases += 1;
        alias
    }

    fn table(&mut self, entity_type: EntityType) -> EntityTable {
        let alias = self.alias("e");
        EntityTable {
            entity_type,
            table: TableRef::new(self.schema.table(entity_type)).with_alias(&alias),
        }
    }

    /// Walk into the next path element.
    pub fn enter(&mut self, element: &EntityElement) -> StoreResult<()> {
        let schema = self.schema;
        let entered = match (self.current.clone(), element.navigation) {
            (None, _) => {
                let root = self.table(element.entity_type);
                self.from = Some(root.table.clone());
                root
            }
            (Some(current), None) => {
                if current.entity_type != element.entity_type {
                    return Err(StoreError::illegal_state(format!(
                        "cannot re-enter {} from {}",
                        element.entity_type, current.entity_type
                    )));
                }
                current
            }
            (Some(current), Some(navigation)) => {
                let relation = schema.relation(current.entity_type, navigation)?;
                let (target, rank) = self.join(&current, relation, JoinType::Inner);
                if relation.distinct_on_read {
                    self.needs_distinct = true;
                }
                self.rank = if relation.is_ordered() { rank } else { None };
                target
            }
        };
        if let Some(id) = element.id {
            self.predicates.push(entered.id().eq(lit_int(id.0)));
        }
        self.current = Some(entered);
        Ok(())
    }

    /// Join the target of `relation` onto `from`. Returns the target table
    /// and, for link tables with a rank, the rank column.
    fn join(
        &mut self,
        from: &EntityTable,
        relation: &Relation,
        join_type: JoinType,
    ) -> (EntityTable, Option<Expr>) {
        match relation.join {
            JoinShape::SourceForeignKey { column } => {
                let target = self.table(relation.target);
                self.joins.push(Join {
                    join_type,
                    table: target.table.clone(),
                    on: target.id().eq(from.col(column)),
                });
                (target, None)
            }
            JoinShape::TargetForeignKey { column } => {
                let target = self.table(relation.target);
                self.joins.push(Join {
                    join_type,
                    table: target.table.clone(),
                    on: target.col(column).eq(from.id()),
                });
                (target, None)
            }
            JoinShape::Link(link) => {
                let alias = self.alias("l");
                let link_ref = TableRef::new(link.table).with_alias(&alias);
                self.joins.push(Join {
                    join_type,
                    table: link_ref.clone(),
                    on: link_ref.col(link.source_column).eq(from.id()),
                });
                let target = self.table(relation.target);
                self.joins.push(Join {
                    join_type,
                    table: target.table.clone(),
                    on: target.id().eq(link_ref.col(link.target_column)),
                });
                (target, link.rank_column.map(|rank| link_ref.col(rank)))
            }
        }
    }

    /// Join a chain of navigation properties used inside a filter or an
    /// ordering. Each hop is joined once per resolution.
    ///
    /// Unknown navigation here comes from the query, so it is the
    /// client's error rather than a schema gap.
    pub fn navigate(
        &mut self,
        start: &EntityTable,
        navigation: &[NavigationProperty],
    ) -> StoreResult<EntityTable> {
        let schema = self.schema;
        let mut current = start.clone();
        for nav in navigation {
            if !schema.has_relation(current.entity_type, *nav) {
                return Err(StoreError::IllegalArgument(format!(
                    "{} has no navigation property {}",
                    current.entity_type,
                    nav.name()
                )));
            }
            let key = (current.table.qualifier().to_string(), *nav);
            if let Some(joined) = self.filter_joins.get(&key) {
                current = joined.clone();
                continue;
            }
            let relation = schema.relation(current.entity_type, *nav)?;
            let (target, _) = self.join(&current, relation, JoinType::Left);
            if relation.kind.is_many() {
                self.needs_distinct = true;
            }
            self.filter_joins.insert(key, target.clone());
            current = target;
        }
        Ok(current)
    }

    pub fn current(&self) -> StoreResult<&EntityTable> {
        self.current
            .as_ref()
            .ok_or_else(|| StoreError::illegal_state("resolution without a root element"))
    }

    pub fn filter(&mut self, predicate: Expr) {
        self.predicates.push(predicate);
    }

    pub fn mark_distinct(&mut self) {
        self.needs_distinct = true;
    }

    pub fn needs_distinct(&self) -> bool {
        self.needs_distinct
    }

    /// Rank column of an ordered traversal into the current table.
    pub fn rank(&self) -> Option<&Expr> {
        self.rank.as_ref()
    }

    pub fn join_count(&self) -> usize {
        self.joins.len()
    }

    /// FROM, JOINs and WHERE of the resolved query.
    pub fn base_query(&self) -> SqlQuery {
        let mut query = SqlQuery::new();
        if let Some(from) = &self.from {
            query = query.from(from.clone());
        }
        for join in &self.joins {
            query = query.join(join.join_type, join.table.clone(), join.on.clone());
        }
        if let Some(predicate) = and_all(self.predicates.iter().cloned()) {
            query = query.filter(predicate);
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use crate::schema;
    use crate::sql::Dialect;

    #[test]
    fn test_aliases_are_fresh() {
        let mut ctx = ResolverContext::new(schema::global());
        ctx.enter(&EntityElement::entity(EntityType::Thing, EntityId(1)))
            .unwrap();
        ctx.enter(&EntityElement::via(NavigationProperty::Locations))
            .unwrap();
        let sql = ctx.base_query().select_star().to_sql(Dialect::Sqlite);
        assert!(sql.contains("\"things\" AS \"e0\""));
        assert!(sql.contains("\"things_locations\" AS \"l1\""));
        assert!(sql.contains("\"locations\" AS \"e2\""));
        assert!(ctx.needs_distinct());
    }

    #[test]
    fn test_filter_navigation_joined_once() {
        let mut ctx = ResolverContext::new(schema::global());
        ctx.enter(&EntityElement::collection(EntityType::Observation))
            .unwrap();
        let root = ctx.current().unwrap().clone();
        let path = [NavigationProperty::Datastream, NavigationProperty::Thing];
        let first = ctx.navigate(&root, &path).unwrap();
        let second = ctx.navigate(&root, &path).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.join_count(), 2);
        assert!(!ctx.needs_distinct());
    }

    #[test]
    fn test_filter_navigation_to_many_needs_distinct() {
        let mut ctx = ResolverContext::new(schema::global());
        ctx.enter(&EntityElement::collection(EntityType::Thing))
            .unwrap();
        let root = ctx.current().unwrap().clone();
        ctx.navigate(&root, &[NavigationProperty::Datastreams])
            .unwrap();
        assert!(ctx.needs_distinct());
    }

    #[test]
    fn test_unknown_filter_navigation_is_client_error() {
        let mut ctx = ResolverContext::new(schema::global());
        ctx.enter(&EntityElement::collection(EntityType::Sensor))
            .unwrap();
        let root = ctx.current().unwrap().clone();
        let err = ctx
            .navigate(&root, &[NavigationProperty::Locations])
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalArgument(_)));
    }
}
