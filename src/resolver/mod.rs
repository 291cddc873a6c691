//! SQL path resolver.
//!
//! Turns a [`ResourcePath`] and a [`Query`] into one composed relational
//! query. The resolver never executes anything; the store runs what it
//! returns.
//!
//! ```text
//! Things(1)/Datastreams?$filter=...
//!
//! FROM things e0
//! JOIN datastreams e1 ON e1.thing_id = e0.id     (path hop)
//! LEFT JOIN sensors e2 ON e2.id = e1.sensor_id   (filter hop)
//! WHERE e0.id = 1 AND <filter>
//! ```
//!
//! Each call builds a fresh [`ResolverContext`], so a resolver is freely
//! shared between callers.

pub mod context;
pub mod filter;

pub use context::{EntityTable, ResolverContext};
pub use filter::{FilterTranslator, Operand};

use crate::config::QuerySettings;
use crate::error::{StoreError, StoreResult};
use crate::fields::{Column, FieldRegistry};
use crate::model::{EntityId, EntityProperty, EntityType, NavigationProperty, Property};
use crate::query::{EntityElement, Expand, PropertyElement, Query, ResourcePath};
use crate::schema::SchemaRegistry;
use crate::sql::{count_distinct, count_star, Expr, OrderByExpr, Query as SqlQuery, SortDir};

/// Output of [`PathResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub sql: SqlQuery,
    /// Row count over the same FROM and WHERE, when `$count` was asked.
    pub count: Option<SqlQuery>,
    pub entity_type: EntityType,
    /// Columns of the main table, in select-list order.
    pub projection: Vec<Column>,
    /// Properties the reader should populate.
    pub selection: Vec<Property>,
    /// The path addresses one entity, not a collection.
    pub single: bool,
    pub needs_distinct: bool,
    /// Trailing property element of a property path.
    pub property: Option<PropertyElement>,
}

/// Resolves paths against the schema and field registries.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'r> {
    schema: &'r SchemaRegistry,
    fields: &'r FieldRegistry,
    settings: QuerySettings,
}

impl<'r> PathResolver<'r> {
    pub fn new(schema: &'r SchemaRegistry, fields: &'r FieldRegistry, settings: QuerySettings) -> Self {
        Self {
            schema,
            fields,
            settings,
        }
    }

    pub fn schema(&self) -> &'r SchemaRegistry {
        self.schema
    }

    pub fn fields(&self) -> &'r FieldRegistry {
        self.fields
    }

    /// Resolve a path and its query options into SQL.
    pub fn resolve(&self, path: &ResourcePath, query: &Query) -> StoreResult<ResolvedQuery> {
        let mut ctx = ResolverContext::new(self.schema);
        for element in path.entity_elements() {
            ctx.enter(element)?;
        }
        let main = ctx.current()?.clone();
        let property = path.property().cloned();
        let single = !path.is_collection();

        let (selection, projection) = match &property {
            Some(prop) => self.property_selection(main.entity_type, prop.property)?,
            None if single || query.select.is_empty() => self.full_selection(main.entity_type),
            None => self.explicit_selection(main.entity_type, query)?,
        };
        for expand in &query.expand {
            self.check_navigation(main.entity_type, expand.navigation)?;
        }

        if let Some(filter) = &query.filter {
            let predicate =
                FilterTranslator::new(&mut ctx, self.fields, main.clone()).predicate(filter)?;
            ctx.filter(predicate);
        }

        let mut order = vec![];
        for item in &query.order_by {
            let keys = FilterTranslator::new(&mut ctx, self.fields, main.clone())
                .order_keys(&item.expr)?;
            order.extend(keys.into_iter().map(|k| OrderByExpr::with_dir(k, item.dir)));
        }
        if let Some(rank) = ctx.rank().cloned() {
            if query.filter.is_some() {
                ctx.mark_distinct();
            } else if !ctx.needs_distinct() {
                order.push(OrderByExpr::asc(rank));
            }
        }
        if !single && self.settings.always_order_by_id {
            let id = main.id();
            if !order.iter().any(|o| o.expr == id) {
                order.push(OrderByExpr::with_dir(id, SortDir::Asc));
            }
        }

        let needs_distinct = ctx.needs_distinct();
        let base = ctx.base_query();

        let count = (query.count && !single).then(|| {
            let counter = if needs_distinct {
                count_distinct(main.id())
            } else {
                count_star()
            };
            base.clone().select(vec![counter])
        });

        let select: Vec<Expr> = projection.iter().map(|c| main.col(c.name)).collect();
        let mut sql = base.select(select).order_by(order);
        if needs_distinct {
            sql = sql.distinct();
        }
        if !single {
            sql = sql.limit(self.settings.page_size(query.top));
            if let Some(skip) = query.skip.filter(|s| *s > 0) {
                sql = sql.offset(skip);
            }
        }

        Ok(ResolvedQuery {
            sql,
            count,
            entity_type: main.entity_type,
            projection,
            selection,
            single,
            needs_distinct,
            property,
        })
    }

    /// Resolve one `$expand` item for one parent entity.
    pub fn resolve_expand(
        &self,
        parent_type: EntityType,
        parent_id: EntityId,
        expand: &Expand,
    ) -> StoreResult<ResolvedQuery> {
        self.check_navigation(parent_type, expand.navigation)?;
        let path = ResourcePath::navigation(parent_type, parent_id, expand.navigation, self.schema)?;
        self.resolve(&path, &expand.query)
    }

    /// `SELECT id` of one entity, for existence checks.
    pub fn resolve_exists(&self, entity_type: EntityType, id: EntityId) -> StoreResult<SqlQuery> {
        let mut ctx = ResolverContext::new(self.schema);
        ctx.enter(&EntityElement::entity(entity_type, id))?;
        let main = ctx.current()?.clone();
        Ok(ctx.base_query().select(vec![main.id()]))
    }

    /// Ids of the entities reached from one entity over a navigation
    /// property, in read order.
    pub fn resolve_related_ids(
        &self,
        entity_type: EntityType,
        id: EntityId,
        navigation: NavigationProperty,
    ) -> StoreResult<SqlQuery> {
        let mut ctx = ResolverContext::new(self.schema);
        ctx.enter(&EntityElement::entity(entity_type, id))?;
        ctx.enter(&EntityElement::via(navigation))?;
        let target = ctx.current()?.clone();
        let mut order = vec![];
        if let Some(rank) = ctx.rank() {
            order.push(OrderByExpr::asc(rank.clone()));
        }
        order.push(OrderByExpr::asc(target.id()));
        let mut sql = ctx.base_query().select(vec![target.id()]).order_by(order);
        if ctx.needs_distinct() {
            sql = sql.distinct();
        }
        Ok(sql)
    }

    fn check_navigation(
        &self,
        entity_type: EntityType,
        navigation: NavigationProperty,
    ) -> StoreResult<()> {
        if self.schema.has_relation(entity_type, navigation) {
            Ok(())
        } else {
            Err(StoreError::IllegalArgument(format!(
                "{} cannot expand {}",
                entity_type,
                navigation.name()
            )))
        }
    }

    fn full_selection(&self, entity_type: EntityType) -> (Vec<Property>, Vec<Column>) {
        (
            self.schema.all_properties(entity_type),
            self.fields.layout(entity_type).columns().to_vec(),
        )
    }

    fn property_selection(
        &self,
        entity_type: EntityType,
        property: EntityProperty,
    ) -> StoreResult<(Vec<Property>, Vec<Column>)> {
        let selection = vec![Property::Entity(property)];
        let projection = self.projection(entity_type, &selection)?;
        Ok((selection, projection))
    }

    /// `$select` plus the id and the first hop of every expand.
    fn explicit_selection(
        &self,
        entity_type: EntityType,
        query: &Query,
    ) -> StoreResult<(Vec<Property>, Vec<Column>)> {
        let mut selection: Vec<Property> = vec![];
        let implied = [Property::Entity(EntityProperty::Id)]
            .into_iter()
            .chain(query.expand.iter().map(|e| Property::Navigation(e.navigation)));
        for property in query.select.iter().copied().chain(implied) {
            if !self.schema.has_property(entity_type, property) {
                return Err(StoreError::IllegalArgument(format!(
                    "{} has no property {}",
                    entity_type, property
                )));
            }
            if !selection.contains(&property) {
                selection.push(property);
            }
        }
        let projection = self.projection(entity_type, &selection)?;
        Ok((selection, projection))
    }

    /// Id column plus the columns backing `selection`, in layout order.
    fn projection(
        &self,
        entity_type: EntityType,
        selection: &[Property],
    ) -> StoreResult<Vec<Column>> {
        let mut columns = vec![self.fields.id_column(entity_type)];
        for property in selection {
            columns.extend(self.fields.mapping(entity_type, *property)?.columns());
        }
        columns.sort_by_key(|c| c.index);
        columns.dedup_by_key(|c| c.index);
        Ok(columns)
    }
}
