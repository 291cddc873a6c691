//! Datastream and MultiDatastream time bounds.
//!
//! Inserting an Observation widens its owner's phenomenonTime and
//! resultTime bounds in place. Moving or deleting Observations recomputes
//! them from what is left; an owner without observations ends up with
//! null bounds.

use crate::error::{StoreError, StoreResult};
use crate::fields::{Column, FieldMapping, FieldRegistry, SqlValue};
use crate::model::{EntityId, EntityProperty, EntityType, NavigationProperty};
use crate::sql::{col, lit_int, lit_str, max, min, Expr, ExprExt, Query as SqlQuery, TableRef, Update};

use super::{assignment_expr, EntityWriter};

/// Navigation from an Observation to each kind of owner.
pub(super) const OWNERS: [NavigationProperty; 2] = [
    NavigationProperty::Datastream,
    NavigationProperty::MultiDatastream,
];

impl EntityWriter<'_, '_> {
    /// Stretch the owner's bounds to cover one Observation.
    pub(super) fn widen_bounds(&mut self, observation: EntityId) -> StoreResult<()> {
        let fields = self.fields();
        let row = self
            .load(EntityType::Observation, observation)?
            .ok_or_else(|| {
                StoreError::illegal_state(format!("Observation({}) vanished", observation))
            })?;
        let (phenomenon_start, phenomenon_end) =
            time_columns(fields, EntityType::Observation, EntityProperty::PhenomenonTime)?;
        let result_time = instant_column(fields)?;

        for navigation in OWNERS {
            let Some(owner) = self.foreign_key(EntityType::Observation, &row, navigation)? else {
                continue;
            };
            let owner_type = navigation.target();
            let (start, end) = time_columns(fields, owner_type, EntityProperty::PhenomenonTime)?;
            let (result_start, result_end) =
                time_columns(fields, owner_type, EntityProperty::ResultTime)?;

            let mut sets = vec![];
            if let Some(t) = row.get(phenomenon_start.index).as_text() {
                sets.push((start.name, lower_bound(start.name, t)));
            }
            if let Some(t) = row.get(phenomenon_end.index).as_text() {
                sets.push((end.name, upper_bound(end.name, t)));
            }
            if let Some(t) = row.get(result_time.index).as_text() {
                sets.push((result_start.name, lower_bound(result_start.name, t)));
                sets.push((result_end.name, upper_bound(result_end.name, t)));
            }
            if sets.is_empty() {
                continue;
            }
            self.session.execute(
                &Update::table(self.schema().table(owner_type))
                    .set_many(sets)
                    .filter(col("id").eq(lit_int(owner.0))),
            )?;
        }
        Ok(())
    }

    /// Recompute an owner's bounds from its remaining Observations.
    pub(super) fn recompute_bounds(
        &mut self,
        owner_type: EntityType,
        owner: EntityId,
    ) -> StoreResult<()> {
        let fields = self.fields();
        let navigation = OWNERS
            .into_iter()
            .find(|n| n.target() == owner_type)
            .ok_or_else(|| StoreError::illegal_state(format!("{} has no time bounds", owner_type)))?;
        let key = match fields.mapping(EntityType::Observation, navigation)? {
            FieldMapping::ForeignKey { column, .. } => *column,
            _ => return Err(StoreError::illegal_state("observation owner is not a foreign key")),
        };
        let (phenomenon_start, phenomenon_end) =
            time_columns(fields, EntityType::Observation, EntityProperty::PhenomenonTime)?;
        let result_time = instant_column(fields)?;

        let observations = TableRef::new(self.schema().table(EntityType::Observation));
        let query = SqlQuery::new()
            .select(vec![
                min(observations.col(phenomenon_start.name)),
                max(observations.col(phenomenon_end.name)),
                min(observations.col(result_time.name)),
                max(observations.col(result_time.name)),
            ])
            .from(observations.clone())
            .filter(observations.col(key.name).eq(lit_int(owner.0)));
        let aggregates = self
            .session
            .fetch_values(&query)?
            .into_iter()
            .next()
            .unwrap_or_default();
        let aggregate = |i: usize| aggregates.get(i).cloned().unwrap_or(SqlValue::Null);

        let (start, end) = time_columns(fields, owner_type, EntityProperty::PhenomenonTime)?;
        let (result_start, result_end) = time_columns(fields, owner_type, EntityProperty::ResultTime)?;
        let assignments = [
            (start, aggregate(0)),
            (end, aggregate(1)),
            (result_start, aggregate(2)),
            (result_end, aggregate(3)),
        ];
        self.session.execute(
            &Update::table(self.schema().table(owner_type))
                .set_many(assignments.iter().map(|(c, v)| (c.name, assignment_expr(c, v))))
                .filter(col("id").eq(lit_int(owner.0))),
        )?;
        Ok(())
    }
}

fn time_columns(
    fields: &FieldRegistry,
    entity_type: EntityType,
    property: EntityProperty,
) -> StoreResult<(Column, Column)> {
    match fields.mapping(entity_type, property)? {
        FieldMapping::TimePair { start, end, .. } => Ok((*start, *end)),
        _ => Err(StoreError::illegal_state(format!(
            "{}.{} is not a time pair",
            entity_type,
            property.name()
        ))),
    }
}

fn instant_column(fields: &FieldRegistry) -> StoreResult<Column> {
    fields
        .mapping(EntityType::Observation, EntityProperty::ResultTime)?
        .columns()
        .first()
        .copied()
        .ok_or_else(|| StoreError::illegal_state("Observation.resultTime has no column"))
}

/// `CASE WHEN c IS NULL OR c > t THEN t ELSE c END`
fn lower_bound(column: &str, timestamp: &str) -> Expr {
    bound(col(column).is_null().or(col(column).gt(lit_str(timestamp))), column, timestamp)
}

/// `CASE WHEN c IS NULL OR c < t THEN t ELSE c END`
fn upper_bound(column: &str, timestamp: &str) -> Expr {
    bound(col(column).is_null().or(col(column).lt(lit_str(timestamp))), column, timestamp)
}

fn bound(replace: Expr, column: &str, timestamp: &str) -> Expr {
    Expr::Case {
        operand: None,
        when_clauses: vec![(replace, lit_str(timestamp))],
        else_clause: Some(Box::new(col(column))),
    }
}
