//! Cascading create.

use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::fields::{SqlValue, WriteContext};
use crate::model::{
    Entity, EntityId, EntityProperty, EntityType, NavigationProperty, Property, Value,
};
use crate::schema::{JoinShape, Relation, RelationKind};
use crate::sql::{col, lit_int, max, ExprExt, Insert, Query as SqlQuery, TableRef};

use super::{assignment_expr, check_arity, list_len, EntityChangedMessage, EntityWriter};

/// The parent a child row is written under, for one-to-many relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ParentLink {
    /// Navigation from the child to the parent.
    pub navigation: NavigationProperty,
    pub id: EntityId,
}

/// How a nested entity ended up in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Persisted {
    /// It already existed and was linked.
    Linked(EntityId),
    Inserted(EntityId),
}

impl Persisted {
    pub fn id(&self) -> EntityId {
        match self {
            Persisted::Linked(id) | Persisted::Inserted(id) => *id,
        }
    }
}

impl EntityWriter<'_, '_> {
    /// Create an entity with everything nested in it.
    ///
    /// The whole payload is checked for completeness before any row is
    /// written.
    pub fn create(&mut self, entity: &Entity) -> StoreResult<EntityId> {
        self.check_complete(entity, None)?;
        self.insert(entity, None, false)
    }

    /// Link an existing entity or insert a new one.
    pub(super) fn ensure_persisted(
        &mut self,
        entity: &Entity,
        parent: Option<ParentLink>,
    ) -> StoreResult<Persisted> {
        let entity_type = entity.entity_type;
        match entity.id {
            Some(id) if self.exists(entity_type, id)? => {
                if let Some(parent) = parent {
                    self.reassign(entity_type, id, parent)?;
                }
                Ok(Persisted::Linked(id))
            }
            Some(id) if entity.properties().next().is_none() && entity.links().next().is_none() => {
                Err(StoreError::NoSuchEntity(format!("{}({})", entity_type, id)))
            }
            Some(id) => {
                // an unknown id is only created when the payload is complete
                self.check_complete(entity, parent.map(|p| p.navigation))
                    .map_err(|e| match e {
                        StoreError::IncompleteEntity(_) => {
                            StoreError::NoSuchEntity(format!("{}({})", entity_type, id))
                        }
                        other => other,
                    })?;
                Ok(Persisted::Inserted(self.insert(entity, parent, false)?))
            }
            None => {
                self.check_complete(entity, parent.map(|p| p.navigation))?;
                Ok(Persisted::Inserted(self.insert(entity, parent, false)?))
            }
        }
    }

    /// Check required properties and relations of a new entity and of every
    /// new entity nested in it. `provided` is the relation the caller will
    /// fill in.
    pub(super) fn check_complete(
        &self,
        entity: &Entity,
        provided: Option<NavigationProperty>,
    ) -> StoreResult<()> {
        let entity_type = entity.entity_type;
        for def in self.schema().property_defs(entity_type) {
            if def.required && entity.get(def.property).map_or(true, Value::is_null) {
                return Err(StoreError::IncompleteEntity(format!(
                    "{}.{} is required",
                    entity_type,
                    def.property.name()
                )));
            }
        }

        for relation in self.schema().relations(entity_type) {
            let navigation = relation.navigation;
            if relation.kind == RelationKind::ManyToOne {
                let target = entity.single(navigation);
                if relation.required && target.is_none() && provided != Some(navigation) {
                    return Err(StoreError::IncompleteEntity(format!(
                        "{}.{} is required",
                        entity_type,
                        navigation.name()
                    )));
                }
                if let Some(target) = target.filter(|t| t.id.is_none()) {
                    self.check_complete(target, None)?;
                }
            } else {
                let members = entity.members(navigation);
                if relation.required && members.is_empty() {
                    return Err(StoreError::IncompleteEntity(format!(
                        "{}.{} needs at least one member",
                        entity_type,
                        navigation.name()
                    )));
                }
                for member in members.iter().filter(|m| m.id.is_none()) {
                    self.check_complete(member, Some(relation.inverse))?;
                }
            }
        }

        if entity_type == EntityType::Observation {
            let has = |n| entity.single(n).is_some() || provided == Some(n);
            check_observation_owner(
                has(NavigationProperty::Datastream),
                has(NavigationProperty::MultiDatastream),
            )?;
        }
        Ok(())
    }

    /// Insert one entity after its singular relations, then its collections.
    ///
    /// `generated` entities are created by the store itself and bypass the
    /// client id policy.
    pub(super) fn insert(
        &mut self,
        entity: &Entity,
        parent: Option<ParentLink>,
        generated: bool,
    ) -> StoreResult<EntityId> {
        let entity_type = entity.entity_type;
        let schema = self.schema();
        let fields = self.fields();

        if entity_type == EntityType::MultiDatastream {
            check_arity(
                entity
                    .get(EntityProperty::MultiObservationDataTypes)
                    .map_or(0, list_len),
                entity
                    .get(EntityProperty::UnitOfMeasurements)
                    .map_or(0, list_len),
                entity.members(NavigationProperty::ObservedProperties).len(),
            )?;
        }

        let relations: Vec<&Relation> = schema.relations(entity_type).collect();

        let mut keys: BTreeMap<NavigationProperty, EntityId> = BTreeMap::new();
        if let Some(parent) = parent {
            keys.insert(parent.navigation, parent.id);
        }
        for relation in &relations {
            if !matches!(relation.join, JoinShape::SourceForeignKey { .. })
                || keys.contains_key(&relation.navigation)
            {
                continue;
            }
            if let Some(target) = entity.single(relation.navigation) {
                let id = self.ensure_persisted(target, None)?.id();
                keys.insert(relation.navigation, id);
            }
        }

        let mut values: BTreeMap<EntityProperty, Value> = entity
            .properties()
            .map(|(p, v)| (*p, v.clone()))
            .collect();

        if entity_type == EntityType::Observation {
            if let Some(multi) = keys.get(&NavigationProperty::MultiDatastream) {
                self.check_result_arity(values.get(&EntityProperty::Result), *multi)?;
            }
            if !keys.contains_key(&NavigationProperty::FeatureOfInterest) {
                let feature = self.feature_for_observation(
                    keys.get(&NavigationProperty::Datastream).copied(),
                    keys.get(&NavigationProperty::MultiDatastream).copied(),
                )?;
                keys.insert(NavigationProperty::FeatureOfInterest, feature);
            }
            let phenomenon_time = values.entry(EntityProperty::PhenomenonTime).or_insert(Value::Null);
            if phenomenon_time.is_null() {
                *phenomenon_time = Value::from(self.now);
            }
        }

        let encoding = values
            .get(&EntityProperty::EncodingType)
            .and_then(Value::as_text)
            .map(str::to_string);
        let ctx = WriteContext {
            encoding_type: encoding.as_deref(),
        };

        let mut assignments = vec![];
        for (property, value) in &values {
            let def = schema.property_def(entity_type, *property).map_err(|_| {
                StoreError::IllegalArgument(format!(
                    "{} has no property {}",
                    entity_type,
                    property.name()
                ))
            })?;
            if def.derived {
                log::warn!(
                    "ignoring client value for derived {}.{}",
                    entity_type,
                    property.name()
                );
                continue;
            }
            assignments.extend(fields.write(entity_type, *property, value, &ctx)?);
        }
        for def in schema.property_defs(entity_type).iter().filter(|d| d.derived) {
            assignments.extend(fields.mapping(entity_type, def.property)?.empty_bounds());
        }
        for (navigation, id) in &keys {
            assignments.extend(fields.mapping(entity_type, *navigation)?.write_reference(Some(*id))?);
        }

        let client_id = if generated {
            None
        } else {
            self.id_mode.resolve(entity_type, entity.id)?
        };
        if let Some(id) = client_id {
            assignments.insert(0, (fields.id_column(entity_type), SqlValue::Integer(id.0)));
        }

        let insert = Insert::into(schema.table(entity_type))
            .columns(assignments.iter().map(|(c, _)| c.name))
            .values(assignments.iter().map(|(c, v)| assignment_expr(c, v)));
        let id = self.session.insert_returning_id(insert)?;

        for relation in &relations {
            let members = entity.members(relation.navigation);
            match relation.join {
                JoinShape::TargetForeignKey { .. } => {
                    for member in members {
                        let parent = ParentLink {
                            navigation: relation.inverse,
                            id,
                        };
                        self.ensure_persisted(member, Some(parent))?;
                    }
                }
                JoinShape::Link(_) => {
                    for member in members {
                        let target = self.ensure_persisted(member, None)?.id();
                        self.add_link(relation, id, target)?;
                    }
                }
                JoinShape::SourceForeignKey { .. } => {}
            }
        }

        match entity_type {
            EntityType::Thing if !entity.members(NavigationProperty::Locations).is_empty() => {
                let locations = self.related_ids(entity_type, id, NavigationProperty::Locations)?;
                self.record_history(id, &locations)?;
            }
            EntityType::Location if !entity.members(NavigationProperty::Things).is_empty() => {
                for thing in self.related_ids(entity_type, id, NavigationProperty::Things)? {
                    self.replace_locations(thing, &[id])?;
                }
            }
            EntityType::Observation => self.widen_bounds(id)?,
            _ => {}
        }

        let mut changed = entity.supplied();
        changed.push(Property::Entity(EntityProperty::Id));
        self.record(EntityChangedMessage::created(entity_type, id, changed));
        Ok(id)
    }

    /// Move an existing child under a new parent.
    pub(super) fn reassign(
        &mut self,
        entity_type: EntityType,
        id: EntityId,
        parent: ParentLink,
    ) -> StoreResult<()> {
        let previous = match self.load(entity_type, id)? {
            Some(row) => self.foreign_key(entity_type, &row, parent.navigation)?,
            None => return Err(StoreError::NoSuchEntity(format!("{}({})", entity_type, id))),
        };
        if previous == Some(parent.id) {
            return Ok(());
        }
        let assignments = self
            .fields()
            .mapping(entity_type, parent.navigation)?
            .write_reference(Some(parent.id))?;
        self.update_columns(entity_type, id, &assignments)?;

        if entity_type == EntityType::Observation {
            let owner_type = parent.navigation.target();
            self.recompute_bounds(owner_type, parent.id)?;
            if let Some(previous) = previous {
                self.recompute_bounds(owner_type, previous)?;
            }
        }
        self.record(EntityChangedMessage::updated(
            entity_type,
            id,
            [Property::Navigation(parent.navigation)].into(),
        ));
        Ok(())
    }

    /// Insert a link row unless the pair is already linked. Ranked links
    /// append after the owner's current last member.
    pub(super) fn add_link(
        &mut self,
        relation: &Relation,
        source: EntityId,
        target: EntityId,
    ) -> StoreResult<()> {
        let link = relation.link_table().ok_or_else(|| {
            StoreError::illegal_state(format!("{} has no link table", relation))
        })?;
        let table = TableRef::new(link.table);
        let existing = SqlQuery::new()
            .select(vec![table.col(link.source_column)])
            .from(table.clone())
            .filter(table.col(link.source_column).eq(lit_int(source.0)))
            .filter(table.col(link.target_column).eq(lit_int(target.0)));
        if !self.session.fetch_values(&existing)?.is_empty() {
            return Ok(());
        }

        let mut columns = vec![link.source_column, link.target_column];
        let mut values = vec![lit_int(source.0), lit_int(target.0)];
        if let Some(rank) = link.rank_column {
            let (owner_column, owner) = if relation.owning {
                (link.source_column, source)
            } else {
                (link.target_column, target)
            };
            let last = SqlQuery::new()
                .select(vec![max(col(rank))])
                .from(table.clone())
                .filter(col(owner_column).eq(lit_int(owner.0)));
            let next = self.session.scalar_i64(&last)?.map_or(0, |r| r + 1);
            columns.push(rank);
            values.push(lit_int(next));
        }
        self.session
            .execute(&Insert::into(link.table).columns(columns).values(values))?;
        Ok(())
    }

    /// A MultiDatastream observation carries one result per ObservedProperty.
    pub(super) fn check_result_arity(
        &self,
        result: Option<&Value>,
        multi_datastream: EntityId,
    ) -> StoreResult<()> {
        let expected = self
            .related_ids(
                EntityType::MultiDatastream,
                multi_datastream,
                NavigationProperty::ObservedProperties,
            )?
            .len();
        match result {
            Some(Value::Json(serde_json::Value::Array(items))) if items.len() == expected => Ok(()),
            _ => Err(StoreError::IllegalArgument(format!(
                "result of a MultiDatastream({}) observation must be an array of {} values",
                multi_datastream, expected
            ))),
        }
    }
}

/// An Observation belongs to exactly one of a Datastream or a MultiDatastream.
pub(super) fn check_observation_owner(datastream: bool, multi_datastream: bool) -> StoreResult<()> {
    match (datastream, multi_datastream) {
        (true, true) => Err(StoreError::IllegalArgument(
            "an Observation cannot have both a Datastream and a MultiDatastream".into(),
        )),
        (false, false) => Err(StoreError::IncompleteEntity(
            "an Observation needs a Datastream or a MultiDatastream".into(),
        )),
        _ => Ok(()),
    }
}
