//! Partial updates.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{StoreError, StoreResult};
use crate::fields::{SqlValue, StoredRow, WriteContext};
use crate::model::{Entity, EntityId, EntityProperty, EntityType, Link, NavigationProperty, Property};
use crate::schema::{JoinShape, Relation};

use super::insert::{check_observation_owner, ParentLink};
use super::time_bounds::OWNERS;
use super::{check_arity, list_len, EntityChangedMessage, EntityWriter};

impl EntityWriter<'_, '_> {
    /// Apply the supplied properties and relations of `patch` to an
    /// existing entity. Related entities must already exist; updates never
    /// create them.
    pub fn update(
        &mut self,
        entity_type: EntityType,
        id: EntityId,
        patch: &Entity,
    ) -> StoreResult<()> {
        let schema = self.schema();
        let fields = self.fields();
        let row = self
            .load(entity_type, id)?
            .ok_or_else(|| StoreError::NoSuchEntity(format!("{}({})", entity_type, id)))?;
        let relations: Vec<&Relation> = schema.relations(entity_type).collect();
        let mut changed: BTreeSet<Property> = BTreeSet::new();
        let mut assignments = vec![];

        let encoding = match patch.get(EntityProperty::EncodingType) {
            Some(value) => value.as_text().map(str::to_string),
            None if schema.has_property(entity_type, EntityProperty::EncodingType.into()) => self
                .stored_value(entity_type, EntityProperty::EncodingType, &row)?
                .as_text()
                .map(str::to_string),
            None => None,
        };
        let ctx = WriteContext {
            encoding_type: encoding.as_deref(),
        };

        for (property, value) in patch.properties() {
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
            if value.is_null() && !def.nullable {
                return Err(StoreError::IncompleteEntity(format!(
                    "{}.{} cannot be null",
                    entity_type,
                    property.name()
                )));
            }
            assignments.extend(fields.write(entity_type, *property, value, &ctx)?);
            changed.insert(Property::Entity(*property));
        }

        let mut keys: BTreeMap<NavigationProperty, Option<EntityId>> = BTreeMap::new();
        for relation in relations
            .iter()
            .filter(|r| matches!(r.join, JoinShape::SourceForeignKey { .. }))
        {
            let navigation = relation.navigation;
            let target = match patch.link(navigation) {
                None => continue,
                Some(Link::One(Some(target))) => {
                    let target_id = target.id.ok_or_else(|| {
                        StoreError::IllegalArgument(format!(
                            "{}.{} must reference an existing entity by id",
                            entity_type,
                            navigation.name()
                        ))
                    })?;
                    self.require_exists(relation.target, target_id)?;
                    Some(target_id)
                }
                Some(Link::One(None)) => {
                    let always_set = entity_type == EntityType::Observation
                        && navigation == NavigationProperty::FeatureOfInterest;
                    if relation.required || always_set {
                        return Err(StoreError::IncompleteEntity(format!(
                            "{}.{} cannot be null",
                            entity_type,
                            navigation.name()
                        )));
                    }
                    None
                }
                Some(Link::Many(_)) => {
                    return Err(StoreError::IllegalArgument(format!(
                        "{}.{} is not a collection",
                        entity_type,
                        navigation.name()
                    )))
                }
            };
            keys.insert(navigation, target);
            assignments.extend(fields.mapping(entity_type, navigation)?.write_reference(target)?);
            changed.insert(Property::Navigation(navigation));
        }

        let mut previous_owners = vec![];
        if entity_type == EntityType::Observation {
            let mut owners = vec![];
            for navigation in OWNERS {
                let before = self.foreign_key(entity_type, &row, navigation)?;
                let after = keys.get(&navigation).copied().unwrap_or(before);
                previous_owners.push((navigation, before));
                owners.push(after);
            }
            check_observation_owner(owners[0].is_some(), owners[1].is_some())?;

            if let Some(multi) = owners[1] {
                if patch.is_set(EntityProperty::Result.into()) || owners[1] != previous_owners[1].1 {
                    let result = match patch.get(EntityProperty::Result) {
                        Some(value) => value.clone(),
                        None => self.stored_value(entity_type, EntityProperty::Result, &row)?,
                    };
                    self.check_result_arity(Some(&result), multi)?;
                }
            }
        }

        if entity_type == EntityType::MultiDatastream {
            self.check_multi_datastream_arity(id, patch, &row)?;
        }

        if entity_type == EntityType::Location
            && (patch.is_set(EntityProperty::Location.into())
                || patch.is_set(EntityProperty::EncodingType.into()))
        {
            assignments.push((fields.generated_foi_column(), SqlValue::Null));
        }

        if !assignments.is_empty() {
            match self.update_columns(entity_type, id, &assignments)? {
                0 => return Err(StoreError::NoSuchEntity(format!("{}({})", entity_type, id))),
                1 => {}
                n => {
                    return Err(StoreError::illegal_state(format!(
                        "update of {}({}) matched {} rows",
                        entity_type, id, n
                    )))
                }
            }
        }

        for relation in relations
            .iter()
            .filter(|r| !matches!(r.join, JoinShape::SourceForeignKey { .. }))
        {
            let navigation = relation.navigation;
            let members = match patch.link(navigation) {
                None => continue,
                Some(Link::Many(members)) => members,
                Some(Link::One(_)) => {
                    return Err(StoreError::IllegalArgument(format!(
                        "{}.{} is a collection",
                        entity_type,
                        navigation.name()
                    )))
                }
            };
            let mut ids = vec![];
            for member in members {
                let member_id = member.id.ok_or_else(|| {
                    StoreError::IllegalArgument(format!(
                        "{}.{} members must reference existing entities by id",
                        entity_type,
                        navigation.name()
                    ))
                })?;
                self.require_exists(relation.target, member_id)?;
                ids.push(member_id);
            }

            match (entity_type, navigation, relation.join) {
                (_, _, JoinShape::TargetForeignKey { .. }) => {
                    for member in ids {
                        let parent = ParentLink {
                            navigation: relation.inverse,
                            id,
                        };
                        self.reassign(relation.target, member, parent)?;
                    }
                }
                (EntityType::Thing, NavigationProperty::Locations, _) => {
                    self.replace_locations(id, &ids)?
                }
                (EntityType::Location, NavigationProperty::Things, _) => {
                    for thing in ids {
                        self.replace_locations(thing, &[id])?;
                    }
                }
                _ => {
                    for member in ids {
                        self.add_link(relation, id, member)?;
                    }
                }
            }
            changed.insert(Property::Navigation(navigation));
        }

        if entity_type == EntityType::Observation {
            let times_changed = patch.is_set(EntityProperty::PhenomenonTime.into())
                || patch.is_set(EntityProperty::ResultTime.into());
            for (navigation, before) in previous_owners {
                let after = keys.get(&navigation).copied().unwrap_or(before);
                if before == after && !times_changed {
                    continue;
                }
                let mut owners: Vec<EntityId> = before.into_iter().chain(after).collect();
                owners.dedup();
                for owner in owners {
                    self.recompute_bounds(navigation.target(), owner)?;
                }
            }
        }

        self.record(EntityChangedMessage::updated(entity_type, id, changed));
        Ok(())
    }

    /// Data types, units and ObservedProperties stay in step.
    fn check_multi_datastream_arity(
        &self,
        id: EntityId,
        patch: &Entity,
        row: &StoredRow,
    ) -> StoreResult<()> {
        let appended = patch.members(NavigationProperty::ObservedProperties);
        let touched = patch.is_set(EntityProperty::MultiObservationDataTypes.into())
            || patch.is_set(EntityProperty::UnitOfMeasurements.into())
            || !appended.is_empty();
        if !touched {
            return Ok(());
        }
        let length = |property: EntityProperty| -> StoreResult<usize> {
            Ok(match patch.get(property) {
                Some(value) => list_len(value),
                None => list_len(&self.stored_value(EntityType::MultiDatastream, property, row)?),
            })
        };
        let current = self.related_ids(
            EntityType::MultiDatastream,
            id,
            NavigationProperty::ObservedProperties,
        )?;
        let added = appended
            .iter()
            .filter(|m| m.id.map_or(true, |member| !current.contains(&member)))
            .count();
        check_arity(
            length(EntityProperty::MultiObservationDataTypes)?,
            length(EntityProperty::UnitOfMeasurements)?,
            current.len() + added,
        )
    }
}
