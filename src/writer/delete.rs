//! Cascading delete.

use std::collections::BTreeSet;

use crate::error::{StoreError, StoreResult};
use crate::fields::SqlValue;
use crate::model::{EntityId, EntityType, NavigationProperty};
use crate::sql::{col, lit_int, Delete, ExprExt, Update};

use super::time_bounds::OWNERS;
use super::{EntityChangedMessage, EntityWriter};

/// Datastreams and MultiDatastreams whose bounds need recomputing.
type PendingBounds = BTreeSet<(EntityType, EntityId)>;

impl EntityWriter<'_, '_> {
    /// Delete an entity and everything it owns.
    pub fn delete(&mut self, entity_type: EntityType, id: EntityId) -> StoreResult<()> {
        self.require_exists(entity_type, id)?;
        let mut pending = PendingBounds::new();
        self.delete_cascade(entity_type, id, &mut pending)?;
        for (owner_type, owner) in pending {
            if self.exists(owner_type, owner)? {
                self.recompute_bounds(owner_type, owner)?;
            }
        }
        Ok(())
    }

    fn delete_cascade(
        &mut self,
        entity_type: EntityType,
        id: EntityId,
        pending: &mut PendingBounds,
    ) -> StoreResult<()> {
        let schema = self.schema();
        for relation in schema.relations(entity_type).filter(|r| r.cascades_delete()) {
            for child in self.related_ids(entity_type, id, relation.navigation)? {
                self.delete_cascade(relation.target, child, pending)?;
            }
        }
        // a MultiDatastream cannot outlive one of its ObservedProperties
        if entity_type == EntityType::ObservedProperty {
            for multi in self.related_ids(entity_type, id, NavigationProperty::MultiDatastreams)? {
                self.delete_cascade(EntityType::MultiDatastream, multi, pending)?;
            }
        }

        let mut histories = vec![];
        match entity_type {
            EntityType::Observation => {
                if let Some(row) = self.load(entity_type, id)? {
                    for navigation in OWNERS {
                        if let Some(owner) = self.foreign_key(entity_type, &row, navigation)? {
                            pending.insert((navigation.target(), owner));
                        }
                    }
                }
            }
            EntityType::Location => {
                histories =
                    self.related_ids(entity_type, id, NavigationProperty::HistoricalLocations)?;
            }
            EntityType::FeatureOfInterest => {
                let cache = self.fields().generated_foi_column();
                self.session.execute(
                    &Update::table(schema.table(EntityType::Location))
                        .set(cache.name, SqlValue::Null.to_expr())
                        .filter(col(cache.name).eq(lit_int(id.0))),
                )?;
            }
            _ => {}
        }

        for link in schema.relations(entity_type).filter_map(|r| r.link_table()) {
            self.session.execute(
                &Delete::from(link.table).filter(col(link.source_column).eq(lit_int(id.0))),
            )?;
        }
        let deleted = self.session.execute(
            &Delete::from(schema.table(entity_type)).filter(col("id").eq(lit_int(id.0))),
        )?;
        if deleted > 1 {
            return Err(StoreError::illegal_state(format!(
                "delete of {}({}) matched {} rows",
                entity_type, id, deleted
            )));
        }
        if deleted == 1 {
            self.record(EntityChangedMessage::deleted(entity_type, id));
        }

        for history in histories {
            let orphaned = self
                .related_ids(
                    EntityType::HistoricalLocation,
                    history,
                    NavigationProperty::Locations,
                )?
                .is_empty();
            if orphaned && self.exists(EntityType::HistoricalLocation, history)? {
                self.delete_cascade(EntityType::HistoricalLocation, history, pending)?;
            }
        }
        Ok(())
    }
}
