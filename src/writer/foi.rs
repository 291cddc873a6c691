//! FeatureOfInterest generation from a Thing's Location.

use crate::error::{StoreError, StoreResult};
use crate::fields::{Decoded, SqlValue};
use crate::model::{Entity, EntityId, EntityProperty, EntityType, NavigationProperty};

use super::EntityWriter;

/// Location properties copied onto the generated feature.
const COPIED: [(EntityProperty, EntityProperty); 4] = [
    (EntityProperty::Name, EntityProperty::Name),
    (EntityProperty::Description, EntityProperty::Description),
    (EntityProperty::EncodingType, EntityProperty::EncodingType),
    (EntityProperty::Location, EntityProperty::Feature),
];

impl EntityWriter<'_, '_> {
    /// Feature for an Observation posted without one: derived from the
    /// first Location of the Thing behind its (Multi)Datastream.
    pub(super) fn feature_for_observation(
        &mut self,
        datastream: Option<EntityId>,
        multi_datastream: Option<EntityId>,
    ) -> StoreResult<EntityId> {
        let (owner_type, owner) = match (datastream, multi_datastream) {
            (Some(id), _) => (EntityType::Datastream, id),
            (None, Some(id)) => (EntityType::MultiDatastream, id),
            (None, None) => {
                return Err(StoreError::IncompleteEntity(
                    "an Observation needs a Datastream or a MultiDatastream".into(),
                ))
            }
        };
        let thing = self
            .related_ids(owner_type, owner, NavigationProperty::Thing)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StoreError::illegal_state(format!("{}({}) has no Thing", owner_type, owner))
            })?;
        let location = self
            .related_ids(EntityType::Thing, thing, NavigationProperty::Locations)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StoreError::NoSuchEntity(format!(
                    "no FeatureOfInterest given and Thing({}) has no Location",
                    thing
                ))
            })?;
        self.feature_for_location(location)
    }

    /// The Location's cached feature, generated on first use.
    fn feature_for_location(&mut self, location: EntityId) -> StoreResult<EntityId> {
        let row = self
            .load(EntityType::Location, location)?
            .ok_or_else(|| StoreError::NoSuchEntity(format!("Location({})", location)))?;
        let cache = self.fields().generated_foi_column();
        if let Some(feature) = row.get(cache.index).as_i64().map(EntityId) {
            if self.exists(EntityType::FeatureOfInterest, feature)? {
                return Ok(feature);
            }
        }

        let mut feature = Entity::new(EntityType::FeatureOfInterest);
        for (from, to) in COPIED {
            if let Decoded::Value(value) = self.fields().read(EntityType::Location, from, &row)? {
                if !value.is_null() {
                    feature.set(to, value);
                }
            }
        }
        let id = self.insert(&feature, None, true)?;
        log::debug!("generated FeatureOfInterest({}) from Location({})", id, location);
        self.update_columns(
            EntityType::Location,
            location,
            &[(cache, SqlValue::Integer(id.0))],
        )?;
        Ok(id)
    }
}
