//! HistoricalLocation bookkeeping.

use crate::error::{StoreError, StoreResult};
use crate::model::{Entity, EntityId, EntityProperty, EntityType, NavigationProperty};
use crate::sql::{col, lit_int, Delete, ExprExt};

use super::EntityWriter;

impl EntityWriter<'_, '_> {
    /// Record that a Thing is at `locations` now.
    pub(super) fn record_history(
        &mut self,
        thing: EntityId,
        locations: &[EntityId],
    ) -> StoreResult<EntityId> {
        let history = Entity::new(EntityType::HistoricalLocation)
            .with(EntityProperty::Time, self.now)
            .with_link(
                NavigationProperty::Thing,
                Entity::reference(EntityType::Thing, thing.0),
            )
            .with_members(
                NavigationProperty::Locations,
                locations
                    .iter()
                    .map(|l| Entity::reference(EntityType::Location, l.0))
                    .collect(),
            );
        self.insert(&history, None, true)
    }

    /// Make `locations` the Thing's only current Locations.
    pub(super) fn replace_locations(
        &mut self,
        thing: EntityId,
        locations: &[EntityId],
    ) -> StoreResult<()> {
        let relation = self
            .schema()
            .relation(EntityType::Thing, NavigationProperty::Locations)?;
        let link = relation.link_table().ok_or_else(|| {
            StoreError::illegal_state(format!("{} has no link table", relation))
        })?;
        self.session.execute(
            &Delete::from(link.table).filter(col(link.source_column).eq(lit_int(thing.0))),
        )?;
        for location in locations {
            self.add_link(relation, thing, *location)?;
        }
        self.record_history(thing, locations)?;
        Ok(())
    }
}
