//! Notifications emitted for every entity a write touched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{EntityId, EntityType, Property};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One entity changed by a committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityChangedMessage {
    pub kind: ChangeKind,
    pub entity_type: EntityType,
    pub id: EntityId,
    /// Supplied properties for creates and updates; empty for deletes.
    pub changed: BTreeSet<Property>,
}

impl EntityChangedMessage {
    pub fn created(
        entity_type: EntityType,
        id: EntityId,
        changed: impl IntoIterator<Item = Property>,
    ) -> Self {
        Self {
            kind: ChangeKind::Created,
            entity_type,
            id,
            changed: changed.into_iter().collect(),
        }
    }

    pub fn updated(entity_type: EntityType, id: EntityId, changed: BTreeSet<Property>) -> Self {
        Self {
            kind: ChangeKind::Updated,
            entity_type,
            id,
            changed,
        }
    }

    pub fn deleted(entity_type: EntityType, id: EntityId) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            entity_type,
            id,
            changed: BTreeSet::new(),
        }
    }
}
