//! Schema/relation registry.
//!
//! A directed graph whose nodes are [`EntityType`]s and whose edges are
//! [`Relation`]s, one per navigation property. Both directions of every
//! relation pair are edges of their own so each can carry its own
//! distinct-on-read flag. Lookups of undeclared relations are
//! [`SchemaError`]s, which the store classifies as internal errors.

mod registry;
pub mod relation;

pub use registry::{global, SchemaRegistry};
pub use relation::{JoinShape, LinkTable, Relation, RelationKind};

use crate::model::{EntityProperty, EntityType};

/// Errors raised by registry lookups. These indicate defects, not bad input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("{entity_type} has no relation named {navigation}")]
    UnknownRelation {
        entity_type: EntityType,
        navigation: String,
    },

    #[error("{entity_type} has no property named {property}")]
    UnknownProperty {
        entity_type: EntityType,
        property: String,
    },

    #[error("{entity_type}.{navigation} points at the wrong entity type")]
    TargetMismatch {
        entity_type: EntityType,
        navigation: String,
    },

    #[error("{entity_type}.{navigation} has no matching inverse relation")]
    MissingInverse {
        entity_type: EntityType,
        navigation: String,
    },

    #[error("Relation {relation} has {owners} owning directions, expected 1")]
    Ownership { relation: String, owners: usize },
}

/// Result type for registry lookups.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Declaration of an entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    pub property: EntityProperty,
    /// A new entity must supply it.
    pub required: bool,
    /// It may be set to null.
    pub nullable: bool,
    /// Maintained by the store; client values are ignored.
    pub derived: bool,
}

impl PropertyDef {
    pub fn required(property: EntityProperty) -> Self {
        Self {
            property,
            required: true,
            nullable: false,
            derived: false,
        }
    }

    pub fn optional(property: EntityProperty) -> Self {
        Self {
            property,
            required: false,
            nullable: true,
            derived: false,
        }
    }

    pub fn derived(property: EntityProperty) -> Self {
        Self {
            property,
            required: false,
            nullable: true,
            derived: true,
        }
    }

    /// A fixed value the client may echo but not change.
    pub fn constant(property: EntityProperty) -> Self {
        Self {
            property,
            required: false,
            nullable: false,
            derived: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}
