//! Entity data model: types, properties, values and entities.

pub mod entity;
pub mod entity_type;
pub mod property;
pub mod value;

pub use entity::{Entity, EntityId, Link};
pub use entity_type::EntityType;
pub use property::{EntityProperty, NavigationProperty, Property};
pub use value::{
    format_timestamp, parse_timestamp, TimeInterval, TimeValue, UnitOfMeasurement, Value,
};
