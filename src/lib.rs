//! # SensorThings core
//!
//! Persistence core of a SensorThings-style IoT data service: it compiles
//! resource paths and query options into SQL and writes nested entity
//! payloads with their relationships intact.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │      ResourcePath + Query         Entity payloads        │
//! │  (Things(1)/Datastreams?...)   (nested, partial, refs)   │
//! └─────────────────────────────────────────────────────────┘
//!                │                          │
//!                ▼ [resolver]               ▼ [writer]
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │  joins, DISTINCT, order, │  │  link-or-insert cascade, │
//! │  filter, paging, count   │  │  FOI, history, bounds    │
//! └──────────────────────────┘  └──────────────────────────┘
//!                │                          │
//!                └────────────┬─────────────┘
//!                             ▼ [schema + fields registries]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Relation graph       Property → column mappings     │
//! └─────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼ [sql builder, store]
//! ┌─────────────────────────────────────────────────────────┐
//! │            SQLite (rusqlite) / PostgreSQL DDL            │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fields;
pub mod model;
pub mod query;
pub mod resolver;
pub mod schema;
pub mod sql;
pub mod store;
pub mod writer;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::{ErrorClass, StoreError, StoreResult};
    pub use crate::model::{
        Entity, EntityId, EntityProperty, EntityType, Link, NavigationProperty, Property,
        TimeValue, UnitOfMeasurement, Value,
    };
    pub use crate::query::{prop, Expand, FilterExpr, Query, ResourcePath, SortDir};
    pub use crate::resolver::{PathResolver, ResolvedQuery};
    pub use crate::sql::Dialect;
    pub use crate::store::{EntityCollection, ReadOutcome, Store, WriteOutcome};
    pub use crate::writer::{ChangeKind, EntityChangedMessage, IdGenerationMode};
}

pub use error::{StoreError, StoreResult};
pub use store::Store;
