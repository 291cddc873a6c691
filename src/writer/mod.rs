//! Entity relationship writer.
//!
//! Persists entity payloads inside one [`Session`]. A create walks the
//! payload recursively: singular relations are linked or inserted before
//! the row that references them, collections after it. Along the way the
//! writer generates FeaturesOfInterest, keeps HistoricalLocations and the
//! Datastream time bounds current, and collects one
//! [`EntityChangedMessage`] per touched entity.
//!
//! ```text
//! create(Datastream)
//!   ├─ Thing        exists?  ── link
//!   ├─ Sensor       new      ── insert ─┐
//!   ├─ Datastream   insert ◄────────────┘
//!   └─ Observations insert (datastream_id = new id), widen bounds
//! ```

mod change;
mod delete;
mod foi;
mod history;
mod id_policy;
mod insert;
mod time_bounds;
mod update;

use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::fields::{Column, ColumnType, Decoded, FieldRegistry, SqlValue, StoredRow};
use crate::model::{EntityId, EntityProperty, EntityType, NavigationProperty, Value};
use crate::resolver::PathResolver;
use crate::schema::SchemaRegistry;
use crate::sql::{col, lit_int, Expr, ExprExt, Query as SqlQuery, TableRef, Update};
use crate::store::Session;

pub use change::{ChangeKind, EntityChangedMessage};
pub use id_policy::IdGenerationMode;

/// Writes entities through one session; create a fresh writer per request.
pub struct EntityWriter<'s, 'c> {
    session: &'s Session<'c>,
    resolver: PathResolver<'s>,
    id_mode: IdGenerationMode,
    now: DateTime<Utc>,
    changes: Vec<EntityChangedMessage>,
}

impl<'s, 'c> EntityWriter<'s, 'c> {
    pub fn new(
        session: &'s Session<'c>,
        resolver: PathResolver<'s>,
        id_mode: IdGenerationMode,
    ) -> Self {
        Self {
            session,
            resolver,
            id_mode,
            now: Utc::now(),
            changes: vec![],
        }
    }

    /// Fix the time used for defaulted phenomenonTime and new
    /// HistoricalLocations.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn changes(&self) -> &[EntityChangedMessage] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<EntityChangedMessage> {
        self.changes
    }

    fn schema(&self) -> &'s SchemaRegistry {
        self.resolver.schema()
    }

    fn fields(&self) -> &'s FieldRegistry {
        self.resolver.fields()
    }

    fn record(&mut self, message: EntityChangedMessage) {
        log::debug!(
            "{:?} {}({})",
            message.kind,
            message.entity_type,
            message.id
        );
        self.changes.push(message);
    }

    fn exists(&self, entity_type: EntityType, id: EntityId) -> StoreResult<bool> {
        let query = self.resolver.resolve_exists(entity_type, id)?;
        Ok(!self.session.fetch_ids(&query)?.is_empty())
    }

    fn require_exists(&self, entity_type: EntityType, id: EntityId) -> StoreResult<()> {
        if self.exists(entity_type, id)? {
            Ok(())
        } else {
            Err(StoreError::NoSuchEntity(format!("{}({})", entity_type, id)))
        }
    }

    fn related_ids(
        &self,
        entity_type: EntityType,
        id: EntityId,
        navigation: NavigationProperty,
    ) -> StoreResult<Vec<EntityId>> {
        let query = self
            .resolver
            .resolve_related_ids(entity_type, id, navigation)?;
        self.session.fetch_ids(&query)
    }

    /// Every stored column of one entity.
    fn load(&self, entity_type: EntityType, id: EntityId) -> StoreResult<Option<StoredRow>> {
        let layout = self.fields().layout(entity_type);
        let table = TableRef::new(layout.table);
        let query = SqlQuery::new()
            .select(
                layout
                    .columns()
                    .iter()
                    .map(|c| table.col(c.name))
                    .collect::<Vec<_>>(),
            )
            .from(table.clone())
            .filter(table.col("id").eq(lit_int(id.0)));
        Ok(self
            .session
            .fetch_rows(&query, layout.columns(), layout.len())?
            .into_iter()
            .next())
    }

    fn stored_value(
        &self,
        entity_type: EntityType,
        property: EntityProperty,
        row: &StoredRow,
    ) -> StoreResult<Value> {
        match self.fields().read(entity_type, property, row)? {
            Decoded::Value(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    fn foreign_key(
        &self,
        entity_type: EntityType,
        row: &StoredRow,
        navigation: NavigationProperty,
    ) -> StoreResult<Option<EntityId>> {
        match self.fields().read(entity_type, navigation, row)? {
            Decoded::Reference(id) => Ok(id),
            _ => Ok(None),
        }
    }

    /// `UPDATE table SET ... WHERE id = ?`; returns the affected row count.
    fn update_columns(
        &self,
        entity_type: EntityType,
        id: EntityId,
        assignments: &[(Column, SqlValue)],
    ) -> StoreResult<usize> {
        let update = Update::table(self.schema().table(entity_type))
            .set_many(assignments.iter().map(|(c, v)| (c.name, assignment_expr(c, v))))
            .filter(col("id").eq(lit_int(id.0)));
        self.session.execute(&update)
    }
}

/// SQL value of one column assignment.
fn assignment_expr(column: &Column, value: &SqlValue) -> Expr {
    match column.column_type {
        ColumnType::Geometry if !value.is_null() => Expr::GeomFromGeoJson(Box::new(value.to_expr())),
        _ => value.to_expr(),
    }
}

/// Length of a list-valued property.
fn list_len(value: &Value) -> usize {
    match value {
        Value::Texts(items) => items.len(),
        Value::Units(items) => items.len(),
        Value::Json(serde_json::Value::Array(items)) => items.len(),
        _ => 0,
    }
}

/// A MultiDatastream carries one data type and one unit per ObservedProperty.
fn check_arity(types: usize, units: usize, properties: usize) -> StoreResult<()> {
    if types == properties && units == properties {
        Ok(())
    } else {
        Err(StoreError::IllegalArgument(format!(
            "MultiDatastream has {} observation types, {} units and {} observed properties",
            types, units, properties
        )))
    }
}
