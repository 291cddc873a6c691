//! SQLite-backed entity store.
//!
//! A [`Store`] owns one connection. Every public operation runs in its own
//! transaction: it commits when the operation succeeds and rolls back on
//! any error, so a failed cascade leaves nothing behind.
//!
//! # Example
//!
//! ```no_run
//! use sensorthings::model::{Entity, EntityProperty, EntityType};
//! use sensorthings::store::Store;
//!
//! let mut store = Store::open_in_memory()?;
//! let thing = Entity::new(EntityType::Thing)
//!     .with(EntityProperty::Name, "weather station")
//!     .with(EntityProperty::Description, "roof");
//! let created = store.create(&thing)?;
//! println!("Things({})", created.id);
//! # Ok::<(), sensorthings::error::StoreError>(())
//! ```

mod bootstrap;
mod reader;
mod session;

pub use bootstrap::{schema_ddl, schema_statements};
pub use reader::{EntityCollection, EntityReader, ReadOutcome};
pub use session::Session;

use std::path::Path;

use rusqlite::Connection;

use crate::config::{QuerySettings, Settings};
use crate::error::{StoreError, StoreResult};
use crate::fields::{self, FieldRegistry};
use crate::model::{Entity, EntityId, EntityType};
use crate::query::{Query, ResourcePath};
use crate::resolver::PathResolver;
use crate::schema::{self, SchemaRegistry};
use crate::sql::Dialect;
use crate::writer::{EntityChangedMessage, EntityWriter, IdGenerationMode};

/// Result of a create: the new root id and every change it caused.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub id: EntityId,
    pub changes: Vec<EntityChangedMessage>,
}

pub struct Store {
    conn: Connection,
    dialect: Dialect,
    schema: &'static SchemaRegistry,
    fields: &'static FieldRegistry,
    settings: QuerySettings,
    id_mode: IdGenerationMode,
}

impl Store {
    /// Open or create a database file and bootstrap its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open the configured database with the configured policies.
    pub fn from_settings(settings: &Settings) -> StoreResult<Self> {
        let database = settings
            .persistence
            .resolved_database()
            .map_err(|e| StoreError::IllegalArgument(e.to_string()))?;
        let store = if database == ":memory:" {
            Self::open_in_memory()?
        } else {
            Self::open(&database)?
        };
        Ok(store
            .with_query_settings(settings.query)
            .with_id_mode(settings.persistence.id_mode()?))
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let store = Self {
            conn,
            dialect: Dialect::Sqlite,
            schema: schema::global(),
            fields: fields::global(),
            settings: QuerySettings::default(),
            id_mode: IdGenerationMode::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn with_query_settings(mut self, settings: QuerySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_id_mode(mut self, id_mode: IdGenerationMode) -> Self {
        self.id_mode = id_mode;
        self
    }

    pub fn id_mode(&self) -> IdGenerationMode {
        self.id_mode
    }

    pub fn resolver(&self) -> PathResolver<'static> {
        PathResolver::new(self.schema, self.fields, self.settings)
    }

    /// Create every table that does not exist yet.
    pub fn init_schema(&self) -> StoreResult<()> {
        let session = Session::new(&self.conn, self.dialect);
        for statement in schema_statements(self.schema, self.fields) {
            session.execute(&statement)?;
        }
        Ok(())
    }

    pub fn read(&mut self, path: &ResourcePath, query: &Query) -> StoreResult<ReadOutcome> {
        let resolver = self.resolver();
        transaction(&mut self.conn, self.dialect, |session| {
            EntityReader::new(session, resolver).read(path, query)
        })
    }

    /// Parse a resource path such as `Things(1)/Datastreams`, then read.
    pub fn read_path(&mut self, path: &str, query: &Query) -> StoreResult<ReadOutcome> {
        let path = ResourcePath::parse(path, self.schema)?;
        self.read(&path, query)
    }

    pub fn create(&mut self, entity: &Entity) -> StoreResult<WriteOutcome> {
        let (resolver, id_mode) = (self.resolver(), self.id_mode);
        transaction(&mut self.conn, self.dialect, |session| {
            let mut writer = EntityWriter::new(session, resolver, id_mode);
            let id = writer.create(entity)?;
            Ok(WriteOutcome {
                id,
                changes: writer.into_changes(),
            })
        })
    }

    pub fn update(
        &mut self,
        entity_type: EntityType,
        id: EntityId,
        patch: &Entity,
    ) -> StoreResult<Vec<EntityChangedMessage>> {
        let (resolver, id_mode) = (self.resolver(), self.id_mode);
        transaction(&mut self.conn, self.dialect, |session| {
            let mut writer = EntityWriter::new(session, resolver, id_mode);
            writer.update(entity_type, id, patch)?;
            Ok(writer.into_changes())
        })
    }

    pub fn delete(
        &mut self,
        entity_type: EntityType,
        id: EntityId,
    ) -> StoreResult<Vec<EntityChangedMessage>> {
        let (resolver, id_mode) = (self.resolver(), self.id_mode);
        transaction(&mut self.conn, self.dialect, |session| {
            let mut writer = EntityWriter::new(session, resolver, id_mode);
            writer.delete(entity_type, id)?;
            Ok(writer.into_changes())
        })
    }
}

/// Run `f` in a transaction, committing only if it succeeds.
fn transaction<T>(
    conn: &mut Connection,
    dialect: Dialect,
    f: impl FnOnce(&Session<'_>) -> StoreResult<T>,
) -> StoreResult<T> {
    let tx = conn.transaction()?;
    let result = f(&Session::new(&tx, dialect));
    match result {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            log::debug!("rolling back: {}", e);
            tx.rollback()?;
            Err(e)
        }
    }
}
