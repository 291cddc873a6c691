//! Executes resolved queries and decodes rows into entities.

use serde_json::Value as Json;

use crate::error::{StoreError, StoreResult};
use crate::fields::{Decoded, FieldRegistry, StoredRow};
use crate::model::{Entity, EntityProperty, EntityType, Link, Property, Value};
use crate::query::{Expand, PropertyElement, Query, ResourcePath};
use crate::resolver::{PathResolver, ResolvedQuery};

use super::session::Session;

/// One page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCollection {
    pub entities: Vec<Entity>,
    /// Total matches ignoring paging, when `$count` was asked.
    pub count: Option<u64>,
}

/// What a read request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Entity(Entity),
    Collection(EntityCollection),
    /// A property path: `{"name": value}`.
    Property(Json),
    /// `$value` of a property path.
    RawValue(String),
}

impl ReadOutcome {
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            ReadOutcome::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<EntityCollection> {
        match self {
            ReadOutcome::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            ReadOutcome::Entity(e) => e.to_json(),
            ReadOutcome::Collection(c) => {
                let mut object = serde_json::Map::new();
                if let Some(count) = c.count {
                    object.insert("@iot.count".into(), Json::from(count));
                }
                object.insert(
                    "value".into(),
                    Json::Array(c.entities.iter().map(Entity::to_json).collect()),
                );
                Json::Object(object)
            }
            ReadOutcome::Property(v) => v.clone(),
            ReadOutcome::RawValue(s) => Json::String(s.clone()),
        }
    }
}

pub struct EntityReader<'s, 'c> {
    session: &'s Session<'c>,
    resolver: PathResolver<'s>,
}

impl<'s, 'c> EntityReader<'s, 'c> {
    pub fn new(session: &'s Session<'c>, resolver: PathResolver<'s>) -> Self {
        Self { session, resolver }
    }

    fn fields(&self) -> &'s FieldRegistry {
        self.resolver.fields()
    }

    pub fn read(&self, path: &ResourcePath, query: &Query) -> StoreResult<ReadOutcome> {
        let resolved = self.resolver.resolve(path, query)?;

        if let Some(property) = &resolved.property {
            let row = self
                .rows(&resolved)?
                .into_iter()
                .next()
                .ok_or_else(|| StoreError::NoSuchEntity(path.to_string()))?;
            return self.property_outcome(path, resolved.entity_type, property, &row);
        }

        let mut entities = self.execute(&resolved, query)?;
        if resolved.single {
            return match entities.len() {
                0 => Err(StoreError::NoSuchEntity(path.to_string())),
                _ => Ok(ReadOutcome::Entity(entities.remove(0))),
            };
        }

        let count = match &resolved.count {
            Some(count) => self
                .session
                .scalar_i64(count)?
                .map(|n| u64::try_from(n).unwrap_or(0)),
            None => None,
        };
        Ok(ReadOutcome::Collection(EntityCollection { entities, count }))
    }

    fn rows(&self, resolved: &ResolvedQuery) -> StoreResult<Vec<StoredRow>> {
        let width = self.fields().layout(resolved.entity_type).len();
        self.session
            .fetch_rows(&resolved.sql, &resolved.projection, width)
    }

    /// Run a resolved query and attach its expands.
    fn execute(&self, resolved: &ResolvedQuery, query: &Query) -> StoreResult<Vec<Entity>> {
        let mut entities = vec![];
        for row in self.rows(resolved)? {
            let mut entity = self.decode(resolved.entity_type, &resolved.selection, &row)?;
            for expand in &query.expand {
                self.expand(&mut entity, expand)?;
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    fn decode(
        &self,
        entity_type: EntityType,
        selection: &[Property],
        row: &StoredRow,
    ) -> StoreResult<Entity> {
        let mut entity = Entity::new(entity_type);
        for property in selection {
            match (property, self.fields().read(entity_type, *property, row)?) {
                (Property::Entity(EntityProperty::Id), Decoded::Reference(id)) => entity.id = id,
                (Property::Entity(p), Decoded::Value(value)) if !value.is_null() => {
                    entity.set(*p, value)
                }
                (Property::Navigation(nav), Decoded::Reference(Some(id))) => entity.set_link(
                    *nav,
                    Link::One(Some(Box::new(Entity::reference(nav.target(), id.0)))),
                ),
                _ => {}
            }
        }
        Ok(entity)
    }

    fn expand(&self, entity: &mut Entity, expand: &Expand) -> StoreResult<()> {
        let id = entity.id.ok_or_else(|| {
            StoreError::illegal_state(format!("{} read without id", entity.entity_type))
        })?;
        let resolved = self
            .resolver
            .resolve_expand(entity.entity_type, id, expand)?;
        let mut related = self.execute(&resolved, &expand.query)?;
        let link = if expand.navigation.is_set() {
            Link::Many(related)
        } else if related.is_empty() {
            Link::One(None)
        } else {
            Link::One(Some(Box::new(related.remove(0))))
        };
        entity.set_link(expand.navigation, link);
        Ok(())
    }

    fn property_outcome(
        &self,
        path: &ResourcePath,
        entity_type: EntityType,
        element: &PropertyElement,
        row: &StoredRow,
    ) -> StoreResult<ReadOutcome> {
        let value = match self.fields().read(entity_type, element.property, row)? {
            Decoded::Value(v) => v,
            _ => Value::Null,
        };
        let mut json = value.to_json();
        for key in &element.custom_path {
            json = match json {
                Json::Object(mut map) => map.remove(key),
                Json::Array(mut items) => key
                    .parse::<usize>()
                    .ok()
                    .filter(|i| *i < items.len())
                    .map(|i| items.swap_remove(i)),
                _ => None,
            }
            .ok_or_else(|| StoreError::NoSuchEntity(path.to_string()))?;
        }

        if element.raw_value {
            return match json {
                Json::Null => Err(StoreError::NoSuchEntity(path.to_string())),
                Json::String(s) => Ok(ReadOutcome::RawValue(s)),
                other => Ok(ReadOutcome::RawValue(other.to_string())),
            };
        }
        let name = element
            .custom_path
            .last()
            .cloned()
            .unwrap_or_else(|| element.property.name().to_string());
        let mut object = serde_json::Map::new();
        object.insert(name, json);
        Ok(ReadOutcome::Property(Json::Object(object)))
    }
}
