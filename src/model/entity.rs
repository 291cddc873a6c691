//! Entity values exchanged with the transport layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{EntityProperty, EntityType, NavigationProperty, Property, Value};

/// Primary key of a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId(id)
    }
}

/// Content of a navigation property.
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    /// Singular relation; `None` is an explicit null.
    One(Option<Box<Entity>>),
    Many(Vec<Entity>),
}

/// An entity with the properties that were supplied or selected.
///
/// Absent keys mean "not supplied"; [`Value::Null`] is an explicit null.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_type: EntityType,
    pub id: Option<EntityId>,
    properties: BTreeMap<EntityProperty, Value>,
    links: BTreeMap<NavigationProperty, Link>,
}

impl Entity {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: None,
            properties: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    /// An id-only entity, used to link to something that already exists.
    pub fn reference(entity_type: EntityType, id: i64) -> Self {
        Self::new(entity_type).with_id(id)
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(EntityId(id));
        self
    }

    pub fn with(mut self, property: EntityProperty, value: impl Into<Value>) -> Self {
        self.set(property, value.into());
        self
    }

    /// Set a singular navigation property.
    pub fn with_link(mut self, navigation: NavigationProperty, target: Entity) -> Self {
        self.links
            .insert(navigation, Link::One(Some(Box::new(target))));
        self
    }

    /// Set a singular navigation property to an explicit null.
    pub fn with_null_link(mut self, navigation: NavigationProperty) -> Self {
        self.links.insert(navigation, Link::One(None));
        self
    }

    /// Append one member to a collection navigation property.
    pub fn with_member(mut self, navigation: NavigationProperty, member: Entity) -> Self {
        let link = self
            .links
            .entry(navigation)
            .or_insert_with(|| Link::Many(vec![]));
        if let Link::Many(members) = link {
            members.push(member);
        } else {
            *link = Link::Many(vec![member]);
        }
        self
    }

    pub fn with_members(mut self, navigation: NavigationProperty, members: Vec<Entity>) -> Self {
        self.links.insert(navigation, Link::Many(members));
        self
    }

    pub fn set(&mut self, property: EntityProperty, value: Value) {
        if property == EntityProperty::Id {
            if let Value::Json(serde_json::Value::Number(n)) = &value {
                self.id = n.as_i64().map(EntityId);
            }
            return;
        }
        self.properties.insert(property, value);
    }

    pub fn set_link(&mut self, navigation: NavigationProperty, link: Link) {
        self.links.insert(navigation, link);
    }

    pub fn get(&self, property: EntityProperty) -> Option<&Value> {
        self.properties.get(&property)
    }

    /// Whether a property was supplied, including as explicit null.
    pub fn is_set(&self, property: Property) -> bool {
        match property {
            Property::Entity(EntityProperty::Id) => self.id.is_some(),
            Property::Entity(p) => self.properties.contains_key(&p),
            Property::Navigation(n) => self.links.contains_key(&n),
        }
    }

    pub fn link(&self, navigation: NavigationProperty) -> Option<&Link> {
        self.links.get(&navigation)
    }

    /// Target of a singular navigation property, if present and non-null.
    pub fn single(&self, navigation: NavigationProperty) -> Option<&Entity> {
        match self.links.get(&navigation) {
            Some(Link::One(Some(target))) => Some(target),
            _ => None,
        }
    }

    /// Members of a collection navigation property.
    pub fn members(&self, navigation: NavigationProperty) -> &[Entity] {
        match self.links.get(&navigation) {
            Some(Link::Many(members)) => members,
            _ => &[],
        }
    }

    pub fn properties(&self) -> impl Iterator<Item = (&EntityProperty, &Value)> {
        self.properties.iter()
    }

    pub fn links(&self) -> impl Iterator<Item = (&NavigationProperty, &Link)> {
        self.links.iter()
    }

    /// Names of everything supplied on this entity.
    pub fn supplied(&self) -> Vec<Property> {
        let mut names: Vec<Property> = vec![];
        if self.id.is_some() {
            names.push(EntityProperty::Id.into());
        }
        names.extend(self.properties.keys().map(|p| Property::Entity(*p)));
        names.extend(self.links.keys().map(|n| Property::Navigation(*n)));
        names
    }

    /// JSON rendering for the serialization layer.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        if let Some(id) = self.id {
            object.insert("@iot.id".into(), serde_json::json!(id.0));
        }
        for (property, value) in &self.properties {
            object.insert(property.name().into(), value.to_json());
        }
        for (navigation, link) in &self.links {
            let rendered = match link {
                Link::One(Some(target)) => target.to_json(),
                Link::One(None) => serde_json::Value::Null,
                Link::Many(members) => {
                    serde_json::Value::Array(members.iter().map(Entity::to_json).collect())
                }
            };
            object.insert(navigation.name().into(), rendered);
        }
        serde_json::Value::Object(object)
    }
}
