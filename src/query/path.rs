//! Resource paths such as `Things(1)/Datastreams` or `Things(1)/properties/owner`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{EntityId, EntityProperty, EntityType, NavigationProperty};
use crate::schema::SchemaRegistry;

use super::PathError;

static SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z]+)(?:\((\d+)\))?$").unwrap());

/// An entity or entity collection on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityElement {
    pub entity_type: EntityType,
    pub id: Option<EntityId>,
    /// How this element was reached; `None` for the root collection.
    pub navigation: Option<NavigationProperty>,
}

impl EntityElement {
    /// A root collection, e.g. `Things`.
    pub fn collection(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: None,
            navigation: None,
        }
    }

    /// A root entity, e.g. `Things(1)`.
    pub fn entity(entity_type: EntityType, id: EntityId) -> Self {
        Self {
            entity_type,
            id: Some(id),
            navigation: None,
        }
    }

    /// An element reached through a navigation property.
    pub fn via(navigation: NavigationProperty) -> Self {
        Self {
            entity_type: navigation.target(),
            id: None,
            navigation: Some(navigation),
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the element addresses a set of entities.
    pub fn is_collection(&self) -> bool {
        self.id.is_none() && self.navigation.map_or(true, |n| n.is_set())
    }

    fn label(&self) -> String {
        let name = match self.navigation {
            Some(n) => n.name(),
            None => self.entity_type.plural(),
        };
        match self.id {
            Some(id) => format!("{}({})", name, id),
            None => name.to_string(),
        }
    }
}

/// A property of the last entity on the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyElement {
    pub property: EntityProperty,
    /// Keys inside a JSON property, e.g. `properties/owner/name`.
    pub custom_path: Vec<String>,
    /// `$value` was requested.
    pub raw_value: bool,
}

impl PropertyElement {
    pub fn new(property: EntityProperty) -> Self {
        Self {
            property,
            custom_path: vec![],
            raw_value: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Entity(EntityElement),
    Property(PropertyElement),
}

/// A validated resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    elements: Vec<PathElement>,
    main: EntityElement,
}

impl ResourcePath {
    /// Parse and validate a path string.
    pub fn parse(path: &str, schema: &SchemaRegistry) -> Result<Self, PathError> {
        let mut segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());
        let first = segments.next().ok_or(PathError::Empty)?;
        let (name, id) = split_segment(first)?;
        let entity_type =
            EntityType::from_plural(name).ok_or_else(|| PathError::UnknownCollection(name.into()))?;

        let mut elements = vec![PathElement::Entity(EntityElement {
            entity_type,
            id,
            navigation: None,
        })];
        let mut current = entity_type;

        for segment in segments {
            if let Some(PathElement::Property(prop)) = elements.last_mut() {
                if segment == "$value" {
                    prop.raw_value = true;
                } else if prop.property.allows_custom_path() && !prop.raw_value {
                    prop.custom_path.push(segment.to_string());
                } else {
                    return Err(PathError::TrailingSegment(segment.into()));
                }
                continue;
            }

            let (name, id) = split_segment(segment)?;
            if let Some(navigation) = NavigationProperty::from_name(name)
                .filter(|n| schema.has_relation(current, *n))
            {
                elements.push(PathElement::Entity(EntityElement {
                    entity_type: navigation.target(),
                    id,
                    navigation: Some(navigation),
                }));
                current = navigation.target();
            } else if let Some(property) = EntityProperty::from_name(name) {
                if id.is_some() {
                    return Err(PathError::MalformedSegment(segment.into()));
                }
                elements.push(PathElement::Property(PropertyElement::new(property)));
            } else {
                return Err(PathError::UnknownSegment {
                    entity_type: current,
                    segment: segment.into(),
                });
            }
        }

        Self::from_elements(elements, schema)
    }

    /// Validate a list of elements built by a caller.
    ///
    /// An entity element without a navigation after the root re-enters the
    /// current entity type and must name that same type.
    pub fn from_elements(
        elements: Vec<PathElement>,
        schema: &SchemaRegistry,
    ) -> Result<Self, PathError> {
        let mut previous: Option<EntityElement> = None;
        let mut seen_property = false;

        for element in &elements {
            if seen_property {
                return Err(PathError::TrailingSegment(format!("{:?}", element)));
            }
            match element {
                PathElement::Entity(entity) => {
                    match (previous, entity.navigation) {
                        (None, None) => {}
                        (None, Some(_)) => {
                            return Err(PathError::MalformedSegment(entity.label()));
                        }
                        (Some(prev), None) => {
                            if prev.entity_type != entity.entity_type {
                                return Err(PathError::MalformedSegment(entity.label()));
                            }
                        }
                        (Some(prev), Some(navigation)) => {
                            if prev.is_collection() {
                                return Err(PathError::NavigationFromCollection(prev.label()));
                            }
                            if !schema.has_relation(prev.entity_type, navigation)
                                || navigation.target() != entity.entity_type
                            {
                                return Err(PathError::UnknownSegment {
                                    entity_type: prev.entity_type,
                                    segment: navigation.name().into(),
                                });
                            }
                            if entity.id.is_some() && !navigation.is_set() {
                                return Err(PathError::IdOnSingle(entity.label()));
                            }
                        }
                    }
                    previous = Some(match (previous, entity.navigation) {
                        // re-entry narrows the element it re-enters
                        (Some(prev), None) => EntityElement {
                            id: entity.id.or(prev.id),
                            ..prev
                        },
                        _ => *entity,
                    });
                }
                PathElement::Property(prop) => {
                    let Some(prev) = previous else {
                        return Err(PathError::Empty);
                    };
                    if prev.is_collection() {
                        return Err(PathError::PropertyOfCollection(prev.label()));
                    }
                    if schema.property_def(prev.entity_type, prop.property).is_err() {
                        return Err(PathError::UnknownSegment {
                            entity_type: prev.entity_type,
                            segment: prop.property.name().into(),
                        });
                    }
                    if !prop.custom_path.is_empty() && !prop.property.allows_custom_path() {
                        return Err(PathError::TrailingSegment(prop.custom_path.join("/")));
                    }
                    seen_property = true;
                }
            }
        }

        let main = previous.ok_or(PathError::Empty)?;
        Ok(Self { elements, main })
    }

    /// Path to a single entity, for lookups.
    pub fn entity(entity_type: EntityType, id: EntityId) -> Self {
        let main = EntityElement::entity(entity_type, id);
        Self {
            elements: vec![PathElement::Entity(main)],
            main,
        }
    }

    /// Path from a single entity over one navigation property.
    pub fn navigation(
        entity_type: EntityType,
        id: EntityId,
        navigation: NavigationProperty,
        schema: &SchemaRegistry,
    ) -> Result<Self, PathError> {
        Self::from_elements(
            vec![
                PathElement::Entity(EntityElement::entity(entity_type, id)),
                PathElement::Entity(EntityElement::via(navigation)),
            ],
            schema,
        )
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn entity_elements(&self) -> impl Iterator<Item = &EntityElement> {
        self.elements.iter().filter_map(|e| match e {
            PathElement::Entity(entity) => Some(entity),
            PathElement::Property(_) => None,
        })
    }

    /// The last entity element; its type is what the path returns rows of.
    pub fn main_element(&self) -> &EntityElement {
        &self.main
    }

    pub fn property(&self) -> Option<&PropertyElement> {
        match self.elements.last() {
            Some(PathElement::Property(prop)) => Some(prop),
            _ => None,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.main_element().entity_type
    }

    /// Whether the path returns a collection.
    pub fn is_collection(&self) -> bool {
        self.property().is_none() && self.main_element().is_collection()
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = vec![];
        for element in &self.elements {
            match element {
                PathElement::Entity(e) if e.navigation.is_none() && !parts.is_empty() => {}
                PathElement::Entity(e) => parts.push(e.label()),
                PathElement::Property(p) => {
                    parts.push(p.property.name().to_string());
                    parts.extend(p.custom_path.iter().cloned());
                    if p.raw_value {
                        parts.push("$value".into());
                    }
                }
            }
        }
        write!(f, "{}", parts.join("/"))
    }
}

fn split_segment(segment: &str) -> Result<(&str, Option<EntityId>), PathError> {
    let caps = SEGMENT
        .captures(segment)
        .ok_or_else(|| PathError::MalformedSegment(segment.into()))?;
    let name = caps.get(1).map_or("", |m| m.as_str());
    let id = match caps.get(2) {
        Some(m) => Some(EntityId(
            m.as_str()
                .parse()
                .map_err(|_| PathError::InvalidId(m.as_str().into()))?,
        )),
        None => None,
    };
    Ok((name, id))
}
