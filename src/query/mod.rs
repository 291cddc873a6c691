//! Path and query model.
//!
//! [`ResourcePath`] says which entities a request addresses; [`Query`]
//! carries the modifiers (`$select`, `$filter`, `$expand`, `$orderby`,
//! `$top`, `$skip`, `$count`). Both are immutable once built and consumed
//! by the resolver.

pub mod filter;
pub mod path;

pub use filter::{
    call, prop, ArithOp, CompareOp, Constant, FilterExpr, FilterFunction, PropertyPath,
};
pub use path::{EntityElement, PathElement, PropertyElement, ResourcePath};

pub use crate::sql::SortDir;

use crate::model::{EntityProperty, EntityType, NavigationProperty, Property};

/// Errors in a resource path or query option. Always the client's fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("Empty resource path")]
    Empty,

    #[error("Unknown entity collection: {0}")]
    UnknownCollection(String),

    #[error("Malformed path segment: {0}")]
    MalformedSegment(String),

    #[error("{entity_type} has no property or relation named {segment}")]
    UnknownSegment {
        entity_type: EntityType,
        segment: String,
    },

    #[error("Cannot navigate from collection {0}; address a single entity first")]
    NavigationFromCollection(String),

    #[error("{0} is a single entity and takes no id")]
    IdOnSingle(String),

    #[error("Cannot address a property of collection {0}")]
    PropertyOfCollection(String),

    #[error("Unexpected path segment: {0}")]
    TrailingSegment(String),

    #[error("Invalid entity id: {0}")]
    InvalidId(String),

    #[error("Invalid query option: {0}")]
    InvalidOption(String),
}

/// Query modifiers of a request, or of one `$expand` item.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "queries have no effect until resolved"]
pub struct Query {
    pub select: Vec<Property>,
    pub filter: Option<FilterExpr>,
    pub expand: Vec<Expand>,
    pub order_by: Vec<OrderBy>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, properties: impl IntoIterator<Item = impl Into<Property>>) -> Self {
        self.select.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Add a filter; several calls are ANDed.
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }

    pub fn order_by(mut self, expr: impl Into<FilterExpr>, dir: SortDir) -> Self {
        self.order_by.push(OrderBy {
            expr: expr.into(),
            dir,
        });
        self
    }

    pub fn top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }
}

/// One `$expand` item.
#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    pub navigation: NavigationProperty,
    pub query: Query,
}

impl Expand {
    pub fn new(navigation: NavigationProperty) -> Self {
        Self {
            navigation,
            query: Query::default(),
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// A multi-hop expand such as `Datastreams/Observations`, as nested items.
    pub fn path(hops: &[NavigationProperty], leaf: Query) -> Option<Self> {
        let (last, init) = hops.split_last()?;
        let mut expand = Expand::new(*last).with_query(leaf);
        for navigation in init.iter().rev() {
            expand = Expand::new(*navigation).with_query(Query::new().expand(expand));
        }
        Some(expand)
    }
}

/// One `$orderby` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: FilterExpr,
    pub dir: SortDir,
}

/// Parse a `$select` list of property names.
pub fn parse_select(entity_type: EntityType, text: &str) -> Result<Vec<Property>, PathError> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            Property::from_name(name).ok_or_else(|| PathError::UnknownSegment {
                entity_type,
                segment: name.into(),
            })
        })
        .collect()
}

/// Parse a `$orderby` list of `path [asc|desc]` items.
///
/// Paths are property paths such as `phenomenonTime` or `Thing/name`.
pub fn parse_order_by(entity_type: EntityType, text: &str) -> Result<Vec<OrderBy>, PathError> {
    let mut items = vec![];
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mut words = item.split_whitespace();
        let path = words.next().unwrap_or_default();
        let dir = match words.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDir::Asc,
            Some("desc") => SortDir::Desc,
            Some(other) => return Err(PathError::InvalidOption(other.into())),
        };
        if words.next().is_some() {
            return Err(PathError::InvalidOption(item.into()));
        }
        items.push(OrderBy {
            expr: FilterExpr::Property(parse_property_path(entity_type, path)?),
            dir,
        });
    }
    Ok(items)
}

/// Parse `Nav/Nav/property/key` into a [`PropertyPath`].
pub fn parse_property_path(entity_type: EntityType, text: &str) -> Result<PropertyPath, PathError> {
    let mut navigation = vec![];
    let mut segments = text.split('/').filter(|s| !s.is_empty());
    let mut current = entity_type;
    for segment in segments.by_ref() {
        if let Some(nav) = NavigationProperty::from_name(segment) {
            navigation.push(nav);
            current = nav.target();
            continue;
        }
        let property = EntityProperty::from_name(segment).ok_or_else(|| {
            PathError::UnknownSegment {
                entity_type: current,
                segment: segment.into(),
            }
        })?;
        return Ok(PropertyPath {
            navigation,
            property,
            sub_path: segments.map(str::to_string).collect(),
        });
    }
    Err(PathError::InvalidOption(text.into()))
}
