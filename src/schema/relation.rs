//! Relation edges between entity types.

use crate::model::{EntityType, NavigationProperty};

/// Cardinality of a directed relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The source row holds the foreign key.
    ManyToOne,
    /// The target rows hold the foreign key.
    OneToMany,
    /// A link table holds both keys.
    ManyToMany,
    /// A link table with a rank column fixing member order.
    ManyToManyOrdered,
}

impl RelationKind {
    /// Kind seen from the other end.
    pub fn reverse(&self) -> Self {
        match self {
            RelationKind::ManyToOne => RelationKind::OneToMany,
            RelationKind::OneToMany => RelationKind::ManyToOne,
            RelationKind::ManyToMany => RelationKind::ManyToMany,
            RelationKind::ManyToManyOrdered => RelationKind::ManyToMany,
        }
    }

    /// Whether one source row can match many target rows.
    pub fn is_many(&self) -> bool {
        !matches!(self, RelationKind::ManyToOne)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::ManyToOne => write!(f, "N:1"),
            RelationKind::OneToMany => write!(f, "1:N"),
            RelationKind::ManyToMany => write!(f, "N:N"),
            RelationKind::ManyToManyOrdered => write!(f, "N:N (ordered)"),
        }
    }
}

/// A link table joining two entity tables.
///
/// Columns are named from the point of view of the relation that owns this
/// value: `source_column` references the relation's source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkTable {
    pub table: &'static str,
    pub source_column: &'static str,
    pub target_column: &'static str,
    pub rank_column: Option<&'static str>,
}

impl LinkTable {
    /// The same table seen from the other end.
    pub fn reversed(&self) -> Self {
        Self {
            table: self.table,
            source_column: self.target_column,
            target_column: self.source_column,
            rank_column: self.rank_column,
        }
    }
}

/// How a relation is expressed in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinShape {
    /// `target.id = source.column`
    SourceForeignKey { column: &'static str },
    /// `target.column = source.id`
    TargetForeignKey { column: &'static str },
    /// `link.source_column = source.id AND target.id = link.target_column`
    Link(LinkTable),
}

/// A directed, navigable relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub source: EntityType,
    pub navigation: NavigationProperty,
    pub target: EntityType,
    pub kind: RelationKind,
    pub join: JoinShape,
    /// Inverse navigation property on the target.
    pub inverse: NavigationProperty,
    /// Traversing this relation can yield the same target row more than once.
    pub distinct_on_read: bool,
    /// Deleting the source removes what this relation reaches. Exactly one
    /// direction of each pair owns it.
    pub owning: bool,
    /// A new source entity must supply this relation.
    pub required: bool,
}

impl Relation {
    /// Whether traversal applies the link rank as implicit order.
    pub fn is_ordered(&self) -> bool {
        self.kind == RelationKind::ManyToManyOrdered
    }

    /// Whether deleting the source deletes the target rows.
    pub fn cascades_delete(&self) -> bool {
        self.owning && self.kind == RelationKind::OneToMany
    }

    pub fn link_table(&self) -> Option<&LinkTable> {
        match &self.join {
            JoinShape::Link(link) => Some(link),
            _ => None,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {} ({})",
            self.source,
            self.navigation.name(),
            self.target,
            self.kind
        )
    }
}
