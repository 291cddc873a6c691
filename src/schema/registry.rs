//! The schema graph: entity types as nodes, relations as edges.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::relation::{JoinShape, LinkTable, Relation, RelationKind};
use super::{PropertyDef, SchemaError, SchemaResult};
use crate::model::{EntityProperty, EntityType, NavigationProperty, Property};

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::standard);

/// The process-wide registry. Built on first use, read-only afterwards.
pub fn global() -> &'static SchemaRegistry {
    &GLOBAL
}

/// Entity types, their properties and the relations between them.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    graph: DiGraph<EntityType, Relation>,
    nodes: HashMap<EntityType, NodeIndex>,
    relations: HashMap<(EntityType, NavigationProperty), EdgeIndex>,
    properties: HashMap<EntityType, Vec<PropertyDef>>,
    tables: HashMap<EntityType, &'static str>,
}

impl SchemaRegistry {
    /// Tables in dependency order: referenced tables come first.
    pub const CREATION_ORDER: [EntityType; 9] = [
        EntityType::FeatureOfInterest,
        EntityType::Thing,
        EntityType::Location,
        EntityType::HistoricalLocation,
        EntityType::Sensor,
        EntityType::ObservedProperty,
        EntityType::Datastream,
        EntityType::MultiDatastream,
        EntityType::Observation,
    ];

    fn empty() -> Self {
        let mut graph = DiGraph::new();
        let nodes = EntityType::ALL
            .into_iter()
            .map(|t| (t, graph.add_node(t)))
            .collect();
        Self {
            graph,
            nodes,
            relations: HashMap::new(),
            properties: HashMap::new(),
            tables: HashMap::new(),
        }
    }

    /// The sensing data model.
    ///
    /// The declarations below are static; a failure here is a build defect,
    /// which is why this constructor panics instead of returning an error.
    pub fn standard() -> Self {
        match Self::build_standard() {
            Ok(registry) => registry,
            Err(e) => panic!("built-in schema is inconsistent: {}", e),
        }
    }

    fn build_standard() -> SchemaResult<Self> {
        use EntityProperty as P;
        use EntityType as T;
        use NavigationProperty as N;

        let mut r = Self::empty();

        r.entity(
            T::Thing,
            "things",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Description),
                PropertyDef::optional(P::Properties),
            ],
        );
        r.entity(
            T::Location,
            "locations",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Description),
                PropertyDef::required(P::EncodingType),
                PropertyDef::required(P::Location),
                PropertyDef::optional(P::Properties),
            ],
        );
        r.entity(
            T::HistoricalLocation,
            "hist_locations",
            vec![PropertyDef::required(P::Time)],
        );
        r.entity(
            T::Sensor,
            "sensors",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Description),
                PropertyDef::required(P::EncodingType),
                PropertyDef::required(P::Metadata),
                PropertyDef::optional(P::Properties),
            ],
        );
        r.entity(
            T::ObservedProperty,
            "obs_properties",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Definition),
                PropertyDef::required(P::Description),
                PropertyDef::optional(P::Properties),
            ],
        );
        r.entity(
            T::Datastream,
            "datastreams",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Description),
                PropertyDef::required(P::ObservationType),
                PropertyDef::required(P::UnitOfMeasurement),
                PropertyDef::optional(P::ObservedArea),
                PropertyDef::derived(P::PhenomenonTime),
                PropertyDef::derived(P::ResultTime),
                PropertyDef::optional(P::Properties),
            ],
        );
        r.entity(
            T::MultiDatastream,
            "multi_datastreams",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Description),
                PropertyDef::constant(P::ObservationType),
                PropertyDef::required(P::MultiObservationDataTypes),
                PropertyDef::required(P::UnitOfMeasurements),
                PropertyDef::optional(P::ObservedArea),
                PropertyDef::derived(P::PhenomenonTime),
                PropertyDef::derived(P::ResultTime),
                PropertyDef::optional(P::Properties),
            ],
        );
        r.entity(
            T::Observation,
            "observations",
            vec![
                PropertyDef::optional(P::PhenomenonTime).not_null(),
                PropertyDef::optional(P::ResultTime),
                PropertyDef::required(P::Result),
                PropertyDef::optional(P::ResultQuality),
                PropertyDef::optional(P::ValidTime),
                PropertyDef::optional(P::Parameters),
            ],
        );
        r.entity(
            T::FeatureOfInterest,
            "features",
            vec![
                PropertyDef::required(P::Name),
                PropertyDef::required(P::Description),
                PropertyDef::required(P::EncodingType),
                PropertyDef::required(P::Feature),
                PropertyDef::optional(P::Properties),
            ],
        );

        r.many_to_many(
            (T::Thing, N::Locations),
            (T::Location, N::Things),
            LinkTable {
                table: "things_locations",
                source_column: "thing_id",
                target_column: "location_id",
                rank_column: None,
            },
        );
        r.many_to_many(
            (T::Location, N::HistoricalLocations),
            (T::HistoricalLocation, N::Locations),
            LinkTable {
                table: "locations_hist_locations",
                source_column: "location_id",
                target_column: "hist_location_id",
                rank_column: None,
            },
        );
        r.many_to_many(
            (T::MultiDatastream, N::ObservedProperties),
            (T::ObservedProperty, N::MultiDatastreams),
            LinkTable {
                table: "multi_datastreams_obs_properties",
                source_column: "multi_datastream_id",
                target_column: "obs_property_id",
                rank_column: Some("rank"),
            },
        );

        r.foreign_key((T::HistoricalLocation, N::Thing), (T::Thing, N::HistoricalLocations), "thing_id", true);
        r.foreign_key((T::Datastream, N::Thing), (T::Thing, N::Datastreams), "thing_id", true);
        r.foreign_key((T::Datastream, N::Sensor), (T::Sensor, N::Datastreams), "sensor_id", true);
        r.foreign_key(
            (T::Datastream, N::ObservedProperty),
            (T::ObservedProperty, N::Datastreams),
            "obs_property_id",
            true,
        );
        r.foreign_key((T::MultiDatastream, N::Thing), (T::Thing, N::MultiDatastreams), "thing_id", true);
        r.foreign_key((T::MultiDatastream, N::Sensor), (T::Sensor, N::MultiDatastreams), "sensor_id", true);
        // Exactly one of the two parents is required; the writer enforces it.
        r.foreign_key((T::Observation, N::Datastream), (T::Datastream, N::Observations), "datastream_id", false);
        r.foreign_key(
            (T::Observation, N::MultiDatastream),
            (T::MultiDatastream, N::Observations),
            "multi_datastream_id",
            false,
        );
        r.foreign_key(
            (T::Observation, N::FeatureOfInterest),
            (T::FeatureOfInterest, N::Observations),
            "feature_id",
            false,
        );

        r.validate()?;
        Ok(r)
    }

    fn entity(&mut self, entity_type: EntityType, table: &'static str, mut props: Vec<PropertyDef>) {
        props.insert(0, PropertyDef::optional(EntityProperty::Id));
        self.tables.insert(entity_type, table);
        self.properties.insert(entity_type, props);
    }

    fn add_relation(&mut self, relation: Relation) {
        let key = (relation.source, relation.navigation);
        let edge = self.graph.add_edge(
            self.nodes[&relation.source],
            self.nodes[&relation.target],
            relation,
        );
        self.relations.insert(key, edge);
    }

    /// Declare a foreign key held by `child`. The parent side owns the pair.
    fn foreign_key(
        &mut self,
        (child, to_parent): (EntityType, NavigationProperty),
        (parent, to_children): (EntityType, NavigationProperty),
        column: &'static str,
        required: bool,
    ) {
        self.add_relation(Relation {
            source: child,
            navigation: to_parent,
            target: parent,
            kind: RelationKind::ManyToOne,
            join: JoinShape::SourceForeignKey { column },
            inverse: to_children,
            distinct_on_read: RelationKind::OneToMany.is_many(),
            owning: false,
            required,
        });
        self.add_relation(Relation {
            source: parent,
            navigation: to_children,
            target: child,
            kind: RelationKind::OneToMany,
            join: JoinShape::TargetForeignKey { column },
            inverse: to_parent,
            distinct_on_read: RelationKind::ManyToOne.is_many(),
            owning: true,
            required: false,
        });
    }

    /// Declare a link-table relation. The first side owns the pair.
    ///
    /// With a rank column the forward direction is ordered: it is required
    /// to be non-empty and reads members in rank order without DISTINCT.
    fn many_to_many(
        &mut self,
        (a, a_nav): (EntityType, NavigationProperty),
        (b, b_nav): (EntityType, NavigationProperty),
        link: LinkTable,
    ) {
        let ordered = link.rank_column.is_some();
        self.add_relation(Relation {
            source: a,
            navigation: a_nav,
            target: b,
            kind: if ordered {
                RelationKind::ManyToManyOrdered
            } else {
                RelationKind::ManyToMany
            },
            join: JoinShape::Link(link),
            inverse: b_nav,
            distinct_on_read: !ordered,
            owning: true,
            required: ordered,
        });
        self.add_relation(Relation {
            source: b,
            navigation: b_nav,
            target: a,
            kind: RelationKind::ManyToMany,
            join: JoinShape::Link(link.reversed()),
            inverse: a_nav,
            distinct_on_read: true,
            owning: false,
            required: false,
        });
    }

    /// Check the graph: every edge has its inverse, every pair exactly one
    /// owning direction, and every navigation points at its declared type.
    pub fn validate(&self) -> SchemaResult<()> {
        for edge in self.graph.edge_references() {
            let relation = edge.weight();
            if relation.navigation.target() != relation.target {
                return Err(SchemaError::TargetMismatch {
                    entity_type: relation.source,
                    navigation: relation.navigation.name().into(),
                });
            }
            let inverse = self.relation(relation.target, relation.inverse)?;
            if inverse.inverse != relation.navigation || inverse.target != relation.source {
                return Err(SchemaError::MissingInverse {
                    entity_type: relation.source,
                    navigation: relation.navigation.name().into(),
                });
            }
            let owners = usize::from(relation.owning) + usize::from(inverse.owning);
            if owners != 1 {
                return Err(SchemaError::Ownership {
                    relation: relation.to_string(),
                    owners,
                });
            }
        }
        Ok(())
    }

    pub fn table(&self, entity_type: EntityType) -> &'static str {
        self.tables.get(&entity_type).copied().unwrap_or_default()
    }

    /// Relation behind a navigation property.
    pub fn relation(
        &self,
        entity_type: EntityType,
        navigation: NavigationProperty,
    ) -> SchemaResult<&Relation> {
        self.relations
            .get(&(entity_type, navigation))
            .and_then(|edge| self.graph.edge_weight(*edge))
            .ok_or_else(|| SchemaError::UnknownRelation {
                entity_type,
                navigation: navigation.name().into(),
            })
    }

    pub fn has_relation(&self, entity_type: EntityType, navigation: NavigationProperty) -> bool {
        self.relations.contains_key(&(entity_type, navigation))
    }

    /// All relations leaving an entity type.
    pub fn relations(&self, entity_type: EntityType) -> impl Iterator<Item = &Relation> {
        let node = self.nodes[&entity_type];
        let mut out: Vec<&Relation> = self.graph.edges(node).map(|e| e.weight()).collect();
        out.sort_by_key(|r| r.navigation);
        out.into_iter()
    }

    /// All relations in the graph.
    pub fn all_relations(&self) -> impl Iterator<Item = &Relation> {
        self.graph.edge_weights()
    }

    pub fn navigation_properties(&self, entity_type: EntityType) -> Vec<NavigationProperty> {
        self.relations(entity_type).map(|r| r.navigation).collect()
    }

    pub fn property_defs(&self, entity_type: EntityType) -> &[PropertyDef] {
        self.properties
            .get(&entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn property_def(
        &self,
        entity_type: EntityType,
        property: EntityProperty,
    ) -> SchemaResult<&PropertyDef> {
        self.property_defs(entity_type)
            .iter()
            .find(|d| d.property == property)
            .ok_or_else(|| SchemaError::UnknownProperty {
                entity_type,
                property: property.name().into(),
            })
    }

    pub fn has_property(&self, entity_type: EntityType, property: Property) -> bool {
        match property {
            Property::Entity(p) => self.property_def(entity_type, p).is_ok(),
            Property::Navigation(n) => self.has_relation(entity_type, n),
        }
    }

    /// All declared properties of an entity type, entity properties first.
    pub fn all_properties(&self, entity_type: EntityType) -> Vec<Property> {
        self.property_defs(entity_type)
            .iter()
            .map(|d| Property::Entity(d.property))
            .chain(
                self.navigation_properties(entity_type)
                    .into_iter()
                    .map(Property::Navigation),
            )
            .collect()
    }

    /// Link tables, each listed once from its owning direction.
    pub fn link_tables(&self) -> Vec<(&Relation, &LinkTable)> {
        let mut links: Vec<(&Relation, &LinkTable)> = self
            .all_relations()
            .filter(|r| r.owning)
            .filter_map(|r| r.link_table().map(|l| (r, l)))
            .collect();
        links.sort_by_key(|(_, l)| l.table);
        links
    }
}
