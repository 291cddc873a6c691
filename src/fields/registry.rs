//! Per-entity-type field mappings.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

use crate::error::{StoreError, StoreResult};
use crate::model::{EntityProperty, EntityType, Property, Value};
use crate::schema::{self, JoinShape, SchemaRegistry};

use super::layout::{Column, ColumnType, SqlValue, StoredRow, TableLayout};
use super::mapping::{
    Decoded, DirectKind, Field, FieldMapping, ListKind, TimeShape, WriteContext,
    COMPLEX_OBSERVATION_TYPE,
};

static GLOBAL: Lazy<FieldRegistry> = Lazy::new(|| FieldRegistry::build(schema::global()));

/// The process-wide registry, built from the global schema.
pub fn global() -> &'static FieldRegistry {
    &GLOBAL
}

/// Layout and mappings of one entity table.
#[derive(Debug, Clone)]
pub struct EntityFields {
    pub layout: TableLayout,
    mappings: BTreeMap<Property, FieldMapping>,
}

impl EntityFields {
    fn new(table: &'static str) -> Self {
        let mut fields = Self {
            layout: TableLayout::new(table),
            mappings: BTreeMap::new(),
        };
        let id = fields.layout.register("id", ColumnType::Id);
        fields.map(EntityProperty::Id, FieldMapping::Id(id));
        fields
    }

    fn map(&mut self, property: EntityProperty, mapping: FieldMapping) -> &mut Self {
        self.mappings.insert(Property::Entity(property), mapping);
        self
    }

    fn column(&mut self, name: &'static str, column_type: ColumnType) -> Column {
        self.layout.register(name, column_type)
    }

    fn text(&mut self, property: EntityProperty, column: &'static str) -> &mut Self {
        let column = self.column(column, ColumnType::Text);
        self.map(
            property,
            FieldMapping::Direct {
                column,
                kind: DirectKind::Text,
            },
        )
    }

    fn json(&mut self, property: EntityProperty, column: &'static str) -> &mut Self {
        let column = self.column(column, ColumnType::Json);
        self.map(
            property,
            FieldMapping::Direct {
                column,
                kind: DirectKind::Json,
            },
        )
    }

    fn instant(&mut self, property: EntityProperty, column: &'static str) -> &mut Self {
        let column = self.column(column, ColumnType::Timestamp);
        self.map(
            property,
            FieldMapping::Direct {
                column,
                kind: DirectKind::Instant,
            },
        )
    }

    fn json_map(&mut self, property: EntityProperty, column: &'static str) -> &mut Self {
        let column = self.column(column, ColumnType::Json);
        self.map(property, FieldMapping::JsonMap(column))
    }

    fn unit(&mut self) -> &mut Self {
        let mapping = FieldMapping::Unit {
            name: self.column("unit_name", ColumnType::Text),
            symbol: self.column("unit_symbol", ColumnType::Text),
            definition: self.column("unit_definition", ColumnType::Text),
        };
        self.map(EntityProperty::UnitOfMeasurement, mapping)
    }

    fn list(&mut self, property: EntityProperty, column: &'static str, kind: ListKind) -> &mut Self {
        let column = self.column(column, ColumnType::Json);
        self.map(property, FieldMapping::JsonList { column, kind })
    }

    fn time_pair(
        &mut self,
        property: EntityProperty,
        (start, end): (&'static str, &'static str),
        shape: TimeShape,
    ) -> &mut Self {
        let mapping = FieldMapping::TimePair {
            start: self.column(start, ColumnType::Timestamp),
            end: self.column(end, ColumnType::Timestamp),
            shape,
        };
        self.map(property, mapping)
    }

    fn result(&mut self) -> &mut Self {
        let mapping = FieldMapping::Result {
            kind: self.column("result_type", ColumnType::Integer),
            number: self.column("result_number", ColumnType::Real),
            boolean: self.column("result_boolean", ColumnType::Boolean),
            string: self.column("result_string", ColumnType::Text),
            json: self.column("result_json", ColumnType::Json),
        };
        self.map(EntityProperty::Result, mapping)
    }

    fn geometry(&mut self, property: EntityProperty, source: &'static str) -> &mut Self {
        let mapping = FieldMapping::Geometry {
            source: self.column(source, ColumnType::Json),
            parsed: self.column("geom", ColumnType::Geometry),
        };
        self.map(property, mapping)
    }

    fn constant(&mut self, property: EntityProperty, value: Value) -> &mut Self {
        self.map(property, FieldMapping::Static(value))
    }

    pub fn mapping(&self, property: Property) -> Option<&FieldMapping> {
        self.mappings.get(&property)
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&Property, &FieldMapping)> {
        self.mappings.iter()
    }
}

/// Field mappings of every entity type.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    entities: HashMap<EntityType, EntityFields>,
    generated_foi: Column,
}

impl FieldRegistry {
    /// Declare the columns of every entity table and derive the
    /// navigation mappings from the schema's relations.
    pub fn build(schema: &SchemaRegistry) -> Self {
        use EntityProperty as P;

        let mut entities = HashMap::new();
        for entity_type in EntityType::ALL {
            let mut e = EntityFields::new(schema.table(entity_type));
            match entity_type {
                EntityType::Thing => {
                    e.text(P::Name, "name")
                        .text(P::Description, "description")
                        .json_map(P::Properties, "properties");
                }
                EntityType::Location => {
                    e.text(P::Name, "name")
                        .text(P::Description, "description")
                        .text(P::EncodingType, "encoding_type")
                        .geometry(P::Location, "location")
                        .json_map(P::Properties, "properties");
                }
                EntityType::HistoricalLocation => {
                    e.instant(P::Time, "time");
                }
                EntityType::Sensor => {
                    e.text(P::Name, "name")
                        .text(P::Description, "description")
                        .text(P::EncodingType, "encoding_type")
                        .json(P::Metadata, "metadata")
                        .json_map(P::Properties, "properties");
                }
                EntityType::ObservedProperty => {
                    e.text(P::Name, "name")
                        .text(P::Definition, "definition")
                        .text(P::Description, "description")
                        .json_map(P::Properties, "properties");
                }
                EntityType::Datastream => {
                    e.text(P::Name, "name")
                        .text(P::Description, "description")
                        .text(P::ObservationType, "observation_type")
                        .unit()
                        .json(P::ObservedArea, "observed_area")
                        .time_pair(
                            P::PhenomenonTime,
                            ("phenomenon_time_start", "phenomenon_time_end"),
                            TimeShape::Bounds,
                        )
                        .time_pair(
                            P::ResultTime,
                            ("result_time_start", "result_time_end"),
                            TimeShape::Bounds,
                        )
                        .json_map(P::Properties, "properties");
                }
                EntityType::MultiDatastream => {
                    e.text(P::Name, "name")
                        .text(P::Description, "description")
                        .constant(
                            P::ObservationType,
                            Value::Text(COMPLEX_OBSERVATION_TYPE.into()),
                        )
                        .list(P::MultiObservationDataTypes, "observation_types", ListKind::Texts)
                        .list(P::UnitOfMeasurements, "unit_of_measurements", ListKind::Units)
                        .json(P::ObservedArea, "observed_area")
                        .time_pair(
                            P::PhenomenonTime,
                            ("phenomenon_time_start", "phenomenon_time_end"),
                            TimeShape::Bounds,
                        )
                        .time_pair(
                            P::ResultTime,
                            ("result_time_start", "result_time_end"),
                            TimeShape::Bounds,
                        )
                        .json_map(P::Properties, "properties");
                }
                EntityType::Observation => {
                    e.time_pair(
                        P::PhenomenonTime,
                        ("phenomenon_time_start", "phenomenon_time_end"),
                        TimeShape::Value,
                    )
                    .instant(P::ResultTime, "result_time")
                    .result()
                    .json(P::ResultQuality, "result_quality")
                    .time_pair(
                        P::ValidTime,
                        ("valid_time_start", "valid_time_end"),
                        TimeShape::Interval,
                    )
                    .json_map(P::Parameters, "parameters");
                }
                EntityType::FeatureOfInterest => {
                    e.text(P::Name, "name")
                        .text(P::Description, "description")
                        .text(P::EncodingType, "encoding_type")
                        .geometry(P::Feature, "feature")
                        .json_map(P::Properties, "properties");
                }
            }

            for relation in schema.relations(entity_type) {
                let mapping = match relation.join {
                    JoinShape::SourceForeignKey { column } => FieldMapping::ForeignKey {
                        column: e.column(column, ColumnType::Integer),
                        target: relation.target,
                    },
                    JoinShape::TargetForeignKey { .. } => FieldMapping::Children {
                        target: relation.target,
                    },
                    JoinShape::Link(link) if relation.is_ordered() => {
                        FieldMapping::OrderedLinkEdge(link)
                    }
                    JoinShape::Link(link) => FieldMapping::LinkEdge(link),
                };
                e.mappings
                    .insert(Property::Navigation(relation.navigation), mapping);
            }
            entities.insert(entity_type, e);
        }

        let generated_foi = entities
            .get_mut(&EntityType::Location)
            .map(|e| e.column("gen_foi_id", ColumnType::Integer))
            .unwrap_or(Column {
                index: super::ColumnIndex(0),
                name: "gen_foi_id",
                column_type: ColumnType::Integer,
            });

        Self {
            entities,
            generated_foi,
        }
    }

    pub fn entity(&self, entity_type: EntityType) -> &EntityFields {
        &self.entities[&entity_type]
    }

    pub fn layout(&self, entity_type: EntityType) -> &TableLayout {
        &self.entity(entity_type).layout
    }

    /// Mapping of a property; unmapped pairs are an illegal argument.
    pub fn mapping(
        &self,
        entity_type: EntityType,
        property: impl Into<Property>,
    ) -> StoreResult<&FieldMapping> {
        let property = property.into();
        self.entity(entity_type).mapping(property).ok_or_else(|| {
            StoreError::IllegalArgument(format!("{} has no property {}", entity_type, property))
        })
    }

    pub fn fields(
        &self,
        entity_type: EntityType,
        property: impl Into<Property>,
    ) -> StoreResult<Vec<Field>> {
        Ok(self.mapping(entity_type, property)?.fields())
    }

    pub fn id_column(&self, entity_type: EntityType) -> Column {
        self.layout(entity_type).columns()[0]
    }

    /// Cache of the FeatureOfInterest generated from a Location.
    pub fn generated_foi_column(&self) -> Column {
        self.generated_foi
    }

    /// Decode one property, naming the property in conversion errors.
    pub fn read(
        &self,
        entity_type: EntityType,
        property: impl Into<Property>,
        row: &StoredRow,
    ) -> StoreResult<Decoded> {
        let property = property.into();
        self.mapping(entity_type, property)?.read(row)
    }

    /// Encode one property, naming the property in validation errors.
    pub fn write(
        &self,
        entity_type: EntityType,
        property: EntityProperty,
        value: &Value,
        ctx: &WriteContext<'_>,
    ) -> StoreResult<Vec<(Column, SqlValue)>> {
        self.mapping(entity_type, property)?
            .write(value, ctx)
            .map_err(|e| match e {
                StoreError::IllegalArgument(msg) => StoreError::IllegalArgument(format!(
                    "{}.{}: {}",
                    entity_type,
                    property.name(),
                    msg
                )),
                other => other,
            })
    }
}
