//! Entity and navigation properties.

use serde::{Deserialize, Serialize};

use super::EntityType;

/// A scalar or composite property stored on the entity row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityProperty {
    Id,
    Name,
    Description,
    Properties,
    EncodingType,
    Location,
    Feature,
    Metadata,
    Definition,
    Time,
    ObservationType,
    MultiObservationDataTypes,
    UnitOfMeasurement,
    UnitOfMeasurements,
    ObservedArea,
    PhenomenonTime,
    ResultTime,
    ValidTime,
    Result,
    ResultQuality,
    Parameters,
}

impl EntityProperty {
    pub const ALL: [EntityProperty; 21] = [
        EntityProperty::Id,
        EntityProperty::Name,
        EntityProperty::Description,
        EntityProperty::Properties,
        EntityProperty::EncodingType,
        EntityProperty::Location,
        EntityProperty::Feature,
        EntityProperty::Metadata,
        EntityProperty::Definition,
        EntityProperty::Time,
        EntityProperty::ObservationType,
        EntityProperty::MultiObservationDataTypes,
        EntityProperty::UnitOfMeasurement,
        EntityProperty::UnitOfMeasurements,
        EntityProperty::ObservedArea,
        EntityProperty::PhenomenonTime,
        EntityProperty::ResultTime,
        EntityProperty::ValidTime,
        EntityProperty::Result,
        EntityProperty::ResultQuality,
        EntityProperty::Parameters,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityProperty::Id => "id",
            EntityProperty::Name => "name",
            EntityProperty::Description => "description",
            EntityProperty::Properties => "properties",
            EntityProperty::EncodingType => "encodingType",
            EntityProperty::Location => "location",
            EntityProperty::Feature => "feature",
            EntityProperty::Metadata => "metadata",
            EntityProperty::Definition => "definition",
            EntityProperty::Time => "time",
            EntityProperty::ObservationType => "observationType",
            EntityProperty::MultiObservationDataTypes => "multiObservationDataTypes",
            EntityProperty::UnitOfMeasurement => "unitOfMeasurement",
            EntityProperty::UnitOfMeasurements => "unitOfMeasurements",
            EntityProperty::ObservedArea => "observedArea",
            EntityProperty::PhenomenonTime => "phenomenonTime",
            EntityProperty::ResultTime => "resultTime",
            EntityProperty::ValidTime => "validTime",
            EntityProperty::Result => "result",
            EntityProperty::ResultQuality => "resultQuality",
            EntityProperty::Parameters => "parameters",
        }
    }

    /// Look a property up by name. `@iot.id` is accepted for `id`.
    pub fn from_name(name: &str) -> Option<EntityProperty> {
        if name == "@iot.id" {
            return Some(EntityProperty::Id);
        }
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Whether further path segments address keys inside a JSON value.
    pub fn allows_custom_path(&self) -> bool {
        matches!(
            self,
            EntityProperty::Properties | EntityProperty::Parameters | EntityProperty::Result
        )
    }
}

/// A property that follows a relation to another entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NavigationProperty {
    Thing,
    Things,
    Locations,
    HistoricalLocations,
    Sensor,
    ObservedProperty,
    ObservedProperties,
    Datastream,
    Datastreams,
    MultiDatastream,
    MultiDatastreams,
    Observations,
    FeatureOfInterest,
}

impl NavigationProperty {
    pub const ALL: [NavigationProperty; 13] = [
        NavigationProperty::Thing,
        NavigationProperty::Things,
        NavigationProperty::Locations,
        NavigationProperty::HistoricalLocations,
        NavigationProperty::Sensor,
        NavigationProperty::ObservedProperty,
        NavigationProperty::ObservedProperties,
        NavigationProperty::Datastream,
        NavigationProperty::Datastreams,
        NavigationProperty::MultiDatastream,
        NavigationProperty::MultiDatastreams,
        NavigationProperty::Observations,
        NavigationProperty::FeatureOfInterest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NavigationProperty::Thing => "Thing",
            NavigationProperty::Things => "Things",
            NavigationProperty::Locations => "Locations",
            NavigationProperty::HistoricalLocations => "HistoricalLocations",
            NavigationProperty::Sensor => "Sensor",
            NavigationProperty::ObservedProperty => "ObservedProperty",
            NavigationProperty::ObservedProperties => "ObservedProperties",
            NavigationProperty::Datastream => "Datastream",
            NavigationProperty::Datastreams => "Datastreams",
            NavigationProperty::MultiDatastream => "MultiDatastream",
            NavigationProperty::MultiDatastreams => "MultiDatastreams",
            NavigationProperty::Observations => "Observations",
            NavigationProperty::FeatureOfInterest => "FeatureOfInterest",
        }
    }

    pub fn from_name(name: &str) -> Option<NavigationProperty> {
        Self::ALL.into_iter().find(|n| n.name() == name)
    }

    /// The entity type this property points at.
    pub fn target(&self) -> EntityType {
        match self {
            NavigationProperty::Thing | NavigationProperty::Things => EntityType::Thing,
            NavigationProperty::Locations => EntityType::Location,
            NavigationProperty::HistoricalLocations => EntityType::HistoricalLocation,
            NavigationProperty::Sensor => EntityType::Sensor,
            NavigationProperty::ObservedProperty | NavigationProperty::ObservedProperties => {
                EntityType::ObservedProperty
            }
            NavigationProperty::Datastream | NavigationProperty::Datastreams => {
                EntityType::Datastream
            }
            NavigationProperty::MultiDatastream | NavigationProperty::MultiDatastreams => {
                EntityType::MultiDatastream
            }
            NavigationProperty::Observations => EntityType::Observation,
            NavigationProperty::FeatureOfInterest => EntityType::FeatureOfInterest,
        }
    }

    /// Whether the property holds a collection.
    pub fn is_set(&self) -> bool {
        matches!(
            self,
            NavigationProperty::Things
                | NavigationProperty::Locations
                | NavigationProperty::HistoricalLocations
                | NavigationProperty::ObservedProperties
                | NavigationProperty::Datastreams
                | NavigationProperty::MultiDatastreams
                | NavigationProperty::Observations
        )
    }
}

/// Either kind of property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Entity(EntityProperty),
    Navigation(NavigationProperty),
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Property::Entity(p) => p.name(),
            Property::Navigation(n) => n.name(),
        }
    }

    pub fn from_name(name: &str) -> Option<Property> {
        EntityProperty::from_name(name)
            .map(Property::Entity)
            .or_else(|| NavigationProperty::from_name(name).map(Property::Navigation))
    }
}

impl From<EntityProperty> for Property {
    fn from(p: EntityProperty) -> Self {
        Property::Entity(p)
    }
}

impl From<NavigationProperty> for Property {
    fn from(n: NavigationProperty) -> Self {
        Property::Navigation(n)
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
