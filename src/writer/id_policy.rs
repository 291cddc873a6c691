//! Who picks the primary key of a new entity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, EntityType};

/// Configured primary key policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdGenerationMode {
    /// Client ids are ignored.
    #[default]
    ServerGeneratedOnly,
    /// A valid client id is kept, otherwise the store assigns one.
    ServerAndClientGenerated,
    /// Every new entity must carry a valid client id.
    ClientGeneratedOnly,
}

impl IdGenerationMode {
    pub fn name(&self) -> &'static str {
        match self {
            IdGenerationMode::ServerGeneratedOnly => "ServerGeneratedOnly",
            IdGenerationMode::ServerAndClientGenerated => "ServerAndClientGenerated",
            IdGenerationMode::ClientGeneratedOnly => "ClientGeneratedOnly",
        }
    }

    /// The id to insert with, or `None` to let the database assign one.
    pub fn resolve(
        &self,
        entity_type: EntityType,
        client_id: Option<EntityId>,
    ) -> StoreResult<Option<EntityId>> {
        let valid = client_id.filter(|id| id.0 > 0);
        match self {
            IdGenerationMode::ServerGeneratedOnly => {
                if let Some(id) = client_id {
                    log::warn!("ignoring client id {} for new {}", id, entity_type);
                }
                Ok(None)
            }
            IdGenerationMode::ServerAndClientGenerated => {
                if valid.is_none() && client_id.is_some() {
                    log::warn!("ignoring invalid client id for new {}", entity_type);
                }
                Ok(valid)
            }
            IdGenerationMode::ClientGeneratedOnly => valid.map(Some).ok_or_else(|| {
                StoreError::IncompleteEntity(format!("{} needs a client-supplied id", entity_type))
            }),
        }
    }
}

impl std::fmt::Display for IdGenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IdGenerationMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ServerGeneratedOnly" => Ok(IdGenerationMode::ServerGeneratedOnly),
            "ServerAndClientGenerated" => Ok(IdGenerationMode::ServerAndClientGenerated),
            "ClientGeneratedOnly" => Ok(IdGenerationMode::ClientGeneratedOnly),
            other => Err(StoreError::IllegalArgument(format!(
                "unsupported id generation mode: {}",
                other
            ))),
        }
    }
}
