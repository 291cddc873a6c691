//! Store-level error type.
//!
//! Every resolver, writer and reader operation returns [`StoreResult`]. The
//! propagation layer maps an error to a response status through
//! [`StoreError::class`] alone.

use crate::query::PathError;
use crate::schema::SchemaError;

/// Errors raised by the persistence core.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A new entity lacks a required property or relation.
    #[error("Incomplete entity: {0}")]
    IncompleteEntity(String),

    /// A referenced entity does not exist.
    #[error("No such entity: {0}")]
    NoSuchEntity(String),

    /// The request is well-formed but semantically invalid.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// The store is in a state it should never reach.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse classification used by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    Internal,
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::IncompleteEntity(_)
            | StoreError::IllegalArgument(_)
            | StoreError::Path(_) => ErrorClass::BadRequest,
            StoreError::NoSuchEntity(_) => ErrorClass::NotFound,
            StoreError::IllegalState(_)
            | StoreError::Schema(_)
            | StoreError::Sqlite(_)
            | StoreError::Json(_) => ErrorClass::Internal,
        }
    }

    /// Build an [`StoreError::IllegalState`], logging it at error level.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("{}", message);
        StoreError::IllegalState(message)
    }
}
