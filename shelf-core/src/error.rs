//! Error types for Shelf operations

use crate::{BookId, EntityIdType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification every failure maps onto.
///
/// Callers branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed body or violated field rules.
    Validation,
    /// Missing or invalid credential.
    Unauthenticated,
    /// Authenticated caller is not allowed to touch the resource.
    Forbidden,
    /// The addressed resource does not exist.
    NotFound,
    /// The persistent store rejected or failed the operation.
    Persistence,
    /// A request parameter could not be interpreted (e.g. non-integer page).
    InvalidArgument,
    /// Anything else; a bug or misconfiguration on our side.
    Internal,
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{operation} failed: {reason}")]
    Persistence { operation: &'static str, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl StorageError {
    /// Not-found error for a book id.
    pub fn book_not_found(id: BookId) -> Self {
        Self::NotFound {
            entity: BookId::ENTITY_NAME,
            id: id.to_string(),
        }
    }

    /// Persistence failure for the named operation.
    pub fn persistence(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Persistence {
            operation,
            reason: reason.into(),
        }
    }

    /// Invalid argument for the named field.
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Persistence { .. } => ErrorKind::Persistence,
            StorageError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }
}

/// Cache layer errors.
///
/// These never reach a client: the cache-aside layer logs and absorbs them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache transport error: {reason}")]
    Transport { reason: String },

    #[error("Cache codec error for key {key}: {reason}")]
    Codec { key: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Shelf errors.
#[derive(Debug, Clone, Error)]
pub enum ShelfError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ShelfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShelfError::Storage(e) => e.kind(),
            ShelfError::Cache(_) | ShelfError::Config(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Shelf operations.
pub type ShelfResult<T> = Result<T, ShelfError>;

// =============================================================================
// TESTS
// =============================================================================
