//! Error types for mongo-proc

use thiserror::Error;

/// Result type alias for mongo-proc operations
pub type Result<T> = std::result::Result<T, MongoProcError>;

/// Unified error type for all mongo-proc operations
///
/// Driver failures are carried unmodified in [`MongoProcError::MongoDB`];
/// this layer never retries them or reclassifies their kind.
#[derive(Error, Debug)]
pub enum MongoProcError {
    /// Operating without a usable connection, or connecting with missing arguments
    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "mongodb-errors")]
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MongoProcError {
    /// Returns true if the call failed before reaching the store because
    /// the facade was not usable (uninitialized, closed, bad arguments)
    pub fn is_config_error(&self) -> bool {
        matches!(self, MongoProcError::Config(_))
    }

    /// Returns the underlying driver error, if this error came from the store
    #[cfg(feature = "mongodb-errors")]
    pub fn driver_error(&self) -> Option<&mongodb::error::Error> {
        match self {
            MongoProcError::MongoDB(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MongoProcError {
    fn from(err: serde_json::Error) -> Self {
        MongoProcError::Serialization(err.to_string())
    }
}

// BSON-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for MongoProcError {
    fn from(err: bson::ser::Error) -> Self {
        MongoProcError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for MongoProcError {
    fn from(err: bson::de::Error) -> Self {
        MongoProcError::Serialization(format!("BSON deserialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::oid::Error> for MongoProcError {
    fn from(err: bson::oid::Error) -> Self {
        MongoProcError::InvalidId(err.to_string())
    }
}
