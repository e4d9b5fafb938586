//! Error types for rights-core

use serde::Serialize;
use thiserror::Error;

use crate::entity::EntityKind;

/// Result type alias for rights operations
pub type Result<T> = std::result::Result<T, RightsError>;

/// Main error type for rights operations
#[derive(Error, Debug)]
pub enum RightsError {
    /// No record exists for the id
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record exists but does not have the requested entity shape.
    ///
    /// Only produced by the variant-specific loaders; `resolve` consumes it
    /// while walking the resolution order.
    #[error("Record {persist_id} is not a {expected}: {reason}")]
    SchemaMismatch {
        persist_id: String,
        expected: EntityKind,
        reason: String,
    },

    /// Holder or signature mismatch
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ledger backend failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Ledger backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Compare-and-set lost against a concurrent write
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Backend did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Backend could not be reached or opened
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A written record references an id the backend does not know
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    /// Stored data violates a ledger invariant
    #[error("Corrupt ledger data: {0}")]
    Corrupt(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PersistenceError {
    /// Short machine-readable reason, e.g. `timeout`
    pub fn reason(&self) -> &'static str {
        match self {
            PersistenceError::Conflict(_) => "conflict",
            PersistenceError::Timeout(_) => "timeout",
            PersistenceError::Connectivity(_) => "connectivity",
            PersistenceError::DanglingReference(_) => "dangling_reference",
            PersistenceError::Corrupt(_) => "corrupt",
            PersistenceError::Database(_) => "database",
            PersistenceError::Serialization(_) => "serialization",
        }
    }
}

/// Coarse error classification used by API layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    SchemaMismatch,
    Unauthorized,
    Validation,
    Persistence,
}

impl RightsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RightsError::NotFound(_) => ErrorKind::NotFound,
            RightsError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            RightsError::Unauthorized(_) => ErrorKind::Unauthorized,
            RightsError::Validation(_) => ErrorKind::Validation,
            RightsError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Whether this is a persistence timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, RightsError::Persistence(PersistenceError::Timeout(_)))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        RightsError::Validation(msg.into())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                PersistenceError::Timeout(err.to_string())
            }
            Some(rusqlite::ErrorCode::CannotOpen) => PersistenceError::Connectivity(err.to_string()),
            _ => PersistenceError::Database(err.to_string()),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for RightsError {
    fn from(err: rusqlite::Error) -> Self {
        RightsError::Persistence(PersistenceError::from(err))
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for RightsError {
    fn from(err: serde_json::Error) -> Self {
        RightsError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}
