//! Record and event types exchanged with a ledger backend

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::identity::PublicKey;

/// Identifier assigned by the backend on first write
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistId(String);

impl PersistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random persist id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersistId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a committed ledger event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random event id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record about to be written with [`Ledger::put`](super::Ledger::put)
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    /// Descriptive fields plus `source` for derived rights
    pub body: Map<String, Value>,
    /// Initial holder
    pub holder: PublicKey,
    /// Creation signature by the holder (hex)
    pub signature: String,
}

impl RecordDraft {
    /// The id this record derives from, if any
    pub fn source(&self) -> Option<PersistId> {
        self.body
            .get("source")
            .and_then(Value::as_str)
            .map(PersistId::from)
    }
}

/// A stored record as returned by [`Ledger::get`](super::Ledger::get)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub persist_id: PersistId,
    pub body: Map<String, Value>,
    pub current_holder: PublicKey,
    pub signature: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A signed holder change, handed to
/// [`Ledger::commit_transfer`](super::Ledger::commit_transfer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Holder at signing time; also the compare-and-set precondition
    pub from: PublicKey,
    pub to: PublicKey,
    pub metadata: Map<String, Value>,
    /// Signature by `from` (hex)
    pub signature: String,
    pub signed_at: DateTime<Utc>,
}

/// A committed transfer event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_id: EventId,
    pub persist_id: PersistId,
    /// Backend-wide ordering
    pub sequence: u64,
    pub transfer: TransferRecord,
    pub recorded_at: DateTime<Utc>,
}
