//! Root authorship entities

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::kind::EntityKind;
use super::linked_data::{LinkedDataDocument, RESERVED_KEYS};
use crate::error::{Result, RightsError};
use crate::identity::PublicKey;
use crate::ledger::{Ledger, LedgerRecord, PersistId};

/// Original authorship over a work; the root of a rights chain
#[derive(Debug, Clone, PartialEq)]
pub struct Copyright {
    persist_id: PersistId,
    current_holder: PublicKey,
    fields: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Copyright {
    /// Load and validate a Copyright.
    ///
    /// Fails with `SchemaMismatch` if the stored record has a `source`.
    pub fn load_full(ledger: &dyn Ledger, persist_id: &PersistId) -> Result<Self> {
        Self::from_record(ledger.get(persist_id)?)
    }

    pub(crate) fn from_record(record: LedgerRecord) -> Result<Self> {
        EntityKind::Copyright
            .check_shape(&record.body)
            .map_err(|reason| RightsError::SchemaMismatch {
                persist_id: record.persist_id.to_string(),
                expected: EntityKind::Copyright,
                reason,
            })?;

        Ok(Self {
            persist_id: record.persist_id,
            current_holder: record.current_holder,
            fields: record.body,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn persist_id(&self) -> &PersistId {
        &self.persist_id
    }

    pub fn current_holder(&self) -> &PublicKey {
        &self.current_holder
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn to_linked_data(&self, context: &str) -> LinkedDataDocument {
        LinkedDataDocument::new(
            context,
            EntityKind::Copyright.type_name(),
            self.persist_id.as_str(),
        )
        .with_fields(&self.fields, &RESERVED_KEYS)
        .with("currentHolder", self.current_holder.as_str())
    }
}
