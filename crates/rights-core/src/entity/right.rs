//! Derived rights

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::kind::EntityKind;
use super::linked_data::{LinkedDataDocument, RESERVED_KEYS};
use crate::error::{Result, RightsError};
use crate::identity::PublicKey;
use crate::ledger::{Ledger, LedgerRecord, PersistId};

/// A license or permission derived from another Right or a Copyright
#[derive(Debug, Clone, PartialEq)]
pub struct Right {
    persist_id: PersistId,
    source: PersistId,
    current_holder: PublicKey,
    fields: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Right {
    /// Load and validate a Right.
    ///
    /// Fails with `SchemaMismatch` if the stored record is not Right-shaped.
    pub fn load_full(ledger: &dyn Ledger, persist_id: &PersistId) -> Result<Self> {
        Self::from_record(ledger.get(persist_id)?)
    }

    pub(crate) fn from_record(record: LedgerRecord) -> Result<Self> {
        if let Err(reason) = EntityKind::Right.check_shape(&record.body) {
            return Err(mismatch(&record.persist_id, reason));
        }

        let mut fields = record.body;
        let source = match fields.remove("source") {
            Some(Value::String(source)) => PersistId::new(source),
            _ => {
                return Err(mismatch(
                    &record.persist_id,
                    "missing required field `source`".to_string(),
                ))
            }
        };

        Ok(Self {
            persist_id: record.persist_id,
            source,
            current_holder: record.current_holder,
            fields,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn persist_id(&self) -> &PersistId {
        &self.persist_id
    }

    pub fn source(&self) -> &PersistId {
        &self.source
    }

    pub fn current_holder(&self) -> &PublicKey {
        &self.current_holder
    }

    /// Descriptive fields (name, license, ...)
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
        LinkedDataDocument::new(context, EntityKind::Right.type_name(), self.persist_id.as_str())
            .with_fields(&self.fields, &RESERVED_KEYS)
            .with("source", self.source.as_str())
            .with("currentHolder", self.current_holder.as_str())
    }
}

fn mismatch(persist_id: &PersistId, reason: String) -> RightsError {
    RightsError::SchemaMismatch {
        persist_id: persist_id.to_string(),
        expected: EntityKind::Right,
        reason,
    }
}
