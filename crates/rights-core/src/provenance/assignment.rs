//! Signed rights assignments

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::entity::LinkedDataDocument;
use crate::error::Result;
use crate::identity::{canonical_json, domain, PublicKey};
use crate::ledger::{EventId, LedgerEvent, PersistId};

/// Linked-data `@type` of an assignment document
pub const ASSIGNMENT_TYPE: &str = "RightsAssignment";

/// Keys owned by the assignment record; metadata may not set them
pub const ASSIGNMENT_RESERVED_KEYS: [&str; 8] = [
    "@context",
    "@type",
    "@id",
    "right",
    "from",
    "to",
    "signature",
    "signedAt",
];

/// Immutable record of a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsAssignment {
    pub event_id: EventId,
    pub right_id: PersistId,
    pub from: PublicKey,
    pub to: PublicKey,
    pub metadata: Map<String, Value>,
    /// Signature by `from` over [`RightsAssignment::signing_payload`] (hex)
    pub signature: String,
    pub signed_at: DateTime<Utc>,
    pub sequence: u64,
}

impl RightsAssignment {
    /// Bytes covered by the assignment signature
    pub fn signing_payload(
        right_id: &PersistId,
        from: &PublicKey,
        to: &PublicKey,
        metadata: &Map<String, Value>,
        signed_at: &DateTime<Utc>,
    ) -> Vec<u8> {
        canonical_json(&json!({
            "right": right_id.as_str(),
            "from": from.as_str(),
            "to": to.as_str(),
            "metadata": Value::Object(metadata.clone()),
            "signedAt": signed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }))
    }

    pub(crate) fn from_event(event: LedgerEvent) -> Self {
        Self {
            event_id: event.event_id,
            right_id: event.persist_id,
            from: event.transfer.from,
            to: event.transfer.to,
            metadata: event.transfer.metadata,
            signature: event.transfer.signature,
            signed_at: event.transfer.signed_at,
            sequence: event.sequence,
        }
    }

    /// Check the signature against the `from` key
    pub fn verify(&self) -> Result<()> {
        let payload = Self::signing_payload(
            &self.right_id,
            &self.from,
            &self.to,
            &self.metadata,
            &self.signed_at,
        );
        self.from.verify(domain::ASSIGN, &payload, &self.signature)
    }

    pub fn to_linked_data(&self, context: &str) -> LinkedDataDocument {
        LinkedDataDocument::new(context, ASSIGNMENT_TYPE, self.event_id.as_str())
            .with_fields(&self.metadata, &ASSIGNMENT_RESERVED_KEYS)
            .with("right", self.right_id.as_str())
            .with("from", self.from.as_str())
            .with("to", self.to.as_str())
            .with("signature", self.signature.as_str())
            .with(
                "signedAt",
                self.signed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            )
    }
}
