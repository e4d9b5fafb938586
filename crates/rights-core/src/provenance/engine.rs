//! Rights engine: registration, derivation, transfer and lookups

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde_json::{Map, Value};

use super::assignment::{RightsAssignment, ASSIGNMENT_RESERVED_KEYS};
use crate::config::LinkedDataConfig;
use crate::entity::{
    find_reserved, Copyright, Entity, LinkedDataDocument, Right, RightHandle, RESERVED_KEYS,
};
use crate::error::{Result, RightsError};
use crate::history::History;
use crate::identity::{canonical_json, domain, HolderCredential, PublicKey};
use crate::ledger::{InMemoryLedger, Ledger, PersistId, RecordDraft, TransferRecord};

/// Stateless facade over a ledger backend.
///
/// Holds only the injected ledger and immutable config, so clones are cheap
/// and may be used from any thread.
#[derive(Clone)]
pub struct RightsEngine {
    ledger: Arc<dyn Ledger>,
    linked_data: LinkedDataConfig,
}

impl RightsEngine {
    pub fn new(ledger: Arc<dyn Ledger>, linked_data: LinkedDataConfig) -> Self {
        Self {
            ledger,
            linked_data,
        }
    }

    /// Engine over a fresh in-memory ledger (for testing)
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLedger::new()), LinkedDataConfig::default())
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// `@context` used for emitted documents
    pub fn context(&self) -> &str {
        &self.linked_data.context
    }

    // ==================== Lookups ====================

    /// Fully load an entity, trying Right before Copyright
    pub fn resolve(&self, persist_id: &PersistId) -> Result<Entity> {
        tracing::debug!("Resolving {}", persist_id);
        Entity::resolve(self.ledger.as_ref(), persist_id)
    }

    /// Lazy handle; performs no I/O
    pub fn handle(&self, persist_id: &PersistId) -> RightHandle {
        RightHandle::new(Arc::clone(&self.ledger), persist_id.clone())
    }

    /// Transfer history of any entity id
    pub fn history(&self, persist_id: &PersistId) -> History {
        self.handle(persist_id).history()
    }

    pub fn serialize(&self, entity: &Entity) -> LinkedDataDocument {
        entity.to_linked_data(self.context())
    }

    pub fn serialize_assignment(&self, assignment: &RightsAssignment) -> LinkedDataDocument {
        assignment.to_linked_data(self.context())
    }

    // ==================== Mutations ====================

    /// Register a root Copyright held by `holder`
    pub fn register_copyright(
        &self,
        copyright_data: Map<String, Value>,
        holder: &HolderCredential,
    ) -> Result<Copyright> {
        reject_reserved(&copyright_data, &RESERVED_KEYS, "copyright")?;
        holder.ensure_key_pair()?;

        let persist_id = self.ledger.put(signed_draft(copyright_data, holder))?;
        tracing::info!(
            "Registered copyright {} for holder {}",
            persist_id,
            holder.public_key()
        );

        Copyright::load_full(self.ledger.as_ref(), &persist_id)
    }

    /// Create a new Right derived from `source_right_id`, held by `current_holder`.
    ///
    /// The source is not checked here; the ledger rejects a dangling source
    /// at write time. Derivation never locks the source, so any number of
    /// rights may share it.
    pub fn derive_right(
        &self,
        right_data: Map<String, Value>,
        source_right_id: &PersistId,
        current_holder: &HolderCredential,
    ) -> Result<Right> {
        reject_reserved(&right_data, &RESERVED_KEYS, "right")?;
        if source_right_id.as_str().trim().is_empty() {
            return Err(RightsError::Validation(
                "sourceRightId must not be empty".to_string(),
            ));
        }
        current_holder.ensure_key_pair()?;

        let mut body = right_data;
        body.insert(
            "source".to_string(),
            Value::String(source_right_id.to_string()),
        );

        let persist_id = self.ledger.put(signed_draft(body, current_holder))?;
        tracing::info!(
            "Derived right {} from {} for holder {}",
            persist_id,
            source_right_id,
            current_holder.public_key()
        );

        Right::load_full(self.ledger.as_ref(), &persist_id)
    }

    /// Move `entity` from `current_holder` to `to`.
    ///
    /// Fails with `Unauthorized` when `current_holder` is not the holder the
    /// ledger records at call time, however old the loaded `entity` is. The
    /// commit is a compare-and-set on that holder, so a transfer racing
    /// against another one on the same entity either commits in full or
    /// fails with a persistence conflict.
    pub fn transfer_right(
        &self,
        entity: &Entity,
        rights_assignment_data: Option<Map<String, Value>>,
        current_holder: &HolderCredential,
        to: &PublicKey,
    ) -> Result<RightsAssignment> {
        let persist_id = entity.persist_id();
        let recorded = self.ledger.get(persist_id)?;

        if current_holder.public_key() != &recorded.current_holder {
            tracing::warn!(
                "Rejected transfer of {}: {} is not the current holder",
                persist_id,
                current_holder.public_key()
            );
            return Err(RightsError::Unauthorized(format!(
                "{} is not the current holder of {}",
                current_holder.public_key(),
                persist_id
            )));
        }
        current_holder.ensure_key_pair()?;

        let metadata = rights_assignment_data.unwrap_or_default();
        reject_reserved(&metadata, &ASSIGNMENT_RESERVED_KEYS, "rightsAssignment")?;

        let signed_at = Utc::now().trunc_subsecs(6);
        let payload = RightsAssignment::signing_payload(
            persist_id,
            current_holder.public_key(),
            to,
            &metadata,
            &signed_at,
        );
        let transfer = TransferRecord {
            from: current_holder.public_key().clone(),
            to: to.clone(),
            metadata,
            signature: current_holder.sign(domain::ASSIGN, &payload),
            signed_at,
        };

        let event = self
            .ledger
            .commit_transfer(persist_id, transfer)
            .inspect_err(|e| tracing::warn!("Transfer of {} failed: {}", persist_id, e))?;

        tracing::info!(
            "Transferred {} to {} (event {})",
            persist_id,
            to,
            event.event_id
        );

        Ok(RightsAssignment::from_event(event))
    }

    /// Verify the signature of a committed assignment
    pub fn verify_assignment(&self, assignment: &RightsAssignment) -> Result<()> {
        assignment.verify()
    }
}

impl std::fmt::Debug for RightsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RightsEngine")
            .field("backend", &self.ledger.backend_name())
            .field("context", &self.linked_data.context)
            .finish()
    }
}

fn reject_reserved(fields: &Map<String, Value>, reserved: &[&str], what: &str) -> Result<()> {
    match find_reserved(fields, reserved) {
        Some(key) => Err(RightsError::Validation(format!(
            "{what} data must not set reserved field `{key}`"
        ))),
        None => Ok(()),
    }
}

fn signed_draft(body: Map<String, Value>, holder: &HolderCredential) -> RecordDraft {
    let signature = holder.sign(domain::CREATE, &canonical_json(&Value::Object(body.clone())));
    RecordDraft {
        body,
        holder: holder.public_key().clone(),
        signature,
    }
}
