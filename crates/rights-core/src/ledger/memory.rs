//! In-memory ledger backend

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::types::{EventId, LedgerEvent, LedgerRecord, PersistId, RecordDraft, TransferRecord};
use super::Ledger;
use crate::error::{PersistenceError, Result, RightsError};

/// In-memory ledger for testing and development
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    records: HashMap<PersistId, LedgerRecord>,
    events: Vec<LedgerEvent>,
    index_by_entity: HashMap<PersistId, Vec<usize>>,
    sequence: u64,
}

impl InMemoryLedger {
    /// Create a new in-memory ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        self.read().map(|s| s.records.len()).unwrap_or(0)
    }

    /// Number of committed events across all records
    pub fn event_count(&self) -> usize {
        self.read().map(|s| s.events.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|e| PersistenceError::Database(format!("Lock poisoned: {}", e)).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|e| PersistenceError::Database(format!("Lock poisoned: {}", e)).into())
    }
}

impl Ledger for InMemoryLedger {
    fn put(&self, draft: RecordDraft) -> Result<PersistId> {
        let mut state = self.write()?;

        if let Some(source) = draft.source() {
            if !state.records.contains_key(&source) {
                return Err(PersistenceError::DanglingReference(format!(
                    "source {} does not exist",
                    source
                ))
                .into());
            }
        }

        let persist_id = PersistId::generate();
        let now = Utc::now();
        state.records.insert(
            persist_id.clone(),
            LedgerRecord {
                persist_id: persist_id.clone(),
                body: draft.body,
                current_holder: draft.holder,
                signature: draft.signature,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(persist_id)
    }

    fn get(&self, id: &PersistId) -> Result<LedgerRecord> {
        self.read()?
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| RightsError::NotFound(format!("no record with id {}", id)))
    }

    fn get_history(&self, id: &PersistId) -> Result<Vec<LedgerEvent>> {
        let state = self.read()?;
        if !state.records.contains_key(id) {
            return Err(RightsError::NotFound(format!("no record with id {}", id)));
        }

        Ok(state
            .index_by_entity
            .get(id)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| state.events.get(idx))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit_transfer(&self, id: &PersistId, transfer: TransferRecord) -> Result<LedgerEvent> {
        let mut state = self.write()?;
        let now = Utc::now();

        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| RightsError::NotFound(format!("no record with id {}", id)))?;

        if record.current_holder != transfer.from {
            return Err(PersistenceError::Conflict(format!(
                "holder of {} is no longer {}",
                id, transfer.from
            ))
            .into());
        }
        record.current_holder = transfer.to.clone();
        record.updated_at = now;

        state.sequence += 1;
        let event = LedgerEvent {
            event_id: EventId::generate(),
            persist_id: id.clone(),
            sequence: state.sequence,
            transfer,
            recorded_at: now,
        };

        let idx = state.events.len();
        state.events.push(event.clone());
        state.index_by_entity.entry(id.clone()).or_default().push(idx);

        Ok(event)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
