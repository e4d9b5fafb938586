//! History reconstruction
//!
//! Replays the transfer events of a record, in ledger order, into a list of
//! `(holder, event id)` entries. History is keyed by persist id only; it never
//! needs to know whether the id names a Right or a Copyright.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, Result};
use crate::identity::PublicKey;
use crate::ledger::{EventId, Ledger, LedgerEvent, PersistId};

/// Holder that signed a transfer.
///
/// Private keys are never persisted, so `private_key` is always `None` on
/// reconstructed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryUser {
    pub public_key: PublicKey,
    pub private_key: Option<String>,
}

/// One entry of a record's provenance chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub user: HistoryUser,
    pub event_id: EventId,
    /// Holder after this event
    pub new_holder: PublicKey,
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEvent {
    fn from_ledger_event(event: LedgerEvent) -> Self {
        Self {
            user: HistoryUser {
                public_key: event.transfer.from,
                private_key: None,
            },
            event_id: event.event_id,
            new_holder: event.transfer.to,
            sequence: event.sequence,
            recorded_at: event.recorded_at,
        }
    }
}

/// Lazy, restartable view of a record's history.
///
/// Creating a `History` does no I/O. Every call to [`History::iter`] or
/// [`History::events`] reads the ledger again, so a later call sees events
/// committed since the previous one.
#[derive(Clone)]
pub struct History {
    ledger: Arc<dyn Ledger>,
    persist_id: PersistId,
}

impl History {
    pub fn new(ledger: Arc<dyn Ledger>, persist_id: PersistId) -> Self {
        Self { ledger, persist_id }
    }

    pub fn persist_id(&self) -> &PersistId {
        &self.persist_id
    }

    /// Start a fresh pass over the history
    pub fn iter(&self) -> Result<HistoryIter> {
        let mut events = self.ledger.get_history(&self.persist_id)?;
        events.sort_by_key(|e| e.sequence);
        Ok(HistoryIter {
            inner: events.into_iter(),
            previous_holder: None,
        })
    }

    /// Collect the whole history, earliest first
    pub fn events(&self) -> Result<Vec<HistoryEvent>> {
        self.iter()?.collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.ledger.get_history(&self.persist_id)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("persist_id", &self.persist_id)
            .finish()
    }
}

/// One pass over a record's history.
///
/// Checks chain continuity as it goes: each event must start from the holder
/// the previous event ended with.
pub struct HistoryIter {
    inner: std::vec::IntoIter<LedgerEvent>,
    previous_holder: Option<PublicKey>,
}

impl Iterator for HistoryIter {
    type Item = Result<HistoryEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.inner.next()?;

        if let Some(ref previous) = self.previous_holder {
            if *previous != event.transfer.from {
                return Some(Err(PersistenceError::Corrupt(format!(
                    "event {} of {} starts from {} but the chain ended at {}",
                    event.event_id, event.persist_id, event.transfer.from, previous
                ))
                .into()));
            }
        }
        self.previous_holder = Some(event.transfer.to.clone());

        Some(Ok(HistoryEvent::from_ledger_event(event)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
