//! Entity model for rights records
//!
//! A persist id alone does not say whether it names a [`Right`] or a
//! [`Copyright`]. [`Entity::resolve`] reads the record once and tries each
//! kind in [`EntityKind::RESOLUTION_ORDER`]; a shape mismatch moves on to the
//! next kind. [`RightHandle`] is the lazy alternative that skips loading and
//! only supports history traversal.

mod copyright;
mod kind;
mod linked_data;
mod right;

use std::sync::Arc;

pub use copyright::Copyright;
pub use kind::EntityKind;
pub use linked_data::{LinkedDataDocument, DEFAULT_CONTEXT, RESERVED_KEYS};
pub(crate) use linked_data::find_reserved;
pub use right::Right;

use crate::error::{Result, RightsError};
use crate::history::History;
use crate::identity::PublicKey;
use crate::ledger::{Ledger, LedgerRecord, PersistId};

/// A fully loaded rights entity
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Right(Right),
    Copyright(Copyright),
}

impl Entity {
    /// Load `persist_id` as the first kind whose shape fits.
    pub fn resolve(ledger: &dyn Ledger, persist_id: &PersistId) -> Result<Self> {
        let record = ledger.get(persist_id)?;

        for kind in EntityKind::RESOLUTION_ORDER {
            match Self::from_record(kind, record.clone()) {
                Ok(entity) => return Ok(entity),
                Err(RightsError::SchemaMismatch { reason, .. }) => {
                    tracing::debug!("{} is not a {}: {}", persist_id, kind, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RightsError::NotFound(format!(
            "no rights entity with id {}",
            persist_id
        )))
    }

    fn from_record(kind: EntityKind, record: LedgerRecord) -> Result<Self> {
        match kind {
            EntityKind::Right => Right::from_record(record).map(Entity::Right),
            EntityKind::Copyright => Copyright::from_record(record).map(Entity::Copyright),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Right(_) => EntityKind::Right,
            Entity::Copyright(_) => EntityKind::Copyright,
        }
    }

    pub fn persist_id(&self) -> &PersistId {
        match self {
            Entity::Right(right) => right.persist_id(),
            Entity::Copyright(copyright) => copyright.persist_id(),
        }
    }

    pub fn current_holder(&self) -> &PublicKey {
        match self {
            Entity::Right(right) => right.current_holder(),
            Entity::Copyright(copyright) => copyright.current_holder(),
        }
    }

    /// Source id for rights, `None` for copyrights
    pub fn source(&self) -> Option<&PersistId> {
        match self {
            Entity::Right(right) => Some(right.source()),
            Entity::Copyright(_) => None,
        }
    }

    pub fn to_linked_data(&self, context: &str) -> LinkedDataDocument {
        match self {
            Entity::Right(right) => right.to_linked_data(context),
            Entity::Copyright(copyright) => copyright.to_linked_data(context),
        }
    }

    pub fn as_right(&self) -> Option<&Right> {
        match self {
            Entity::Right(right) => Some(right),
            Entity::Copyright(_) => None,
        }
    }

    pub fn as_copyright(&self) -> Option<&Copyright> {
        match self {
            Entity::Right(_) => None,
            Entity::Copyright(copyright) => Some(copyright),
        }
    }
}

impl From<Right> for Entity {
    fn from(right: Right) -> Self {
        Entity::Right(right)
    }
}

impl From<Copyright> for Entity {
    fn from(copyright: Copyright) -> Self {
        Entity::Copyright(copyright)
    }
}

/// Unloaded reference to a rights entity, good for history only
#[derive(Clone)]
pub struct RightHandle {
    persist_id: PersistId,
    ledger: Arc<dyn Ledger>,
}

impl RightHandle {
    pub fn new(ledger: Arc<dyn Ledger>, persist_id: PersistId) -> Self {
        Self { persist_id, ledger }
    }

    pub fn persist_id(&self) -> &PersistId {
        &self.persist_id
    }

    /// Transfer history; no record is read until it is iterated
    pub fn history(&self) -> History {
        History::new(Arc::clone(&self.ledger), self.persist_id.clone())
    }
}

impl std::fmt::Debug for RightHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RightHandle")
            .field("persist_id", &self.persist_id)
            .field("backend", &self.ledger.backend_name())
            .finish()
    }
}
