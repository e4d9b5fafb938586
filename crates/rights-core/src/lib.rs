//! Rights Core - Provenance tracking for rights and copyrights
//!
//! This crate provides the core functionality of the rights ledger:
//!
//! - **Entity**: Right and Copyright records, resolved from a bare persist id
//! - **Provenance**: Registration, derivation and signed transfer of entities
//! - **History**: Ordered reconstruction of an entity's transfer chain
//! - **Identity**: Ed25519 holder keys, signing and canonical JSON
//! - **Ledger**: Storage adapter trait with in-memory and SQLite backends
//! - **Config**: Ledger, server and linked-data settings
//!
//! # Architecture
//!
//! All writes go through a [`Ledger`] backend:
//! - Records are append-only; only the current holder changes
//! - Every transfer is an immutable, signed ledger event
//! - A transfer commits as a compare-and-set on the previous holder
//! - History is replayed from the events, never stored separately
//!
//! ```text
//! Copyright → Right → Right ...
//!   root      source   source
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod history;
pub mod identity;
pub mod ledger;
pub mod provenance;

pub use config::{ConfigError, LedgerConfig, LinkedDataConfig, RightsConfig, ServerConfig};
pub use entity::{
    Copyright, Entity, EntityKind, LinkedDataDocument, Right, RightHandle, DEFAULT_CONTEXT,
};
pub use error::{ErrorKind, PersistenceError, Result, RightsError};
pub use history::{History, HistoryEvent, HistoryUser};
pub use identity::{HolderCredential, PublicKey};
pub use ledger::{connect, InMemoryLedger, Ledger, PersistId};
#[cfg(feature = "sqlite")]
pub use ledger::SqliteLedger;
pub use provenance::{RightsAssignment, RightsEngine};

/// Returns the version of rights-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
