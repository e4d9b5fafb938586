//! Persistence adapter for rights records
//!
//! The engine reaches durable storage only through the [`Ledger`] trait.
//! Every call is atomic on its own; the engine adds no transactions,
//! caching or retries on top.

mod memory;
#[cfg(feature = "sqlite")]
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;
mod types;

use std::sync::Arc;

pub use memory::InMemoryLedger;
#[cfg(feature = "sqlite")]
pub use schema::{Schema, SCHEMA_VERSION};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedger;
pub use types::{EventId, LedgerEvent, LedgerRecord, PersistId, RecordDraft, TransferRecord};

use crate::config::LedgerConfig;
use crate::error::{Result, RightsError};

/// Trait for ledger storage backends
pub trait Ledger: Send + Sync {
    /// Write a new record and assign its persist id.
    ///
    /// Fails with `PersistenceError::DanglingReference` when the draft's
    /// `source` is unknown to the backend.
    fn put(&self, draft: RecordDraft) -> Result<PersistId>;

    /// Get a record by id, `NotFound` if absent
    fn get(&self, id: &PersistId) -> Result<LedgerRecord>;

    /// Get the transfer events of a record, earliest first.
    /// `NotFound` if the record is absent.
    fn get_history(&self, id: &PersistId) -> Result<Vec<LedgerEvent>>;

    /// Append a transfer event and move the holder to `transfer.to`.
    ///
    /// Compare-and-set on the holder: commits only if the recorded holder is
    /// still `transfer.from`, otherwise fails with
    /// `PersistenceError::Conflict` and changes nothing.
    fn commit_transfer(&self, id: &PersistId, transfer: TransferRecord) -> Result<LedgerEvent>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Open the backend named by `config.url`.
///
/// Supported URLs: `memory://`, `sqlite::memory:` and `sqlite://<path>`.
pub fn connect(config: &LedgerConfig) -> Result<Arc<dyn Ledger>> {
    let url = config.url.trim();

    if url == "memory" || url == "memory://" {
        tracing::info!("Using in-memory ledger");
        return Ok(Arc::new(InMemoryLedger::new()));
    }

    if url.starts_with("sqlite:") {
        return connect_sqlite(url, config);
    }

    Err(RightsError::Validation(format!(
        "Unsupported ledger url: {url}"
    )))
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &str, config: &LedgerConfig) -> Result<Arc<dyn Ledger>> {
    let timeout = std::time::Duration::from_millis(config.busy_timeout_ms);

    if url == "sqlite::memory:" {
        tracing::info!("Using in-memory SQLite ledger");
        return Ok(Arc::new(SqliteLedger::in_memory(timeout)?));
    }

    match url.strip_prefix("sqlite://") {
        Some(path) if !path.is_empty() => {
            tracing::info!("Opening SQLite ledger at {}", path);
            Ok(Arc::new(SqliteLedger::open(path, timeout)?))
        }
        _ => Err(RightsError::Validation(format!(
            "Malformed sqlite ledger url: {url}"
        ))),
    }
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(url: &str, _config: &LedgerConfig) -> Result<Arc<dyn Ledger>> {
    Err(RightsError::Validation(format!(
        "Ledger url {url} needs the `sqlite` feature"
    )))
}
