//! SQLite ledger backend (requires "sqlite" feature)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::{Map, Value};

use super::schema::{Schema, SCHEMA_VERSION};
use super::types::{EventId, LedgerEvent, LedgerRecord, PersistId, RecordDraft, TransferRecord};
use super::Ledger;
use crate::error::{PersistenceError, Result, RightsError};
use crate::identity::PublicKey;

const RECORD_COLUMNS: &str =
    "persist_id, body, current_holder, signature, created_at, updated_at";

const EVENT_COLUMNS: &str = "event_id, sequence, persist_id, from_holder, to_holder, metadata, signature, signed_at, recorded_at";

/// SQLite-backed ledger
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger database at the given path
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            PersistenceError::Connectivity(format!(
                "cannot open {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_connection(conn, busy_timeout)
    }

    /// Create an in-memory ledger database (for testing)
    pub fn in_memory(busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, busy_timeout)
    }

    fn from_connection(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.busy_timeout(busy_timeout)?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the database schema
    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(Schema::create_tables())?;

        let current_version: u32 = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);

        if current_version > SCHEMA_VERSION {
            return Err(PersistenceError::Database(format!(
                "ledger schema version {} is newer than supported {}",
                current_version, SCHEMA_VERSION
            ))
            .into());
        }

        if current_version < SCHEMA_VERSION {
            for version in current_version.max(1)..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    conn.execute_batch(migration)?;
                }
            }
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PersistenceError::Database(format!("Mutex poisoned: {}", e)).into())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<LedgerRecord> {
        let persist_id: String = row.get(0)?;
        let body: String = row.get(1)?;
        let current_holder: String = row.get(2)?;

        Ok(LedgerRecord {
            persist_id: PersistId::new(persist_id),
            body: serde_json::from_str::<Map<String, Value>>(&body)
                .map_err(|e| conversion_error(1, e))?,
            current_holder: PublicKey::parse(&current_holder)
                .map_err(|e| conversion_error(2, e))?,
            signature: row.get(3)?,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<LedgerEvent> {
        let event_id: String = row.get(0)?;
        let persist_id: String = row.get(2)?;
        let from: String = row.get(3)?;
        let to: String = row.get(4)?;
        let metadata: String = row.get(5)?;

        Ok(LedgerEvent {
            event_id: EventId::new(event_id),
            sequence: row.get::<_, i64>(1)? as u64,
            persist_id: PersistId::new(persist_id),
            transfer: TransferRecord {
                from: PublicKey::parse(&from).map_err(|e| conversion_error(3, e))?,
                to: PublicKey::parse(&to).map_err(|e| conversion_error(4, e))?,
                metadata: serde_json::from_str::<Map<String, Value>>(&metadata)
                    .map_err(|e| conversion_error(5, e))?,
                signature: row.get(6)?,
                signed_at: parse_timestamp(row, 7)?,
            },
            recorded_at: parse_timestamp(row, 8)?,
        })
    }
}

impl Ledger for SqliteLedger {
    fn put(&self, draft: RecordDraft) -> Result<PersistId> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let source = draft.source();
        if let Some(ref source) = source {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE persist_id = ?1)",
                [source.as_str()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(PersistenceError::DanglingReference(format!(
                    "source {} does not exist",
                    source
                ))
                .into());
            }
        }

        let persist_id = PersistId::generate();
        let now = Utc::now().to_rfc3339();
        tx.execute(
            r#"
            INSERT INTO records (persist_id, body, source_id, current_holder, signature, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                persist_id.as_str(),
                serde_json::to_string(&draft.body)?,
                source.as_ref().map(|s| s.as_str()),
                draft.holder.as_str(),
                draft.signature,
                now,
            ],
        )?;
        tx.commit()?;

        Ok(persist_id)
    }

    fn get(&self, id: &PersistId) -> Result<LedgerRecord> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE persist_id = ?1"),
            [id.as_str()],
            Self::row_to_record,
        )
        .optional()?
        .ok_or_else(|| RightsError::NotFound(format!("no record with id {}", id)))
    }

    fn get_history(&self, id: &PersistId) -> Result<Vec<LedgerEvent>> {
        let conn = self.lock()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE persist_id = ?1)",
            [id.as_str()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RightsError::NotFound(format!("no record with id {}", id)));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM ledger_events WHERE persist_id = ?1 ORDER BY sequence"
        ))?;
        let events = stmt
            .query_map([id.as_str()], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn commit_transfer(&self, id: &PersistId, transfer: TransferRecord) -> Result<LedgerEvent> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now();

        let holder: Option<String> = tx
            .query_row(
                "SELECT current_holder FROM records WHERE persist_id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match holder {
            None => return Err(RightsError::NotFound(format!("no record with id {}", id))),
            Some(holder) if holder != transfer.from.as_str() => {
                return Err(PersistenceError::Conflict(format!(
                    "holder of {} is no longer {}",
                    id, transfer.from
                ))
                .into());
            }
            Some(_) => {}
        }

        let updated = tx.execute(
            "UPDATE records SET current_holder = ?1, updated_at = ?2 WHERE persist_id = ?3 AND current_holder = ?4",
            params![
                transfer.to.as_str(),
                now.to_rfc3339(),
                id.as_str(),
                transfer.from.as_str(),
            ],
        )?;
        if updated != 1 {
            return Err(PersistenceError::Conflict(format!(
                "holder of {} changed during transfer",
                id
            ))
            .into());
        }

        let sequence: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM ledger_events",
            [],
            |row| row.get(0),
        )?;
        let event = LedgerEvent {
            event_id: EventId::generate(),
            persist_id: id.clone(),
            sequence: sequence as u64,
            transfer,
            recorded_at: now,
        };

        tx.execute(
            &format!(
                "INSERT INTO ledger_events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                event.event_id.as_str(),
                sequence,
                event.persist_id.as_str(),
                event.transfer.from.as_str(),
                event.transfer.to.as_str(),
                serde_json::to_string(&event.transfer.metadata)?,
                event.transfer.signature,
                event.transfer.signed_at.to_rfc3339(),
                event.recorded_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        Ok(event)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::HolderCredential;
    use serde_json::json;

    fn ledger() -> SqliteLedger {
        SqliteLedger::in_memory(Duration::from_millis(500)).unwrap()
    }

    fn draft(holder: &PublicKey, source: Option<&PersistId>) -> RecordDraft {
        let mut body = Map::new();
        body.insert("name".into(), json!("Stored"));
        if let Some(source) = source {
            body.insert("source".into(), json!(source.as_str()));
        }
        RecordDraft {
            body,
            holder: holder.clone(),
            signature: "ab".into(),
        }
    }

    fn transfer(from: &PublicKey, to: &PublicKey) -> TransferRecord {
        let mut metadata = Map::new();
        metadata.insert("note".into(), json!("sale"));
        TransferRecord {
            from: from.clone(),
            to: to.clone(),
            metadata,
            signature: "cd".into(),
            signed_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_get_round_trip() {
        let ledger = ledger();
        let holder = HolderCredential::generate().public_key().clone();

        let root = ledger.put(draft(&holder, None)).unwrap();
        let child = ledger.put(draft(&holder, Some(&root))).unwrap();

        let record = ledger.get(&child).unwrap();
        assert_eq!(record.persist_id, child);
        assert_eq!(record.body.get("source"), Some(&json!(root.as_str())));
        assert_eq!(record.current_holder, holder);
        assert_eq!(record.signature, "ab");
    }

    #[test]
    fn test_dangling_source_rejected() {
        let ledger = ledger();
        let holder = HolderCredential::generate().public_key().clone();

        assert!(matches!(
            ledger.put(draft(&holder, Some(&PersistId::from("ghost")))),
            Err(RightsError::Persistence(PersistenceError::DanglingReference(_)))
        ));
    }

    #[test]
    fn test_transfer_and_history() {
        let ledger = ledger();
        let a = HolderCredential::generate().public_key().clone();
        let b = HolderCredential::generate().public_key().clone();

        let id = ledger.put(draft(&a, None)).unwrap();
        assert!(ledger.get_history(&id).unwrap().is_empty());

        let committed = ledger.commit_transfer(&id, transfer(&a, &b)).unwrap();
        let history = ledger.get_history(&id).unwrap();

        assert_eq!(history, vec![committed]);
        assert_eq!(history[0].transfer.metadata.get("note"), Some(&json!("sale")));
        assert_eq!(ledger.get(&id).unwrap().current_holder, b);
    }

    #[test]
    fn test_stale_transfer_conflicts() {
        let ledger = ledger();
        let a = HolderCredential::generate().public_key().clone();
        let b = HolderCredential::generate().public_key().clone();

        let id = ledger.put(draft(&a, None)).unwrap();
        ledger.commit_transfer(&id, transfer(&a, &b)).unwrap();

        assert!(matches!(
            ledger.commit_transfer(&id, transfer(&a, &b)),
            Err(RightsError::Persistence(PersistenceError::Conflict(_)))
        ));
        assert_eq!(ledger.get_history(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_record() {
        let ledger = ledger();
        let a = HolderCredential::generate().public_key().clone();
        let missing = PersistId::from("missing");

        assert!(matches!(ledger.get(&missing), Err(RightsError::NotFound(_))));
        assert!(matches!(
            ledger.get_history(&missing),
            Err(RightsError::NotFound(_))
        ));
        assert!(matches!(
            ledger.commit_transfer(&missing, transfer(&a, &a)),
            Err(RightsError::NotFound(_))
        ));
    }

    #[test]
    fn test_reopen_file_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let holder = HolderCredential::generate().public_key().clone();

        let id = {
            let ledger = SqliteLedger::open(&path, Duration::from_millis(500)).unwrap();
            ledger.put(draft(&holder, None)).unwrap()
        };

        let reopened = SqliteLedger::open(&path, Duration::from_millis(500)).unwrap();
        assert_eq!(reopened.get(&id).unwrap().current_holder, holder);
    }
}
