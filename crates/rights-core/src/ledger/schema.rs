//! SQLite schema for the ledger backend

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Rights and copyrights (current holder projection)
CREATE TABLE IF NOT EXISTS records (
    persist_id TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    source_id TEXT,
    current_holder TEXT NOT NULL,
    signature TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_source ON records(source_id);
CREATE INDEX IF NOT EXISTS idx_records_holder ON records(current_holder);

-- Transfer events (append-only)
CREATE TABLE IF NOT EXISTS ledger_events (
    event_id TEXT PRIMARY KEY,
    sequence INTEGER NOT NULL UNIQUE,
    persist_id TEXT NOT NULL REFERENCES records(persist_id),
    from_holder TEXT NOT NULL,
    to_holder TEXT NOT NULL,
    metadata TEXT NOT NULL,
    signature TEXT NOT NULL,
    signed_at TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_events_entity ON ledger_events(persist_id, sequence);
"#
    }

    /// Get migration SQL for a specific version
    pub fn migration(from_version: u32, to_version: u32) -> Option<&'static str> {
        match (from_version, to_version) {
            // (1, 2) => Some("ALTER TABLE ..."),
            _ => None,
        }
    }
}
