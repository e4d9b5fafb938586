//! Shared fixtures for rights-core integration tests

use rights_core::{Copyright, HolderCredential, RightsEngine};
use serde_json::{json, Map, Value};

/// JSON object literal as a field map
pub fn fields(value: Value) -> Map<String, Value> {
    value
        .as_object()
        .cloned()
        .unwrap_or_else(|| panic!("fixture is not an object: {}", value))
}

/// Copyright for a novel, held by `author`
pub fn novel(engine: &RightsEngine, author: &HolderCredential) -> Copyright {
    engine
        .register_copyright(
            fields(json!({"name": "The Long Afternoon", "author": "M. Ortega"})),
            author,
        )
        .expect("register copyright")
}

/// Engine backed by an SQLite file in `dir`
#[cfg(feature = "sqlite")]
#[allow(dead_code)]
pub fn sqlite_engine(dir: &std::path::Path) -> RightsEngine {
    use std::sync::Arc;
    use std::time::Duration;

    let ledger = rights_core::SqliteLedger::open(dir.join("ledger.db"), Duration::from_secs(5))
        .expect("open sqlite ledger");
    RightsEngine::new(Arc::new(ledger), Default::default())
}
