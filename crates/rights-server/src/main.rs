//! Rights Server Binary
//!
//! Standalone server for the rights ledger API.

use std::sync::Arc;

use rights_core::RightsConfig;
use rights_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "rights_server=info,rights_core=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = RightsConfig::load()?;
    let state = Arc::new(AppState::from_config(&config)?);

    serve(&config.server.addr, state).await
}
