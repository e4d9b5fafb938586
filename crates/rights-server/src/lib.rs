//! Rights Server - Rights Ledger API Server
//!
//! HTTP server for creating, fetching and transferring rights.

pub mod error;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use rights_core::{PersistenceError, RightsConfig, RightsEngine, RightsError};

pub use error::{ApiError, ApiResult};

/// Shared application state
pub struct AppState {
    pub engine: RightsEngine,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: RightsEngine, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }

    /// Connect the configured ledger and build the engine over it
    pub fn from_config(config: &RightsConfig) -> rights_core::Result<Self> {
        let ledger = rights_core::connect(&config.ledger)?;
        tracing::info!("Ledger backend: {}", ledger.backend_name());

        Ok(Self::new(
            RightsEngine::new(ledger, config.linked_data.clone()),
            Duration::from_millis(config.server.request_timeout_ms),
        ))
    }

    /// Run a blocking engine call off the async runtime, bounded by the
    /// request timeout.
    ///
    /// On timeout the call keeps running in the background; the ledger
    /// guarantees it either commits fully or not at all.
    pub async fn run<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&RightsEngine) -> rights_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine.clone();
        let task = tokio::task::spawn_blocking(move || op(&engine));

        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(join_error)) => Err(ApiError::Internal(join_error.to_string())),
            Err(_) => {
                tracing::warn!(
                    "Engine call exceeded {}ms",
                    self.request_timeout.as_millis()
                );
                Err(RightsError::from(PersistenceError::Timeout(format!(
                    "no answer within {}ms",
                    self.request_timeout.as_millis()
                )))
                .into())
            }
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Rights endpoints
        .route("/rights", post(http::create_right))
        .route("/rights/transfer", post(http::transfer_right))
        .route("/rights/history/{right_id}", get(http::get_history))
        .route("/rights/{entity_id}", get(http::get_entity))
        // Copyright endpoints
        .route("/copyrights", post(http::create_copyright))
        // System endpoints
        .route("/health", get(http::health))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Rights server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
