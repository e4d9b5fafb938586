//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rights_core::{
    Entity, HistoryUser, HolderCredential, LinkedDataDocument, PersistId, PublicKey,
};

use crate::error::ApiResult;
use crate::AppState;

/// Key pair supplied by the acting holder
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderKeys {
    pub public_key: String,
    pub private_key: String,
}

impl HolderKeys {
    fn credential(&self) -> ApiResult<HolderCredential> {
        Ok(HolderCredential::from_hex(&self.public_key, &self.private_key)?)
    }
}

/// Recipient of a transfer; a private key is accepted but never used
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientKeys {
    pub public_key: String,
    #[serde(default)]
    pub private_key: Option<String>,
}

/// Request to derive a right
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRightRequest {
    pub right: Map<String, Value>,
    pub source_right_id: String,
    pub current_holder: HolderKeys,
}

#[derive(Debug, Serialize)]
pub struct CreateRightResponse {
    pub right: LinkedDataDocument,
}

/// Request to register a copyright
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCopyrightRequest {
    pub copyright: Map<String, Value>,
    pub current_holder: HolderKeys,
}

#[derive(Debug, Serialize)]
pub struct CreateCopyrightResponse {
    pub copyright: LinkedDataDocument,
}

/// Request to transfer a right or copyright
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub right_id: String,
    pub current_holder: HolderKeys,
    pub to: RecipientKeys,
    #[serde(default)]
    pub rights_assignment: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub rights_assignment: LinkedDataDocument,
}

/// One history entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub user: HistoryUser,
    pub event_id: String,
}

/// Derive a new right from a source entity
pub async fn create_right(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRightRequest>, JsonRejection>,
) -> ApiResult<Json<CreateRightResponse>> {
    let Json(request) = payload?;
    let holder = request.current_holder.credential()?;
    let source = PersistId::new(request.source_right_id);

    let right = state
        .run(move |engine| {
            let right = engine.derive_right(request.right, &source, &holder)?;
            Ok(engine.serialize(&Entity::from(right)))
        })
        .await?;

    Ok(Json(CreateRightResponse { right }))
}

/// Register a root copyright
pub async fn create_copyright(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCopyrightRequest>, JsonRejection>,
) -> ApiResult<Json<CreateCopyrightResponse>> {
    let Json(request) = payload?;
    let holder = request.current_holder.credential()?;

    let copyright = state
        .run(move |engine| {
            let copyright = engine.register_copyright(request.copyright, &holder)?;
            Ok(engine.serialize(&Entity::from(copyright)))
        })
        .await?;

    Ok(Json(CreateCopyrightResponse { copyright }))
}

/// Fetch a right, falling back to a copyright
pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> ApiResult<Json<LinkedDataDocument>> {
    let persist_id = PersistId::new(entity_id);

    let document = state
        .run(move |engine| {
            let entity = engine.resolve(&persist_id)?;
            Ok(engine.serialize(&entity))
        })
        .await?;

    Ok(Json(document))
}

/// Transfer history of an entity, earliest first
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(right_id): Path<String>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let persist_id = PersistId::new(right_id);

    let events = state
        .run(move |engine| engine.history(&persist_id).events())
        .await?;

    Ok(Json(
        events
            .into_iter()
            .map(|event| HistoryEntry {
                user: event.user,
                event_id: event.event_id.to_string(),
            })
            .collect(),
    ))
}

/// Transfer an entity to a new holder
pub async fn transfer_right(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Json<TransferResponse>> {
    let Json(request) = payload?;
    let holder = request.current_holder.credential()?;
    let to = PublicKey::parse(&request.to.public_key)?;
    let persist_id = PersistId::new(request.right_id);

    let rights_assignment = state
        .run(move |engine| {
            let entity = engine.resolve(&persist_id)?;
            let assignment =
                engine.transfer_right(&entity, request.rights_assignment, &holder, &to)?;
            Ok(engine.serialize_assignment(&assignment))
        })
        .await?;

    Ok(Json(TransferResponse { rights_assignment }))
}

/// Liveness probe
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.engine.ledger().backend_name(),
        "version": rights_core::version(),
    }))
}
