//! Resource Routes
//!
//! Inventory listing, manual label edits, history and revert.

use crate::error::ApiResult;
use crate::models::{GceResource, LabelMapping, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

// ==================== Request Types ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[validate(length(min = 1, message = "At least one resource is required"))]
    pub resources: Vec<GceResource>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLabelsRequest {
    pub labels: LabelMapping,
    #[validate(length(min = 1, message = "labelFingerprint is required for label writes"))]
    pub label_fingerprint: String,
    #[validate(length(min = 1, max = 128, message = "Actor is required"))]
    pub actor: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RevertRequest {
    /// History entry whose previous labels are restored
    pub entry_id: Uuid,
    #[validate(length(min = 1, message = "labelFingerprint is required for label writes"))]
    pub label_fingerprint: String,
    #[validate(length(min = 1, max = 128, message = "Actor is required"))]
    pub actor: String,
    pub reason: Option<String>,
}

// ==================== Handlers ====================

/// List all resources
pub async fn list_resources(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let resources = state.inventory.list().await;
    Json(serde_json::json!({
        "success": true,
        "count": resources.len(),
        "resources": resources,
    }))
}

/// Ingest resources from the inventory source
pub async fn ingest_resources(
    State(state): State<SharedState>,
    Json(payload): Json<IngestRequest>,
) -> ApiResult<Json<SuccessResponse<Vec<GceResource>>>> {
    payload.validate()?;

    let stored = state.inventory.ingest(payload.resources).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Ingested {} resources", stored.len()),
        stored,
    )))
}

pub async fn get_resource(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let resource = state.inventory.get(&id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "resource": resource,
    })))
}

/// Manual label edit (UPDATE)
pub async fn update_labels(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLabelsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    payload.validate()?;

    let entry = state
        .governance
        .update_labels(
            &id,
            &payload.label_fingerprint,
            payload.labels,
            &payload.actor,
            payload.reason,
        )
        .await?;
    let resource = state.inventory.get(&id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Labels updated for {}", id),
        "entry": entry,
        "resource": resource,
    })))
}

/// History, newest first
pub async fn get_history(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.inventory.get(&id).await?;
    let history = state.history.history(&id).await;

    Ok(Json(serde_json::json!({
        "success": true,
        "resourceId": id,
        "history": history,
    })))
}

/// Restore the labels a selected history entry superseded (REVERT)
pub async fn revert_labels(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<RevertRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    payload.validate()?;

    let entry = state
        .governance
        .revert(
            &id,
            payload.entry_id,
            &payload.label_fingerprint,
            &payload.actor,
            payload.reason,
        )
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Reverted {} to the state before entry {}", id, payload.entry_id),
        "entry": entry,
    })))
}
