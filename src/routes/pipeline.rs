//! Pipeline Routes
//!
//! Saved pipelines, previews and commits.

use crate::error::ApiResult;
use crate::models::{LabelOperation, SavedPipeline, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// REQUEST TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipelineRequest {
    /// Generated when omitted
    pub id: Option<String>,
    #[validate(length(min = 1, max = 128, message = "Pipeline name must be between 1 and 128 characters"))]
    pub name: String,
    pub operations: Vec<LabelOperation>,
    pub created_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// All resources when omitted
    #[serde(default)]
    pub resource_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    #[serde(default)]
    pub resource_ids: Option<Vec<String>>,
    #[validate(length(min = 1, max = 128, message = "Actor is required"))]
    pub actor: String,
    pub reason: Option<String>,
}

// =============================================================================
// HANDLERS
// =============================================================================

pub async fn create_pipeline(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePipelineRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<SavedPipeline>>)> {
    payload.validate()?;

    let pipeline = SavedPipeline {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name,
        operations: payload.operations,
        created_at: Utc::now(),
        created_by: payload.created_by,
    };
    let pipeline = state.pipelines.create(pipeline).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Pipeline '{}' saved", pipeline.name),
            pipeline,
        )),
    ))
}

pub async fn list_pipelines(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let pipelines = state.pipelines.list().await;
    Json(serde_json::json!({
        "success": true,
        "count": pipelines.len(),
        "pipelines": pipelines,
    }))
}

pub async fn get_pipeline(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<SavedPipeline>>> {
    let pipeline = state.pipelines.get(&id).await?;
    Ok(Json(SuccessResponse::with_data("Pipeline found", pipeline)))
}

pub async fn delete_pipeline(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<()>>> {
    state.pipelines.delete(&id).await?;
    Ok(Json(SuccessResponse::message_only(format!("Pipeline {} deleted", id))))
}

/// Proposed labels per resource; nothing is committed
pub async fn preview_pipeline(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<PreviewRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let pipeline = state.pipelines.get(&id).await?;
    let outcome = state
        .governance
        .preview(&pipeline, payload.resource_ids.as_deref())
        .await;

    let changed = outcome.results.values().filter(|p| !p.is_noop()).count();
    Ok(Json(serde_json::json!({
        "success": true,
        "pipelineId": pipeline.id,
        "changed": changed,
        "preview": outcome,
    })))
}

/// Commit pipeline output with fingerprint checks
pub async fn apply_pipeline(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ApplyRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    payload.validate()?;

    let pipeline = state.pipelines.get(&id).await?;
    let report = state
        .governance
        .apply_pipeline(
            &pipeline,
            payload.resource_ids.as_deref(),
            &payload.actor,
            payload.reason,
        )
        .await;

    Ok(Json(serde_json::json!({
        "success": report.failed.is_empty(),
        "message": format!(
            "{} committed, {} unchanged, {} failed",
            report.succeeded.len(),
            report.unchanged.len(),
            report.failed.len()
        ),
        "report": report,
    })))
}
