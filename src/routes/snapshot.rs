//! Timeline and Drift Routes
//!
//! Routes for governance timeline captures and drift detection.

use crate::error::{not_found_error, ApiResult};
use crate::models::TimelineEntry;
use crate::snapshot::{DriftDetector, TimelineEntryMetadata};
use crate::state::SharedState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==================== Request/Response Types ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub success: bool,
    pub message: String,
    pub entry: TimelineEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineListResponse {
    pub success: bool,
    pub entries: Vec<TimelineEntryMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftQuery {
    /// Entry to compare against (defaults to latest)
    pub entry_id: Option<Uuid>,
}

// ==================== Handlers ====================

/// Capture the present inventory as a timeline entry
pub async fn capture_snapshot(
    State(state): State<SharedState>,
) -> (StatusCode, Json<CaptureResponse>) {
    let resources = state.inventory.list().await;
    let entry = state.timeline.capture(&resources).await;

    (
        StatusCode::CREATED,
        Json(CaptureResponse {
            success: true,
            message: format!("Captured {} resources", entry.resources.len()),
            entry,
        }),
    )
}

/// Timeline entries, oldest first
pub async fn list_timeline(State(state): State<SharedState>) -> Json<TimelineListResponse> {
    Json(TimelineListResponse {
        success: true,
        entries: state.timeline.list().await,
    })
}

/// Present inventory vs one timeline entry
pub async fn current_drift(
    State(state): State<SharedState>,
    Query(query): Query<DriftQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let entry = match query.entry_id {
        Some(id) => state.timeline.get(id).await?,
        None => state
            .timeline
            .latest()
            .await
            .ok_or_else(|| not_found_error("No timeline entries captured yet"))?,
    };

    let present = state.inventory.list().await;
    let changes = DriftDetector::diff(&entry.resources, &present);
    let summary = DriftDetector::summarize(&changes);

    Ok(Json(serde_json::json!({
        "success": true,
        "entryId": entry.id,
        "date": entry.date,
        "summary": summary,
        "changes": changes,
    })))
}

/// Every timeline entry diffed independently against the present inventory
pub async fn drift_timeline(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let entries = state.timeline.entries().await;
    let present = state.inventory.list().await;
    let timeline = DriftDetector::diff_timeline(&entries, &present);

    Json(serde_json::json!({
        "success": true,
        "timeline": timeline,
    }))
}
