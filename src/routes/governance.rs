//! Governance Cycle Route

use crate::error::ApiResult;
use crate::governance::{CycleReport, CycleRequest};
use crate::state::SharedState;
use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RunCycleRequest {
    /// Saved pipeline to apply first; the cycle only evaluates when omitted
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub resource_ids: Option<Vec<String>>,
    pub baseline_entry_id: Option<Uuid>,
    #[validate(length(min = 1, max = 128, message = "Actor is required"))]
    pub actor: String,
    pub reason: Option<String>,
}

/// Apply, then evaluate violations, then detect drift
pub async fn run_cycle(
    State(state): State<SharedState>,
    Json(payload): Json<RunCycleRequest>,
) -> ApiResult<Json<CycleReport>> {
    payload.validate()?;

    let pipeline = match &payload.pipeline_id {
        Some(id) => Some(state.pipelines.get(id).await?),
        None => None,
    };

    let report = state
        .governance
        .run_cycle(CycleRequest {
            pipeline,
            target_ids: payload.resource_ids,
            policies: state.policies.list().await,
            baseline_entry: payload.baseline_entry_id,
            actor: payload.actor,
            reason: payload.reason,
        })
        .await?;

    Ok(Json(report))
}
