//! Policy Routes
//!
//! Policy definitions and the current violation set.

use crate::error::ApiResult;
use crate::models::{GovernancePolicy, SuccessResponse};
use crate::policy::PolicyEvaluator;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

pub async fn list_policies(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let policies = state.policies.list().await;
    Json(serde_json::json!({
        "success": true,
        "count": policies.len(),
        "policies": policies,
        "customPredicates": state.evaluator.registry().policy_ids(),
    }))
}

/// Create or replace a policy
pub async fn upsert_policy(
    State(state): State<SharedState>,
    Json(policy): Json<GovernancePolicy>,
) -> ApiResult<Json<SuccessResponse<GovernancePolicy>>> {
    let policy = state.policies.upsert(policy).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Policy {} saved", policy.id),
        policy,
    )))
}

pub async fn delete_policy(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<()>>> {
    state.policies.delete(&id).await?;
    Ok(Json(SuccessResponse::message_only(format!("Policy {} deleted", id))))
}

pub async fn set_policy_enabled(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<SetEnabledRequest>,
) -> ApiResult<Json<SuccessResponse<GovernancePolicy>>> {
    let policy = state.policies.set_enabled(&id, payload.enabled).await?;
    Ok(Json(SuccessResponse::with_data(
        format!(
            "Policy {} {}",
            id,
            if payload.enabled { "enabled" } else { "disabled" }
        ),
        policy,
    )))
}

/// Evaluate every stored policy over the inventory
pub async fn list_violations(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let policies = state.policies.list().await;
    let outcome = state.governance.evaluate_policies(policies.clone()).await;
    let summary = PolicyEvaluator::summarize(&outcome, &policies);

    Json(serde_json::json!({
        "success": true,
        "summary": summary,
        "violations": outcome,
    }))
}
