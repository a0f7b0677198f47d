//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod governance;
mod pipeline;
mod policy;
mod resource;
mod snapshot;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Build the router
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Resource routes
        .route(
            "/api/resources",
            get(resource::list_resources).put(resource::ingest_resources),
        )
        .route("/api/resources/{id}", get(resource::get_resource))
        .route("/api/resources/{id}/labels", put(resource::update_labels))
        .route("/api/resources/{id}/history", get(resource::get_history))
        .route("/api/resources/{id}/revert", post(resource::revert_labels))

        // Pipeline routes
        .route(
            "/api/pipelines",
            get(pipeline::list_pipelines).post(pipeline::create_pipeline),
        )
        .route(
            "/api/pipelines/{id}",
            get(pipeline::get_pipeline).delete(pipeline::delete_pipeline),
        )
        .route("/api/pipelines/{id}/preview", post(pipeline::preview_pipeline))
        .route("/api/pipelines/{id}/apply", post(pipeline::apply_pipeline))

        // Policy routes
        .route(
            "/api/policies",
            get(policy::list_policies).post(policy::upsert_policy),
        )
        .route("/api/policies/{id}", delete(policy::delete_policy))
        .route("/api/policies/{id}/enabled", put(policy::set_policy_enabled))
        .route("/api/violations", get(policy::list_violations))

        // Timeline and drift routes
        .route("/api/timeline", get(snapshot::list_timeline))
        .route("/api/timeline/snapshots", post(snapshot::capture_snapshot))
        .route("/api/drift", get(snapshot::current_drift))
        .route("/api/drift/timeline", get(snapshot::drift_timeline))

        // Governance cycle
        .route("/api/governance/cycle", post(governance::run_cycle))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
