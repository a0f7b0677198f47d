//! LabelFlow API - Label Governance & Drift Engine
//!
//! Governs the labels attached to a cloud resource inventory:
//! - Pipelines: ordered label operations, previewed then committed
//! - Policies: built-in and custom rules producing severity-ranked violations
//! - Drift: timeline snapshots compared against the live inventory
//! - Audit: an append-only label history per resource, with revert

use labelflow::config::Settings;
use labelflow::policy::default_registry;
use labelflow::routes::create_router;
use labelflow::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting LabelFlow - Label Governance & Drift Engine...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let registry = default_registry();
    info!("🧩 {} custom policies registered", registry.policy_ids().len());

    let state = Arc::new(AppState::new(&settings.engine, registry).await?);
    info!(
        "✅ Engine ready (parallel threshold {}, chunk size {}, {} policies)",
        settings.engine.parallel_threshold,
        settings.engine.chunk_size,
        state.policies.list().await.len()
    );

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Inventory ───");
    info!("   GET  /api/resources                - List resources with drift and violations");
    info!("   PUT  /api/resources                - Ingest resources");
    info!("   GET  /api/resources/{{id}}           - Get a resource");
    info!("   PUT  /api/resources/{{id}}/labels    - Commit labels (fingerprint required)");
    info!("   GET  /api/resources/{{id}}/history   - Label history, newest first");
    info!("   POST /api/resources/{{id}}/revert    - Revert to a history entry");
    info!("");
    info!("   ─── Pipelines ───");
    info!("   POST /api/pipelines                - Save a pipeline");
    info!("   GET  /api/pipelines                - List pipelines");
    info!("   POST /api/pipelines/{{id}}/preview   - Dry-run against resources");
    info!("   POST /api/pipelines/{{id}}/apply     - Apply and commit labels");
    info!("");
    info!("   ─── Policies ───");
    info!("   GET  /api/policies                 - List policies");
    info!("   POST /api/policies                 - Create or replace a policy");
    info!("   PUT  /api/policies/{{id}}/enabled    - Enable or disable a policy");
    info!("   GET  /api/violations               - Evaluate enabled policies");
    info!("");
    info!("   ─── Drift ───");
    info!("   POST /api/timeline/snapshots       - Capture a timeline snapshot");
    info!("   GET  /api/timeline                 - List timeline entries");
    info!("   GET  /api/drift                    - Drift against latest or given entry");
    info!("   GET  /api/drift/timeline           - Drift against every entry");
    info!("   POST /api/governance/cycle         - Apply, evaluate and detect drift");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,labelflow=debug,labelflow_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
