//! Application state management
//!
//! Contains shared state accessible across all handlers.
//! Everything is in memory; the inventory store stands in for the cloud source.

use crate::audit::HistoryArena;
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::governance::GovernanceService;
use crate::inventory::InventoryStore;
use crate::pipeline::PipelineStore;
use crate::policy::{CustomPolicyRegistry, PolicyEvaluator, PolicyStore};
use crate::snapshot::TimelineStore;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Resource inventory (fingerprint-checked label writes)
    pub inventory: Arc<InventoryStore>,

    /// Per-resource label history
    pub history: Arc<HistoryArena>,

    /// Governance timeline snapshots
    pub timeline: Arc<TimelineStore>,

    /// Saved operation pipelines
    pub pipelines: PipelineStore,

    /// Governance policies
    pub policies: PolicyStore,

    /// Policy evaluator bound to the custom predicate registry
    pub evaluator: Arc<PolicyEvaluator>,

    /// Coordinator for preview/commit/evaluate/drift
    pub governance: GovernanceService,
}

impl AppState {
    pub async fn new(engine: &EngineConfig, registry: CustomPolicyRegistry) -> Result<Self, AppError> {
        let inventory = Arc::new(InventoryStore::new());
        let history = Arc::new(HistoryArena::new());
        let timeline = Arc::new(TimelineStore::new(engine.timeline_max_entries));
        let evaluator = Arc::new(PolicyEvaluator::new(Arc::new(registry)));

        let policies = if engine.seed_default_policies {
            PolicyStore::with_defaults(evaluator.clone()).await?
        } else {
            PolicyStore::new(evaluator.clone())
        };

        let governance = GovernanceService::new(
            inventory.clone(),
            history.clone(),
            timeline.clone(),
            evaluator.clone(),
            engine.clone(),
        );

        Ok(Self {
            inventory,
            history,
            timeline,
            pipelines: PipelineStore::new(),
            policies,
            evaluator,
            governance,
        })
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
