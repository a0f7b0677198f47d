//! Governance coordinator
//!
//! Drives the engine in an explicit order chosen by the caller: propose,
//! commit, evaluate policies, detect drift. Nothing is recomputed implicitly.

use crate::audit::HistoryArena;
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::governance::batch::evaluate_chunked;
use crate::governance::retry::with_backoff;
use crate::inventory::InventoryStore;
use crate::models::{
    BatchOutcome, DriftStatus, GceResource, GovernancePolicy, HistoryChangeType, LabelDelta,
    LabelHistoryEntry, LabelMapping, PolicyViolation, SavedPipeline, TimelineEntry,
};
use crate::pipeline::PipelineEvaluator;
use crate::policy::{PolicyEvaluator, ViolationSummary};
use crate::snapshot::{DriftDetector, DriftSummary, TimelineStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Proposed labels for one resource. Nothing is committed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelProposal {
    pub resource_id: String,
    pub name: String,
    pub label_fingerprint: String,
    pub current_labels: LabelMapping,
    pub proposed_labels: LabelMapping,
    pub delta: LabelDelta,
}

impl LabelProposal {
    fn new(resource: &GceResource, proposed_labels: LabelMapping) -> Self {
        Self {
            resource_id: resource.id.clone(),
            name: resource.name.clone(),
            label_fingerprint: resource.label_fingerprint.clone(),
            delta: LabelDelta::between(&resource.labels, &proposed_labels),
            current_labels: resource.labels.clone(),
            proposed_labels,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.delta.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The pipeline could not be evaluated for this resource
    Configuration,
    /// The resource changed since it was read
    Conflict,
    /// The inventory refused or could not take the write
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFailure {
    pub id: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl CommitFailure {
    fn from_error(id: impl Into<String>, err: &AppError) -> Self {
        let kind = match err {
            AppError::Conflict(_) => FailureKind::Conflict,
            _ => FailureKind::Rejected,
        };
        Self {
            id: id.into(),
            kind,
            reason: err.to_string(),
        }
    }
}

/// Outcome of committing pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub pipeline_id: String,
    pub change_type: HistoryChangeType,
    /// History entries appended, sorted by resource id
    pub succeeded: Vec<LabelHistoryEntry>,
    /// Resources whose labels already matched the proposal
    pub unchanged: Vec<String>,
    pub failed: Vec<CommitFailure>,
}

/// Drift of the present inventory against one timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftOverview {
    pub entry_id: Uuid,
    pub date: String,
    pub summary: DriftSummary,
    pub drift_status: BTreeMap<String, DriftStatus>,
}

/// Inputs for one governance cycle
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub pipeline: Option<SavedPipeline>,
    pub target_ids: Option<Vec<String>>,
    pub policies: Vec<GovernancePolicy>,
    /// Timeline entry to diff against; the latest entry when `None`
    pub baseline_entry: Option<Uuid>,
    pub actor: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitReport>,
    pub violations: BatchOutcome<Vec<PolicyViolation>>,
    pub violation_summary: ViolationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftOverview>,
}

/// Explicit coordinator over the inventory, history and engine
pub struct GovernanceService {
    inventory: Arc<InventoryStore>,
    history: Arc<HistoryArena>,
    timeline: Arc<TimelineStore>,
    evaluator: Arc<PolicyEvaluator>,
    engine: EngineConfig,
}

impl GovernanceService {
    pub fn new(
        inventory: Arc<InventoryStore>,
        history: Arc<HistoryArena>,
        timeline: Arc<TimelineStore>,
        evaluator: Arc<PolicyEvaluator>,
        engine: EngineConfig,
    ) -> Self {
        Self {
            inventory,
            history,
            timeline,
            evaluator,
            engine,
        }
    }

    /// Target resources; all of them when `ids` is `None`
    async fn targets(&self, ids: Option<&[String]>) -> (Vec<GceResource>, Vec<String>) {
        match ids {
            Some(ids) => self.inventory.select(ids).await,
            None => (self.inventory.list().await, Vec::new()),
        }
    }

    /// Evaluate a pipeline without committing anything
    pub async fn preview(
        &self,
        pipeline: &SavedPipeline,
        ids: Option<&[String]>,
    ) -> BatchOutcome<LabelProposal> {
        let (resources, missing) = self.targets(ids).await;
        self.propose(pipeline, resources, missing).await
    }

    async fn propose(
        &self,
        pipeline: &SavedPipeline,
        resources: Vec<GceResource>,
        missing: Vec<String>,
    ) -> BatchOutcome<LabelProposal> {
        let owned = pipeline.clone();
        let mut outcome = evaluate_chunked(resources, &self.engine, move |chunk: &[GceResource]| {
            let mut outcome = BatchOutcome::default();
            for resource in chunk {
                let proposal = PipelineEvaluator::apply(resource, &owned)
                    .map(|labels| LabelProposal::new(resource, labels));
                if let Err(e) = &proposal {
                    warn!("Pipeline {} failed for resource {}: {}", owned.id, resource.id, e);
                }
                outcome.record(resource.id.clone(), proposal);
            }
            outcome
        })
        .await;

        for id in missing {
            outcome.fail(id.clone(), format!("Resource {} not found", id));
        }
        outcome.finish()
    }

    /// Evaluate and commit a pipeline. History is only appended after a
    /// successful commit; no-op proposals are skipped.
    pub async fn apply_pipeline(
        &self,
        pipeline: &SavedPipeline,
        ids: Option<&[String]>,
        actor: &str,
        reason: Option<String>,
    ) -> CommitReport {
        let (resources, missing) = self.targets(ids).await;
        let change_type = if resources.len() + missing.len() == 1 {
            HistoryChangeType::ApplyProposal
        } else {
            HistoryChangeType::BatchUpdate
        };

        let missing_ids = missing.clone();
        let outcome = self.propose(pipeline, resources, missing).await;

        let mut report = CommitReport {
            pipeline_id: pipeline.id.clone(),
            change_type,
            succeeded: Vec::new(),
            unchanged: Vec::new(),
            failed: outcome
                .failed
                .into_iter()
                .map(|f| CommitFailure {
                    kind: if missing_ids.contains(&f.id) {
                        FailureKind::Rejected
                    } else {
                        FailureKind::Configuration
                    },
                    id: f.id,
                    reason: f.reason,
                })
                .collect(),
        };

        for (id, proposal) in outcome.results {
            if proposal.is_noop() {
                report.unchanged.push(id);
                continue;
            }

            let committed = self
                .commit(
                    &id,
                    &proposal.label_fingerprint,
                    proposal.proposed_labels,
                    actor,
                    change_type,
                    reason.clone(),
                )
                .await;

            match committed {
                Ok(entry) => report.succeeded.push(entry),
                Err(e) => {
                    warn!("Commit of pipeline {} to {} failed: {}", pipeline.id, id, e);
                    report.failed.push(CommitFailure::from_error(id, &e));
                }
            }
        }

        report.failed.sort_by(|a, b| a.id.cmp(&b.id));
        info!(
            "Applied pipeline {} as {:?}: {} committed, {} unchanged, {} failed",
            pipeline.id,
            change_type,
            report.succeeded.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        report
    }

    /// Fingerprint-checked write and its history append, made while holding
    /// the resource's history writer so entries chain in commit order
    async fn commit(
        &self,
        id: &str,
        fingerprint: &str,
        new_labels: LabelMapping,
        actor: &str,
        change_type: HistoryChangeType,
        reason: Option<String>,
    ) -> Result<LabelHistoryEntry, AppError> {
        let mut writer = self.history.writer(id).await;
        let commit = with_backoff(&self.engine.commit_retry, "label commit", || {
            self.inventory
                .commit_labels(id, fingerprint, new_labels.clone())
        })
        .await?;

        Ok(writer.append(
            commit.previous_labels,
            commit.resource.labels,
            actor,
            change_type,
            reason,
        ))
    }

    /// Direct manual edit
    pub async fn update_labels(
        &self,
        id: &str,
        fingerprint: &str,
        labels: LabelMapping,
        actor: &str,
        reason: Option<String>,
    ) -> Result<LabelHistoryEntry, AppError> {
        self.commit(id, fingerprint, labels, actor, HistoryChangeType::Update, reason)
            .await
    }

    /// Restore the labels a caller-selected entry superseded
    pub async fn revert(
        &self,
        id: &str,
        entry_id: Uuid,
        fingerprint: &str,
        actor: &str,
        reason: Option<String>,
    ) -> Result<LabelHistoryEntry, AppError> {
        let entry = self.history.entry(id, entry_id).await?;

        self.commit(
            id,
            fingerprint,
            entry.previous_labels,
            actor,
            HistoryChangeType::Revert,
            reason.or_else(|| Some(format!("Revert of entry {}", entry_id))),
        )
        .await
    }

    /// Evaluate policies over the whole inventory and cache the results for display
    pub async fn evaluate_policies(
        &self,
        policies: Vec<GovernancePolicy>,
    ) -> BatchOutcome<Vec<PolicyViolation>> {
        let resources = self.inventory.list().await;
        let evaluator = self.evaluator.clone();
        let outcome = evaluate_chunked(resources, &self.engine, move |chunk: &[GceResource]| {
            evaluator.evaluate_batch(chunk, &policies)
        })
        .await;

        self.inventory
            .annotate(&outcome.results, &BTreeMap::new())
            .await;
        outcome
    }

    /// Diff the present inventory against a timeline entry and cache drift status
    pub async fn drift_against(&self, entry: &TimelineEntry) -> DriftOverview {
        let present = self.inventory.list().await;
        let changes = DriftDetector::diff(&entry.resources, &present);
        let summary = DriftDetector::summarize(&changes);
        let drift_status = DriftDetector::drift_statuses(&changes);

        self.inventory.annotate(&BTreeMap::new(), &drift_status).await;
        DriftOverview {
            entry_id: entry.id,
            date: entry.date.clone(),
            summary,
            drift_status,
        }
    }

    /// Apply, then evaluate violations, then detect drift
    pub async fn run_cycle(&self, request: CycleRequest) -> Result<CycleReport, AppError> {
        let commit = match &request.pipeline {
            Some(pipeline) => Some(
                self.apply_pipeline(
                    pipeline,
                    request.target_ids.as_deref(),
                    &request.actor,
                    request.reason.clone(),
                )
                .await,
            ),
            None => None,
        };

        let violations = self.evaluate_policies(request.policies.clone()).await;
        let violation_summary = PolicyEvaluator::summarize(&violations, &request.policies);

        let baseline = match request.baseline_entry {
            Some(id) => Some(self.timeline.get(id).await?),
            None => self.timeline.latest().await,
        };
        let drift = match &baseline {
            Some(entry) => Some(self.drift_against(entry).await),
            None => None,
        };

        info!(
            "Governance cycle complete: {} violations, drift {}",
            violation_summary.total_violations,
            drift
                .as_ref()
                .map(|d| format!("{} modified", d.summary.modified))
                .unwrap_or_else(|| "not checked (no timeline)".to_string())
        );

        Ok(CycleReport {
            commit,
            violations,
            violation_summary,
            drift,
        })
    }
}
