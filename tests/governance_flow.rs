//! End-to-end flows through the public engine API

use chrono::Utc;
use labelflow::config::EngineConfig;
use labelflow::error::AppError;
use labelflow::models::{
    Casing, ChangeType, DriftStatus, GceResource, GovernancePolicy, HistoryChangeType,
    LabelMapping, LabelOperation, OperationConfig, OperationType, PolicyCategory, RegexGroup,
    ResourceSnapshot, ResourceType, RuleConfig, SavedPipeline, Severity,
};
use labelflow::pipeline::PipelineEvaluator;
use labelflow::policy::{default_policies, default_registry, PolicyEvaluator};
use labelflow::snapshot::DriftDetector;
use labelflow::state::AppState;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn labels(pairs: &[(&str, &str)]) -> LabelMapping {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pipeline(id: &str, operations: Vec<LabelOperation>) -> SavedPipeline {
    SavedPipeline {
        id: id.to_string(),
        name: id.to_string(),
        operations,
        created_at: Utc::now(),
        created_by: Some("tests".to_string()),
    }
}

fn replace(id: &str, key: &str, value: &str) -> LabelOperation {
    LabelOperation::new(
        id,
        OperationType::Replace,
        OperationConfig {
            key: Some(key.into()),
            value: Some(value.into()),
            ..Default::default()
        },
    )
}

fn lowercase(id: &str, key: &str) -> LabelOperation {
    LabelOperation::new(
        id,
        OperationType::CaseTransform,
        OperationConfig {
            target_key: Some(key.into()),
            casing: Some(Casing::Lowercase),
            ..Default::default()
        },
    )
}

#[test]
fn extract_regex_splits_name_into_labels() {
    let resource = GceResource::new(
        "1",
        "prod-payment-service-01",
        ResourceType::Instance,
        "us-central1-a",
        "RUNNING",
    );
    let extract = LabelOperation::new(
        "op-1",
        OperationType::ExtractRegex,
        OperationConfig {
            regex: Some(r"^(\w+)-(\w+)-service".into()),
            source_field: Some("name".into()),
            groups: vec![
                RegexGroup {
                    index: 1,
                    target_key: "environment".into(),
                },
                RegexGroup {
                    index: 2,
                    target_key: "app".into(),
                },
            ],
            ..Default::default()
        },
    );

    let proposed = PipelineEvaluator::apply(&resource, &pipeline("extract", vec![extract])).unwrap();
    assert_eq!(proposed, labels(&[("environment", "prod"), ("app", "payment")]));
    assert!(resource.labels.is_empty());
}

#[test]
fn operations_apply_in_declared_order() {
    let resource = GceResource::new("1", "api", ResourceType::Instance, "us-east1-b", "RUNNING");

    let forward = pipeline("fwd", vec![replace("r", "env", "Prod"), lowercase("c", "env")]);
    let reverse = pipeline("rev", vec![lowercase("c", "env"), replace("r", "env", "Prod")]);

    let forward = PipelineEvaluator::apply(&resource, &forward).unwrap();
    let reverse = PipelineEvaluator::apply(&resource, &reverse).unwrap();

    assert_eq!(forward["env"], "prod");
    assert_eq!(reverse["env"], "Prod");
}

#[test]
fn normalize_values_leaves_key_case_alone() {
    let resource = GceResource::new("1", "api", ResourceType::Instance, "us-east1-b", "RUNNING")
        .with_labels(labels(&[("Env", "dev")]));

    let normalize = LabelOperation::new(
        "n",
        OperationType::NormalizeValues,
        OperationConfig {
            key: Some("Env".into()),
            value_map: [("dev".to_string(), "development".to_string())].into_iter().collect(),
            ..Default::default()
        },
    );
    let proposed = PipelineEvaluator::apply(&resource, &pipeline("norm", vec![normalize])).unwrap();
    assert_eq!(proposed, labels(&[("Env", "development")]));

    // Label keys are case-sensitive, so "env" is still missing
    let evaluator = PolicyEvaluator::new(Arc::new(default_registry()));
    let required = GovernancePolicy {
        id: "P100".into(),
        name: "env required".into(),
        description: None,
        category: PolicyCategory::Labeling,
        severity: Severity::Critical,
        is_enabled: true,
        rule_config: RuleConfig::required_label("env"),
    };
    let violations = evaluator.evaluate(&resource, &[required]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy_id, "P100");
}

#[test]
fn violations_come_back_most_severe_first() {
    let resource = GceResource::new(
        "1",
        "Bad_Name",
        ResourceType::Instance,
        "asia-east2-a",
        "RUNNING",
    );
    let evaluator = PolicyEvaluator::new(Arc::new(default_registry()));
    let violations = evaluator.evaluate(&resource, &default_policies());

    let ids: Vec<&str> = violations.iter().map(|v| v.policy_id.as_str()).collect();
    assert_eq!(ids, vec!["P001", "P002", "P005", "P004"]);
    assert_eq!(violations[0].severity, Severity::Critical);
    assert!(violations
        .windows(2)
        .all(|pair| pair[0].severity >= pair[1].severity));
}

#[test]
fn drift_names_the_added_label() {
    let mut snapshot = ResourceSnapshot::capture(&GceResource::new(
        "1",
        "api",
        ResourceType::Instance,
        "us-east1-b",
        "RUNNING",
    ));
    snapshot.label_hash = r#"{"env":"dev"}"#.to_string();

    let present = vec![
        GceResource::new("1", "api", ResourceType::Instance, "us-east1-b", "RUNNING")
            .with_labels(labels(&[("env", "dev"), ("legacy-tag", "true")])),
    ];
    let past = vec![snapshot];

    let changes = DriftDetector::diff(&past, &present);
    assert_eq!(changes[0].change_type, ChangeType::Modified);
    assert!(changes[0].details.contains("legacy-tag"));
}

#[tokio::test]
async fn apply_is_idempotent_and_audited() {
    let state = AppState::new(&EngineConfig::default(), default_registry())
        .await
        .unwrap();
    let ingested = state
        .inventory
        .ingest(vec![
            GceResource::new("1", "api-1", ResourceType::Instance, "us-east1-b", "RUNNING"),
            GceResource::new("2", "api-2", ResourceType::Instance, "us-east1-c", "RUNNING")
                .with_labels(labels(&[("env", "prod")])),
        ])
        .await
        .unwrap();
    assert!(ingested.iter().all(|r| !r.label_fingerprint.is_empty()));

    let pipeline = state
        .pipelines
        .create(pipeline("tag-env", vec![replace("r", "env", "prod")]))
        .await
        .unwrap();

    let first = state
        .governance
        .apply_pipeline(&pipeline, None, "alice", Some("tagging".into()))
        .await;
    assert_eq!(first.change_type, HistoryChangeType::BatchUpdate);
    assert_eq!(first.succeeded.len(), 1);
    assert_eq!(first.unchanged, vec!["2"]);

    let second = state.governance.apply_pipeline(&pipeline, None, "alice", None).await;
    assert!(second.succeeded.is_empty());
    assert_eq!(second.unchanged, vec!["1", "2"]);

    let history = state.history.history("1").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].actor, "alice");
    assert_eq!(history[0].reason.as_deref(), Some("tagging"));
}

#[tokio::test]
async fn stale_fingerprint_is_a_conflict() {
    let state = AppState::new(&EngineConfig::default(), default_registry())
        .await
        .unwrap();
    let stored = state
        .inventory
        .ingest(vec![GceResource::new(
            "1",
            "api-1",
            ResourceType::Instance,
            "us-east1-b",
            "RUNNING",
        )])
        .await
        .unwrap();
    let fingerprint = stored[0].label_fingerprint.clone();

    state
        .governance
        .update_labels("1", &fingerprint, labels(&[("env", "dev")]), "bob", None)
        .await
        .unwrap();

    // The first write rotated the fingerprint
    let err = state
        .governance
        .update_labels("1", &fingerprint, labels(&[("env", "prod")]), "carol", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(state.inventory.get("1").await.unwrap().labels, labels(&[("env", "dev")]));
    assert_eq!(state.history.len("1").await, 1);
}

#[tokio::test]
async fn drift_after_snapshot_marks_resources() {
    let state = AppState::new(&EngineConfig::default(), default_registry())
        .await
        .unwrap();
    let stored = state
        .inventory
        .ingest(vec![
            GceResource::new("1", "api-1", ResourceType::Instance, "us-east1-b", "RUNNING"),
            GceResource::new("2", "api-2", ResourceType::Instance, "us-east1-c", "RUNNING"),
        ])
        .await
        .unwrap();
    let entry = state.timeline.capture(&stored).await;

    state
        .governance
        .update_labels("1", &stored[0].label_fingerprint, labels(&[("team", "core")]), "dana", None)
        .await
        .unwrap();

    let overview = state.governance.drift_against(&entry).await;
    assert_eq!(overview.summary.modified, 1);
    assert_eq!(overview.summary.unchanged, 1);
    assert_eq!(overview.drift_status["1"], DriftStatus::Drifted);
    assert_eq!(
        state.inventory.get("2").await.unwrap().drift_status,
        DriftStatus::Synced
    );
}

#[tokio::test]
async fn revert_restores_ingested_labels() {
    let state = AppState::new(&EngineConfig::default(), default_registry())
        .await
        .unwrap();
    let stored = state
        .inventory
        .ingest(vec![GceResource::new("1", "api-1", ResourceType::Instance, "us-east1-b", "RUNNING")
            .with_labels(labels(&[("Env", "dev")]))])
        .await
        .unwrap();

    let update = state
        .governance
        .update_labels("1", &stored[0].label_fingerprint, labels(&[("env", "dev")]), "erin", None)
        .await
        .unwrap();
    assert_eq!(update.previous_labels, labels(&[("Env", "dev")]));

    let current = state.inventory.get("1").await.unwrap();
    let revert = state
        .governance
        .revert("1", update.id, &current.label_fingerprint, "erin", Some("undo".into()))
        .await
        .unwrap();

    assert_eq!(revert.change_type, HistoryChangeType::Revert);
    assert_eq!(revert.previous_labels, labels(&[("env", "dev")]));
    assert_eq!(revert.new_labels, labels(&[("Env", "dev")]));
    assert_eq!(state.inventory.get("1").await.unwrap().labels, labels(&[("Env", "dev")]));
    assert_eq!(state.history.len("1").await, 2);
}

#[test]
fn broken_custom_policy_does_not_hide_other_violations() {
    let resource = GceResource::new("1", "api", ResourceType::Instance, "us-east1-b", "RUNNING");
    let evaluator = PolicyEvaluator::new(Arc::new(default_registry()));
    let policy = |id: &str, rule_config: RuleConfig| GovernancePolicy {
        id: id.into(),
        name: id.into(),
        description: None,
        category: PolicyCategory::Labeling,
        severity: Severity::Critical,
        is_enabled: true,
        rule_config,
    };
    let policies = vec![
        policy("P200", RuleConfig::required_label("owner")),
        policy("P201", RuleConfig::custom()),
    ];

    let violations = evaluator.evaluate(&resource, &policies);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy_id, "P200");
}
