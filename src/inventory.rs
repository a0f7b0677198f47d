//! Resource inventory
//!
//! In-memory stand-in for the cloud inventory source. It owns the resource
//! set and serializes label writes behind an optimistic fingerprint check.

use crate::error::AppError;
use crate::models::{DriftStatus, GceResource, LabelMapping, PolicyViolation};
use crate::snapshot::canonical_label_hash;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub const MAX_LABELS: usize = 64;
pub const MAX_LABEL_LENGTH: usize = 63;

/// Structural limits shared by ingest and commit, so anything the inventory
/// hands out can be written back unchanged
pub fn validate_labels(labels: &LabelMapping) -> Result<(), AppError> {
    if labels.len() > MAX_LABELS {
        return Err(AppError::Validation(format!(
            "At most {} labels are allowed, got {}",
            MAX_LABELS,
            labels.len()
        )));
    }

    for (key, value) in labels {
        if key.is_empty() {
            return Err(AppError::Validation("Label keys must not be empty".to_string()));
        }
        if key.chars().count() > MAX_LABEL_LENGTH {
            return Err(AppError::Validation(format!(
                "Label key '{}' is longer than {} characters",
                key, MAX_LABEL_LENGTH
            )));
        }
        if value.chars().count() > MAX_LABEL_LENGTH {
            return Err(AppError::Validation(format!(
                "Value for label '{}' is longer than {} characters",
                key, MAX_LABEL_LENGTH
            )));
        }
    }

    Ok(())
}

/// A fresh opaque fingerprint for a resource's labels
fn next_fingerprint(resource_id: &str, labels: &LabelMapping) -> String {
    let mut hasher = Sha256::new();
    hasher.update(resource_id.as_bytes());
    hasher.update(canonical_label_hash(labels).as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Result of a fingerprint-checked write
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCommit {
    /// Labels the write replaced, read under the same lock as the write
    pub previous_labels: LabelMapping,
    pub resource: GceResource,
}

/// Thread-safe inventory.
///
/// Commits here never fail transiently. A transport-backed inventory is what
/// produces `AppError::Unavailable`, which the commit path retries.
pub struct InventoryStore {
    resources: Arc<RwLock<HashMap<String, GceResource>>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace resources. Missing fingerprints are assigned.
    /// The batch is rejected as a whole if any resource carries invalid labels.
    pub async fn ingest(&self, incoming: Vec<GceResource>) -> Result<Vec<GceResource>, AppError> {
        for resource in &incoming {
            validate_labels(&resource.labels).map_err(|e| match e {
                AppError::Validation(msg) => {
                    AppError::Validation(format!("Resource {}: {}", resource.id, msg))
                }
                other => other,
            })?;
        }

        let mut resources = self.resources.write().await;
        let mut stored = Vec::with_capacity(incoming.len());

        for mut resource in incoming {
            if resource.label_fingerprint.is_empty() {
                resource.label_fingerprint = next_fingerprint(&resource.id, &resource.labels);
            }
            resource.violations.clear();
            resource.drift_status = DriftStatus::Unknown;
            resources.insert(resource.id.clone(), resource.clone());
            stored.push(resource);
        }

        info!("Ingested {} resources ({} total)", stored.len(), resources.len());
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> Result<GceResource, AppError> {
        let resources = self.resources.read().await;
        resources
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))
    }

    /// All resources, sorted by id
    pub async fn list(&self) -> Vec<GceResource> {
        let resources = self.resources.read().await;
        let mut list: Vec<GceResource> = resources.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Resources for the given ids, sorted by id. Unknown ids are returned separately.
    pub async fn select(&self, ids: &[String]) -> (Vec<GceResource>, Vec<String>) {
        let resources = self.resources.read().await;
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            match resources.get(id) {
                Some(resource) => found.push(resource.clone()),
                None => missing.push(id.clone()),
            }
        }
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.dedup_by(|a, b| a.id == b.id);
        (found, missing)
    }

    /// Write labels if `fingerprint` is still current. Rotates the fingerprint.
    pub async fn commit_labels(
        &self,
        id: &str,
        fingerprint: &str,
        labels: LabelMapping,
    ) -> Result<LabelCommit, AppError> {
        if fingerprint.is_empty() {
            return Err(AppError::Validation(
                "labelFingerprint is required for label writes".to_string(),
            ));
        }

        let mut resources = self.resources.write().await;
        let resource = resources
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))?;

        if resource.label_fingerprint != fingerprint {
            return Err(AppError::Conflict(format!(
                "Resource {} changed since it was read (fingerprint {} is stale)",
                id, fingerprint
            )));
        }

        validate_labels(&labels)?;

        resource.label_fingerprint = next_fingerprint(id, &labels);
        let previous_labels = std::mem::replace(&mut resource.labels, labels);
        debug!("Committed labels for {} (fingerprint {})", id, resource.label_fingerprint);
        Ok(LabelCommit {
            previous_labels,
            resource: resource.clone(),
        })
    }

    /// Store freshly computed violations and drift status for display
    pub async fn annotate(
        &self,
        violations: &BTreeMap<String, Vec<PolicyViolation>>,
        drift: &BTreeMap<String, DriftStatus>,
    ) {
        let mut resources = self.resources.write().await;
        for (id, resource) in resources.iter_mut() {
            if let Some(v) = violations.get(id) {
                resource.violations = v.clone();
            }
            if let Some(status) = drift.get(id) {
                resource.drift_status = *status;
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.resources.read().await.len()
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;

    fn labels(pairs: &[(&str, &str)]) -> LabelMapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resource(id: &str) -> GceResource {
        GceResource::new(id, format!("vm-{}", id), ResourceType::Instance, "us-east1-b", "RUNNING")
    }

    #[test]
    fn test_label_limits() {
        assert!(validate_labels(&labels(&[("env", "prod"), ("cost-center", "cc_42")])).is_ok());
        assert!(validate_labels(&labels(&[("Env", "Development")])).is_ok());
        assert!(validate_labels(&labels(&[("env", "")])).is_ok());
        assert!(validate_labels(&labels(&[("", "prod")])).is_err());
        assert!(validate_labels(&labels(&[("env", "x".repeat(64).as_str())])).is_err());

        let too_many: LabelMapping = (0..65).map(|i| (format!("k{}", i), "v".to_string())).collect();
        assert!(validate_labels(&too_many).is_err());
    }

    #[tokio::test]
    async fn test_ingest_rejects_whole_batch_on_bad_labels() {
        let store = InventoryStore::new();
        let err = store
            .ingest(vec![
                resource("a"),
                resource("b").with_labels(labels(&[("", "orphan")])),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("Resource b")));
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_ingest_assigns_fingerprints() {
        let store = InventoryStore::new();
        let stored = store
            .ingest(vec![resource("b"), resource("a").with_fingerprint("fp-a")])
            .await
            .unwrap();

        assert_eq!(stored[1].label_fingerprint, "fp-a");
        assert_eq!(stored[0].label_fingerprint.len(), 16);

        let ids: Vec<String> = store.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_commit_checks_and_rotates_fingerprint() {
        let store = InventoryStore::new();
        store
            .ingest(vec![resource("a")
                .with_labels(labels(&[("Env", "dev")]))
                .with_fingerprint("fp-1")])
            .await
            .unwrap();

        assert!(matches!(
            store.commit_labels("a", "", LabelMapping::new()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.commit_labels("a", "stale", LabelMapping::new()).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            store.commit_labels("a", "fp-1", labels(&[("", "x")])).await,
            Err(AppError::Validation(_))
        ));

        let commit = store
            .commit_labels("a", "fp-1", labels(&[("env", "prod")]))
            .await
            .unwrap();
        assert_eq!(commit.previous_labels, labels(&[("Env", "dev")]));
        assert_ne!(commit.resource.label_fingerprint, "fp-1");
        assert_eq!(store.get("a").await.unwrap().labels, labels(&[("env", "prod")]));

        // The old token is now stale
        assert!(matches!(
            store.commit_labels("a", "fp-1", LabelMapping::new()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_select_reports_missing() {
        let store = InventoryStore::new();
        store.ingest(vec![resource("a"), resource("b")]).await.unwrap();
        let (found, missing) = store
            .select(&["b".to_string(), "zz".to_string(), "a".to_string()])
            .await;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "a");
        assert_eq!(missing, vec!["zz"]);
    }
}
