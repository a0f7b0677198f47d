//! Policy storage
//!
//! Policies are validated against the evaluator (and its custom registry)
//! before they are accepted.

use crate::error::AppError;
use crate::models::GovernancePolicy;
use crate::policy::defaults::default_policies;
use crate::policy::evaluator::PolicyEvaluator;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Reject a policy definition before it is stored
pub fn validate_policy(
    policy: &GovernancePolicy,
    evaluator: &PolicyEvaluator,
) -> Result<(), AppError> {
    if policy.id.trim().is_empty() {
        return Err(AppError::Validation("Policy id must not be empty".to_string()));
    }
    if policy.name.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "Policy {} must have a name",
            policy.id
        )));
    }
    evaluator.check_policy(policy)?;
    Ok(())
}

/// Thread-safe policy store
pub struct PolicyStore {
    policies: Arc<RwLock<HashMap<String, GovernancePolicy>>>,
    evaluator: Arc<PolicyEvaluator>,
}

impl PolicyStore {
    pub fn new(evaluator: Arc<PolicyEvaluator>) -> Self {
        Self {
            policies: Arc::new(RwLock::new(HashMap::new())),
            evaluator,
        }
    }

    /// Store seeded with the default policy set
    pub async fn with_defaults(evaluator: Arc<PolicyEvaluator>) -> Result<Self, AppError> {
        let store = Self::new(evaluator);
        for policy in default_policies() {
            store.upsert(policy).await?;
        }
        Ok(store)
    }

    /// Create or replace a policy
    pub async fn upsert(&self, policy: GovernancePolicy) -> Result<GovernancePolicy, AppError> {
        validate_policy(&policy, &self.evaluator)?;

        let mut policies = self.policies.write().await;
        let replaced = policies.insert(policy.id.clone(), policy.clone()).is_some();
        info!(
            "{} policy {} ({}, {})",
            if replaced { "Updated" } else { "Created" },
            policy.id,
            policy.severity,
            if policy.is_enabled { "enabled" } else { "disabled" }
        );
        Ok(policy)
    }

    pub async fn get(&self, id: &str) -> Result<GovernancePolicy, AppError> {
        let policies = self.policies.read().await;
        policies
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))
    }

    /// All policies, sorted by id
    pub async fn list(&self) -> Vec<GovernancePolicy> {
        let policies = self.policies.read().await;
        let mut list: Vec<GovernancePolicy> = policies.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<GovernancePolicy, AppError> {
        let mut policies = self.policies.write().await;
        let policy = policies
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))?;

        policy.is_enabled = enabled;
        info!("Policy {} {}", id, if enabled { "enabled" } else { "disabled" });
        Ok(policy.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut policies = self.policies.write().await;
        policies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PolicyCategory, RuleConfig, Severity};
    use crate::policy::defaults::default_registry;

    fn evaluator() -> Arc<PolicyEvaluator> {
        Arc::new(PolicyEvaluator::new(Arc::new(default_registry())))
    }

    #[tokio::test]
    async fn test_seeded_store_lists_sorted() {
        let store = PolicyStore::with_defaults(evaluator()).await.unwrap();
        let ids: Vec<String> = store.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["P001", "P002", "P003", "P004", "P005", "P006"]);
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let store = PolicyStore::with_defaults(evaluator()).await.unwrap();
        let policy = store.set_enabled("P004", false).await.unwrap();
        assert!(!policy.is_enabled);
        assert!(!store.get("P004").await.unwrap().is_enabled);

        store.delete("P004").await.unwrap();
        assert!(matches!(store.delete("P004").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_regex_rejected() {
        let store = PolicyStore::new(evaluator());
        let policy = GovernancePolicy {
            id: "P100".into(),
            name: "Broken".into(),
            description: None,
            category: PolicyCategory::Operations,
            severity: Severity::Info,
            is_enabled: true,
            rule_config: RuleConfig::name_regex("(["),
        };
        assert!(matches!(
            store.upsert(policy).await,
            Err(AppError::Validation(_))
        ));
    }
}
