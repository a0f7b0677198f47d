//! Default governance policies
//!
//! Seeded into the policy store at startup unless `SEED_DEFAULT_POLICIES=false`.

use crate::models::{GceResource, GovernancePolicy, PolicyCategory, RuleConfig, Severity};
use crate::policy::registry::CustomPolicyRegistry;

pub const TERMINATED_PRODUCTION_POLICY_ID: &str = "P006";

/// Regions new workloads must not be placed in
pub const RESTRICTED_REGIONS: &[&str] = &["asia-east2", "southamerica-east1"];

fn policy(
    id: &str,
    name: &str,
    description: &str,
    category: PolicyCategory,
    severity: Severity,
    rule_config: RuleConfig,
) -> GovernancePolicy {
    GovernancePolicy {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        category,
        severity,
        is_enabled: true,
        rule_config,
    }
}

pub fn default_policies() -> Vec<GovernancePolicy> {
    vec![
        policy(
            "P001",
            "Environment label required",
            "Every resource must declare its environment",
            PolicyCategory::Labeling,
            Severity::Critical,
            RuleConfig::required_label("environment"),
        ),
        policy(
            "P002",
            "Cost center label required",
            "Spend must be attributable to a cost center",
            PolicyCategory::Cost,
            Severity::Medium,
            RuleConfig::required_label("cost-center"),
        ),
        policy(
            "P003",
            "Known environment values",
            "Environment must be production, staging or development",
            PolicyCategory::Labeling,
            Severity::Warning,
            RuleConfig::allowed_values("environment", &["production", "staging", "development"]),
        ),
        policy(
            "P004",
            "Naming convention",
            "Names are lowercase, start with a letter and use dashes",
            PolicyCategory::Operations,
            Severity::Info,
            RuleConfig::name_regex("^[a-z][a-z0-9-]*$"),
        ),
        policy(
            "P005",
            "Restricted regions",
            "Resources must not run in restricted regions",
            PolicyCategory::Compliance,
            Severity::Medium,
            RuleConfig::region_restriction(RESTRICTED_REGIONS),
        ),
        policy(
            TERMINATED_PRODUCTION_POLICY_ID,
            "Terminated production instance",
            "Production instance is terminated and still holds resources",
            PolicyCategory::Cost,
            Severity::Warning,
            RuleConfig::custom(),
        ),
    ]
}

fn terminated_production(resource: &GceResource) -> anyhow::Result<bool> {
    Ok(resource.status == "TERMINATED"
        && resource.labels.get("environment").map(String::as_str) == Some("production"))
}

/// Registry holding the predicates the default policies need
pub fn default_registry() -> CustomPolicyRegistry {
    let mut registry = CustomPolicyRegistry::new();
    registry.register(TERMINATED_PRODUCTION_POLICY_ID, terminated_production);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;
    use crate::policy::PolicyEvaluator;
    use std::sync::Arc;

    #[test]
    fn test_defaults_compile_against_default_registry() {
        let evaluator = PolicyEvaluator::new(Arc::new(default_registry()));
        for policy in default_policies() {
            assert!(evaluator.check_policy(&policy).is_ok(), "{} invalid", policy.id);
        }
    }

    #[test]
    fn test_terminated_production_instance() {
        let evaluator = PolicyEvaluator::new(Arc::new(default_registry()));
        let resource = GceResource::new(
            "1",
            "billing-api",
            ResourceType::Instance,
            "us-central1-a",
            "TERMINATED",
        )
        .with_labels(
            [
                ("environment".to_string(), "production".to_string()),
                ("cost-center".to_string(), "cc-42".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        let violations = evaluator.evaluate(&resource, &default_policies());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].policy_id, TERMINATED_PRODUCTION_POLICY_ID);
    }
}
