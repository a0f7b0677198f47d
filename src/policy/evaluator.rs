//! Policy Evaluator
//!
//! Checks resources against governance policies and reports violations.
//! Built-in rule kinds are dispatched here; CUSTOM rules go through the
//! [`CustomPolicyRegistry`]. Evaluation never mutates the resource.

use crate::error::EngineError;
use crate::models::{
    BatchOutcome, GceResource, GovernancePolicy, PolicyViolation, RuleConfig, RuleType, Severity,
};
use crate::pipeline::source::compile_regex;
use crate::policy::registry::{CustomPolicyRegistry, CustomPredicate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

enum Rule<'a> {
    RequiredLabel(&'a str),
    AllowedValues { key: &'a str, values: &'a [String] },
    NameRegex(Regex),
    RegionRestriction(&'a [String]),
    Custom(Arc<dyn CustomPredicate>),
}

/// A policy whose rule parameters have been checked
struct CompiledPolicy<'a> {
    policy: &'a GovernancePolicy,
    rule: Rule<'a>,
}

/// Aggregate view over a batch of violations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSummary {
    pub total_policies_checked: usize,
    pub total_resources: usize,
    pub noncompliant_resources: usize,
    pub total_violations: usize,
    pub violations_by_severity: BTreeMap<String, usize>,
    pub has_critical: bool,
    pub compliant: bool,
}

/// Region prefix match: `us-east1` restricts `us-east1-b`
fn in_restricted_region<'v>(zone: &str, values: &'v [String]) -> Option<&'v str> {
    values
        .iter()
        .find(|value| {
            zone == value.as_str()
                || zone
                    .strip_prefix(value.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        })
        .map(String::as_str)
}

fn rule_key<'a>(config: &'a RuleConfig, context: &str) -> Result<&'a str, EngineError> {
    config
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| EngineError::configuration(context, "missing required rule field 'key'"))
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("predicate panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("predicate panicked: {}", s)
    } else {
        "predicate panicked".to_string()
    }
}

/// Sort for display: severity descending, then policy id
pub fn sort_violations(violations: &mut [PolicyViolation]) {
    violations.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.policy_id.cmp(&b.policy_id))
    });
}

/// Dispatches policies to their rule kind
pub struct PolicyEvaluator {
    registry: Arc<CustomPolicyRegistry>,
}

impl PolicyEvaluator {
    pub fn new(registry: Arc<CustomPolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CustomPolicyRegistry {
        &self.registry
    }

    /// Structural check of one policy, independent of any resource
    pub fn check_policy(&self, policy: &GovernancePolicy) -> Result<(), EngineError> {
        self.compile(policy).map(|_| ())
    }

    fn compile<'a>(&self, policy: &'a GovernancePolicy) -> Result<CompiledPolicy<'a>, EngineError> {
        let context = policy.context();
        let config = &policy.rule_config;

        let rule = match config.rule_type {
            RuleType::RequiredLabel => Rule::RequiredLabel(rule_key(config, &context)?),
            RuleType::AllowedValues => {
                if config.values.is_empty() {
                    return Err(EngineError::configuration(&context, "'values' must not be empty"));
                }
                Rule::AllowedValues {
                    key: rule_key(config, &context)?,
                    values: &config.values,
                }
            }
            RuleType::NameRegex => {
                let pattern = config.regex.as_deref().ok_or_else(|| {
                    EngineError::configuration(&context, "missing required rule field 'regex'")
                })?;
                Rule::NameRegex(compile_regex(pattern, &context)?)
            }
            RuleType::RegionRestriction => {
                if config.values.is_empty() {
                    return Err(EngineError::configuration(&context, "'values' must not be empty"));
                }
                Rule::RegionRestriction(&config.values)
            }
            RuleType::Custom => {
                let predicate = self.registry.get(&policy.id).ok_or_else(|| {
                    EngineError::configuration(&context, "no custom predicate registered for this policy")
                })?;
                Rule::Custom(predicate)
            }
        };

        Ok(CompiledPolicy { policy, rule })
    }

    /// Policies that fail to compile are logged and left out; the rest still run
    fn compile_enabled<'a>(&self, policies: &'a [GovernancePolicy]) -> Vec<CompiledPolicy<'a>> {
        policies
            .iter()
            .filter(|p| p.is_enabled)
            .filter_map(|p| match self.compile(p) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!("Skipping policy {}: {}", p.id, e);
                    None
                }
            })
            .collect()
    }

    /// Evaluate enabled policies against one resource. Violations come back sorted.
    pub fn evaluate(&self, resource: &GceResource, policies: &[GovernancePolicy]) -> Vec<PolicyViolation> {
        let compiled = self.compile_enabled(policies);
        Self::run(resource, &compiled)
    }

    /// Evaluate many resources, compiling the policy set once
    pub fn evaluate_batch(
        &self,
        resources: &[GceResource],
        policies: &[GovernancePolicy],
    ) -> BatchOutcome<Vec<PolicyViolation>> {
        let compiled = self.compile_enabled(policies);
        let mut outcome = BatchOutcome::default();
        for resource in resources {
            outcome.record(resource.id.clone(), Ok(Self::run(resource, &compiled)));
        }
        outcome.finish()
    }

    fn run(resource: &GceResource, compiled: &[CompiledPolicy<'_>]) -> Vec<PolicyViolation> {
        let mut violations: Vec<PolicyViolation> = compiled
            .iter()
            .filter_map(|c| Self::check(resource, c))
            .collect();
        sort_violations(&mut violations);

        debug!(
            "Resource {} checked against {} policies: {} violations",
            resource.id,
            compiled.len(),
            violations.len()
        );
        violations
    }

    /// At most one violation per policy per resource
    fn check(resource: &GceResource, compiled: &CompiledPolicy<'_>) -> Option<PolicyViolation> {
        let policy = compiled.policy;

        let message = match &compiled.rule {
            Rule::RequiredLabel(key) => {
                if resource.labels.contains_key(*key) {
                    return None;
                }
                format!("Missing required label '{}'", key)
            }
            Rule::AllowedValues { key, values } => {
                let value = resource.labels.get(*key)?;
                if values.iter().any(|allowed| allowed == value) {
                    return None;
                }
                format!(
                    "Label '{}' has value '{}', expected one of [{}]",
                    key,
                    value,
                    values.join(", ")
                )
            }
            Rule::NameRegex(regex) => {
                if regex.is_match(&resource.name) {
                    return None;
                }
                format!(
                    "Name '{}' does not match pattern '{}'",
                    resource.name,
                    regex.as_str()
                )
            }
            Rule::RegionRestriction(values) => {
                let restricted = in_restricted_region(&resource.zone, values)?;
                format!(
                    "Zone '{}' is in restricted region '{}'",
                    resource.zone, restricted
                )
            }
            Rule::Custom(predicate) => {
                if !Self::run_custom(resource, policy, predicate.as_ref()) {
                    return None;
                }
                policy
                    .description
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| policy.name.clone())
            }
        };

        Some(PolicyViolation {
            policy_id: policy.id.clone(),
            message,
            severity: policy.severity,
        })
    }

    /// A failing or panicking predicate counts as "no violation" and is only logged
    fn run_custom(resource: &GceResource, policy: &GovernancePolicy, predicate: &dyn CustomPredicate) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| predicate.violates(resource)));

        let reason = match outcome {
            Ok(Ok(violates)) => return violates,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_reason(payload.as_ref()),
        };

        let fault = EngineError::EvaluationFault {
            policy_id: policy.id.clone(),
            reason,
        };
        warn!("{} (resource {}), treated as no violation", fault, resource.id);
        false
    }

    /// Summarize a batch of evaluation results
    pub fn summarize(
        outcome: &BatchOutcome<Vec<PolicyViolation>>,
        policies: &[GovernancePolicy],
    ) -> ViolationSummary {
        let mut violations_by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_violations = 0;
        let mut has_critical = false;

        for violations in outcome.results.values() {
            for v in violations {
                *violations_by_severity.entry(v.severity.to_string()).or_insert(0) += 1;
                total_violations += 1;
                has_critical |= v.severity == Severity::Critical;
            }
        }

        let noncompliant_resources = outcome.results.values().filter(|v| !v.is_empty()).count();

        ViolationSummary {
            total_policies_checked: policies.iter().filter(|p| p.is_enabled).count(),
            total_resources: outcome.results.len() + outcome.failed.len(),
            noncompliant_resources,
            total_violations,
            violations_by_severity,
            has_critical,
            compliant: total_violations == 0 && outcome.failed.is_empty(),
        }
    }
}
