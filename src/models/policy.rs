//! Governance policies and violations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy severity. Declared lowest first so `Ord` gives CRITICAL > MEDIUM > WARNING > INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Medium,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Medium => "MEDIUM",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyCategory {
    Labeling,
    Cost,
    Security,
    Operations,
    Compliance,
}

/// Closed set of rule kinds, plus one custom kind resolved through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    RequiredLabel,
    AllowedValues,
    NameRegex,
    RegionRestriction,
    Custom,
}

/// Declarative rule parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl RuleConfig {
    pub fn required_label(key: impl Into<String>) -> Self {
        Self {
            rule_type: RuleType::RequiredLabel,
            key: Some(key.into()),
            values: Vec::new(),
            regex: None,
        }
    }

    pub fn allowed_values(key: impl Into<String>, values: &[&str]) -> Self {
        Self {
            rule_type: RuleType::AllowedValues,
            key: Some(key.into()),
            values: values.iter().map(|v| v.to_string()).collect(),
            regex: None,
        }
    }

    pub fn name_regex(regex: impl Into<String>) -> Self {
        Self {
            rule_type: RuleType::NameRegex,
            key: None,
            values: Vec::new(),
            regex: Some(regex.into()),
        }
    }

    pub fn region_restriction(values: &[&str]) -> Self {
        Self {
            rule_type: RuleType::RegionRestriction,
            key: None,
            values: values.iter().map(|v| v.to_string()).collect(),
            regex: None,
        }
    }

    pub fn custom() -> Self {
        Self {
            rule_type: RuleType::Custom,
            key: None,
            values: Vec::new(),
            regex: None,
        }
    }
}

/// A governance policy definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernancePolicy {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: PolicyCategory,
    pub severity: Severity,
    pub is_enabled: bool,
    pub rule_config: RuleConfig,
}

impl GovernancePolicy {
    pub fn context(&self) -> String {
        format!("policy {}", self.id)
    }
}

/// Ephemeral evaluation output; never stored as source of truth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyViolation {
    pub policy_id: String,
    pub message: String,
    pub severity: Severity,
}
