//! Label operations and saved pipelines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Set a key only if it is absent
    Add,
    /// Delete a key
    Remove,
    /// Set a key unconditionally
    Replace,
    /// Copy regex capture groups into labels
    ExtractRegex,
    /// Literal substring replacement inside a value
    Pattern,
    /// Lower/upper-case a value or a key name
    CaseTransform,
    /// Exact-match value lookup table
    NormalizeValues,
    /// Set a key when a source field matches
    ConditionalSet,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Add => "ADD",
            OperationType::Remove => "REMOVE",
            OperationType::Replace => "REPLACE",
            OperationType::ExtractRegex => "EXTRACT_REGEX",
            OperationType::Pattern => "PATTERN",
            OperationType::CaseTransform => "CASE_TRANSFORM",
            OperationType::NormalizeValues => "NORMALIZE_VALUES",
            OperationType::ConditionalSet => "CONDITIONAL_SET",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    Lowercase,
    Uppercase,
}

impl Casing {
    pub fn apply(&self, input: &str) -> String {
        match self {
            Casing::Lowercase => input.to_lowercase(),
            Casing::Uppercase => input.to_uppercase(),
        }
    }
}

/// Comparison used by CONDITIONAL_SET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    MatchesRegex,
}

/// Capture group index mapped to a target label key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexGroup {
    pub index: usize,
    pub target_key: String,
}

/// Type-specific parameters. Which fields are required depends on the operation type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<RegexGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casing: Option<Casing>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_map: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<MatchOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_value: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// One step of a pipeline. Immutable value object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelOperation {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(default)]
    pub config: OperationConfig,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl LabelOperation {
    pub fn new(id: impl Into<String>, op_type: OperationType, config: OperationConfig) -> Self {
        Self {
            id: id.into(),
            op_type,
            config,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Label used in error contexts, e.g. `operation op-2 (PATTERN)`
    pub fn context(&self) -> String {
        format!("operation {} ({})", self.id, self.op_type)
    }
}

/// Ordered, user-authored sequence of operations. Order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPipeline {
    pub id: String,
    pub name: String,
    pub operations: Vec<LabelOperation>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_wire_format() {
        let op: LabelOperation = serde_json::from_value(serde_json::json!({
            "id": "op-1",
            "type": "EXTRACT_REGEX",
            "config": {
                "regex": "^(\\w+)-",
                "sourceField": "name",
                "groups": [{ "index": 1, "targetKey": "environment" }]
            }
        }))
        .unwrap();

        assert_eq!(op.op_type, OperationType::ExtractRegex);
        assert!(op.enabled);
        assert_eq!(op.config.source_field.as_deref(), Some("name"));
        assert_eq!(op.config.groups[0].target_key, "environment");
    }

    #[test]
    fn test_operator_and_casing_names() {
        let op: MatchOperator = serde_json::from_str("\"starts_with\"").unwrap();
        assert_eq!(op, MatchOperator::StartsWith);
        assert_eq!(Casing::Uppercase.apply("prod"), "PROD");
    }
}
