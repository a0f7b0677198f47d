//! Cloud resource as supplied by the inventory source

use crate::models::labels::LabelMapping;
use crate::models::policy::PolicyViolation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of resources the inventory reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Instance,
    Disk,
    Snapshot,
    Image,
    ServerlessService,
    ManagedDatabase,
    Bucket,
    Cluster,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Instance => "instance",
            ResourceType::Disk => "disk",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Image => "image",
            ResourceType::ServerlessService => "serverless-service",
            ResourceType::ManagedDatabase => "managed-database",
            ResourceType::Bucket => "bucket",
            ResourceType::Cluster => "cluster",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived drift state of a resource against the latest timeline snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftStatus {
    Drifted,
    Synced,
    #[default]
    Unknown,
}

/// A labelled cloud resource.
///
/// History is not embedded here; it lives in the history arena keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GceResource {
    /// Stable across time; the only cross-time identifier
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub zone: String,
    /// Provider-reported state, free-form
    pub status: String,
    #[serde(default)]
    pub labels: LabelMapping,
    /// Opaque version token required for any label write
    #[serde(default)]
    pub label_fingerprint: String,
    /// Recomputed on every evaluation, never persisted
    #[serde(default)]
    pub violations: Vec<PolicyViolation>,
    #[serde(default)]
    pub drift_status: DriftStatus,
}

impl GceResource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        resource_type: ResourceType,
        zone: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            resource_type,
            zone: zone.into(),
            status: status.into(),
            labels: LabelMapping::new(),
            label_fingerprint: String::new(),
            violations: Vec::new(),
            drift_status: DriftStatus::Unknown,
        }
    }

    pub fn with_labels(mut self, labels: LabelMapping) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.label_fingerprint = fingerprint.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_wire_names() {
        let json = serde_json::to_string(&ResourceType::ServerlessService).unwrap();
        assert_eq!(json, "\"serverless-service\"");
        assert_eq!(ResourceType::ManagedDatabase.as_str(), "managed-database");
    }

    #[test]
    fn test_resource_deserializes_with_defaults() {
        let resource: GceResource = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "web-1",
            "type": "instance",
            "zone": "us-central1-a",
            "status": "RUNNING"
        }))
        .unwrap();

        assert!(resource.labels.is_empty());
        assert!(resource.label_fingerprint.is_empty());
        assert_eq!(resource.drift_status, DriftStatus::Unknown);
    }
}
