//! Timeline snapshots and drift results

use crate::models::resource::{GceResource, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time capture of a resource's identity-relevant fields. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    /// Matches a `GceResource` id
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub status: String,
    pub zone: String,
    /// Canonical serialization of the labels at snapshot time
    pub label_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// All snapshots taken at one instant. Entries are not uniformly spaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    /// Calendar date of `timestamp`, `YYYY-MM-DD`
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub resources: Vec<ResourceSnapshot>,
}

/// Drift classification of one resource id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// Result of diffing one id. `past` and `present` borrow the detector's inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult<'a> {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub change_type: ChangeType,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub past: Option<&'a ResourceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<&'a GceResource>,
}
