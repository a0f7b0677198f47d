//! Label history entries

use crate::models::labels::LabelMapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why labels changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryChangeType {
    /// Direct manual edit
    Update,
    /// Pipeline output committed for a single resource
    ApplyProposal,
    /// Restores the `previousLabels` of a caller-selected entry
    Revert,
    /// Pipeline output committed across several resources
    BatchUpdate,
}

/// One appended history record. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelHistoryEntry {
    pub id: Uuid,
    pub resource_id: String,
    /// Position in the resource's append order, starting at 1
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub previous_labels: LabelMapping,
    pub new_labels: LabelMapping,
    pub change_type: HistoryChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
