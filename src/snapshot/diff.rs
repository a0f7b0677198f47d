//! Drift Detector
//!
//! Compares snapshots from the governance timeline against the present
//! resource set. Resources are matched by `id` only; name, zone and labels
//! may all change over time.

use crate::models::{
    ChangeType, DiffResult, DriftStatus, GceResource, LabelDelta, ResourceSnapshot, TimelineEntry,
};
use crate::snapshot::canonical::{canonical_label_hash, parse_label_hash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Counts per change type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub total: usize,
    pub has_drift: bool,
}

/// Diff of one timeline entry against the present
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDiff<'a> {
    pub entry_id: Uuid,
    pub date: &'a str,
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<DiffResult<'a>>,
    pub summary: DriftSummary,
}

/// The drift detector. Never mutates its inputs.
pub struct DriftDetector;

impl DriftDetector {
    /// Classify every id present on either side. Output is sorted by id.
    /// If an id repeats on one side, the last occurrence wins.
    pub fn diff<'a>(past: &'a [ResourceSnapshot], present: &'a [GceResource]) -> Vec<DiffResult<'a>> {
        let past_map: BTreeMap<&str, &ResourceSnapshot> =
            past.iter().map(|s| (s.id.as_str(), s)).collect();
        let present_map: BTreeMap<&str, &GceResource> =
            present.iter().map(|r| (r.id.as_str(), r)).collect();

        let ids: BTreeSet<&str> = past_map.keys().chain(present_map.keys()).copied().collect();

        ids.into_iter()
            .filter_map(|id| {
                match (past_map.get(id).copied(), present_map.get(id).copied()) {
                    (None, Some(resource)) => Some(DiffResult {
                        id: id.to_string(),
                        name: resource.name.clone(),
                        resource_type: resource.resource_type,
                        change_type: ChangeType::Added,
                        details: "Resource not present in snapshot".to_string(),
                        past: None,
                        present: Some(resource),
                    }),
                    (Some(snapshot), None) => Some(DiffResult {
                        id: id.to_string(),
                        name: snapshot.name.clone(),
                        resource_type: snapshot.resource_type,
                        change_type: ChangeType::Removed,
                        details: "Resource no longer present".to_string(),
                        past: Some(snapshot),
                        present: None,
                    }),
                    (Some(snapshot), Some(resource)) => Some(Self::compare(snapshot, resource)),
                    (None, None) => None,
                }
            })
            .collect()
    }

    fn compare<'a>(snapshot: &'a ResourceSnapshot, resource: &'a GceResource) -> DiffResult<'a> {
        let mut details = Vec::new();

        let present_hash = canonical_label_hash(&resource.labels);
        if present_hash != snapshot.label_hash {
            // A hash that parses to the present mapping only differs in formatting
            match parse_label_hash(&snapshot.label_hash) {
                Some(past_labels) => {
                    let delta = LabelDelta::between(&past_labels, &resource.labels);
                    if !delta.is_empty() {
                        details.push(format!("labels {}", delta.describe()));
                    }
                }
                None => details.push("labels changed".to_string()),
            }
        }

        if resource.status != snapshot.status {
            details.push(format!("status {} -> {}", snapshot.status, resource.status));
        }

        let (change_type, details) = if details.is_empty() {
            (ChangeType::Unchanged, "No changes".to_string())
        } else {
            (ChangeType::Modified, details.join("; "))
        };

        DiffResult {
            id: resource.id.clone(),
            name: resource.name.clone(),
            resource_type: resource.resource_type,
            change_type,
            details,
            past: Some(snapshot),
            present: Some(resource),
        }
    }

    /// Diff each entry independently against the present set, oldest first
    pub fn diff_timeline<'a>(
        timeline: &'a [TimelineEntry],
        present: &'a [GceResource],
    ) -> Vec<EntryDiff<'a>> {
        timeline
            .iter()
            .map(|entry| {
                let changes = Self::diff(&entry.resources, present);
                let summary = Self::summarize(&changes);
                EntryDiff {
                    entry_id: entry.id,
                    date: &entry.date,
                    timestamp: entry.timestamp,
                    changes,
                    summary,
                }
            })
            .collect()
    }

    pub fn summarize(changes: &[DiffResult<'_>]) -> DriftSummary {
        let mut summary = DriftSummary::default();

        for change in changes {
            match change.change_type {
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::Modified => summary.modified += 1,
                ChangeType::Unchanged => summary.unchanged += 1,
            }
        }

        summary.total = changes.len();
        summary.has_drift = summary.modified > 0;
        summary
    }

    /// Drift status a change implies for a present resource
    pub fn drift_status(change_type: ChangeType) -> DriftStatus {
        match change_type {
            ChangeType::Modified => DriftStatus::Drifted,
            ChangeType::Unchanged => DriftStatus::Synced,
            ChangeType::Added | ChangeType::Removed => DriftStatus::Unknown,
        }
    }

    /// Drift status of every present resource in a diff
    pub fn drift_statuses(changes: &[DiffResult<'_>]) -> BTreeMap<String, DriftStatus> {
        changes
            .iter()
            .filter(|c| c.present.is_some())
            .map(|c| (c.id.clone(), Self::drift_status(c.change_type)))
            .collect()
    }
}
