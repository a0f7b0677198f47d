//! Governance Timeline Store
//!
//! Keeps timeline entries in chronological order. Entries are not evenly
//! spaced; consumers read them as an ordered sequence of captures.

use crate::error::AppError;
use crate::models::{GceResource, ResourceSnapshot, TimelineEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Metadata about a timeline entry (lightweight, used for listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntryMetadata {
    pub id: Uuid,
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub resource_count: usize,
}

impl From<&TimelineEntry> for TimelineEntryMetadata {
    fn from(entry: &TimelineEntry) -> Self {
        Self {
            id: entry.id,
            date: entry.date.clone(),
            timestamp: entry.timestamp,
            resource_count: entry.resources.len(),
        }
    }
}

impl TimelineEntry {
    /// Snapshot every resource at `timestamp`
    pub fn capture(resources: &[GceResource], timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: timestamp.format("%Y-%m-%d").to_string(),
            timestamp,
            resources: resources.iter().map(ResourceSnapshot::capture).collect(),
        }
    }
}

/// Store for the governance timeline
pub struct TimelineStore {
    entries: Arc<RwLock<Vec<TimelineEntry>>>,
    max_entries: usize,
}

impl TimelineStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Capture the present resource set as a new entry
    pub async fn capture(&self, resources: &[GceResource]) -> TimelineEntry {
        let entry = TimelineEntry::capture(resources, Utc::now());
        self.insert(entry.clone()).await;
        entry
    }

    /// Insert at its chronological position, pruning the oldest beyond the limit
    pub async fn insert(&self, entry: TimelineEntry) {
        let mut entries = self.entries.write().await;

        let position = entries.partition_point(|e| e.timestamp <= entry.timestamp);
        tracing::info!(
            "Captured timeline entry {} ({}, {} resources)",
            entry.id,
            entry.date,
            entry.resources.len()
        );
        entries.insert(position, entry);

        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
            tracing::info!("Pruned {} old timeline entries", excess);
        }
    }

    /// Most recent entry
    pub async fn latest(&self) -> Option<TimelineEntry> {
        self.entries.read().await.last().cloned()
    }

    pub async fn get(&self, id: Uuid) -> Result<TimelineEntry, AppError> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Timeline entry {} not found", id)))
    }

    /// Full entries, oldest first
    pub async fn entries(&self) -> Vec<TimelineEntry> {
        self.entries.read().await.clone()
    }

    /// Entry metadata, oldest first
    pub async fn list(&self) -> Vec<TimelineEntryMetadata> {
        let entries = self.entries.read().await;
        entries.iter().map(TimelineEntryMetadata::from).collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;
    use chrono::{Duration, TimeZone};

    fn entry_at(day: u32) -> TimelineEntry {
        let resource = GceResource::new("1", "vm", ResourceType::Instance, "us-east1-b", "RUNNING");
        TimelineEntry::capture(
            &[resource],
            Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_entries_kept_chronological() {
        let store = TimelineStore::new(10);
        store.insert(entry_at(5)).await;
        store.insert(entry_at(1)).await;
        store.insert(entry_at(3)).await;

        let dates: Vec<String> = store.list().await.into_iter().map(|m| m.date).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-03", "2024-03-05"]);
        assert_eq!(store.latest().await.unwrap().date, "2024-03-05");
    }

    #[tokio::test]
    async fn test_prunes_oldest_beyond_limit() {
        let store = TimelineStore::new(2);
        for day in 1..=4 {
            store.insert(entry_at(day)).await;
        }
        let entries = store.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "2024-03-03");
    }

    #[tokio::test]
    async fn test_capture_uses_now() {
        let store = TimelineStore::new(5);
        let before = Utc::now() - Duration::seconds(1);
        let entry = store.capture(&[]).await;
        assert!(entry.timestamp >= before);
        assert!(store.get(entry.id).await.is_ok());
        assert!(store.get(Uuid::new_v4()).await.is_err());
    }
}
