//! Audit Trail Recorder
//!
//! Append-only label history, one log per resource. Appends to the same
//! resource are serialized by that resource's lock; different resources
//! never contend with each other. Committers hold a [`HistoryWriter`] across
//! the label write and its append, so the log order is the commit order.

use crate::error::AppError;
use crate::models::{HistoryChangeType, LabelHistoryEntry, LabelMapping};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;
use uuid::Uuid;

type ResourceLog = Arc<Mutex<Vec<LabelHistoryEntry>>>;

/// History arena keyed by resource id. Entries are stored in append order.
pub struct HistoryArena {
    logs: RwLock<HashMap<String, ResourceLog>>,
}

impl HistoryArena {
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
        }
    }

    async fn log_for(&self, resource_id: &str) -> ResourceLog {
        if let Some(log) = self.logs.read().await.get(resource_id) {
            return log.clone();
        }
        let mut logs = self.logs.write().await;
        logs.entry(resource_id.to_string()).or_default().clone()
    }

    /// Exclusive append access to one resource's log until dropped
    pub async fn writer(&self, resource_id: &str) -> HistoryWriter {
        let log = self.log_for(resource_id).await;
        HistoryWriter {
            resource_id: resource_id.to_string(),
            entries: log.lock_owned().await,
        }
    }

    /// Append one entry. Never merges with or replaces an existing entry.
    pub async fn record(
        &self,
        resource_id: &str,
        previous_labels: LabelMapping,
        new_labels: LabelMapping,
        actor: &str,
        change_type: HistoryChangeType,
        reason: Option<String>,
    ) -> LabelHistoryEntry {
        self.writer(resource_id)
            .await
            .append(previous_labels, new_labels, actor, change_type, reason)
    }

    /// History for display, newest first
    pub async fn history(&self, resource_id: &str) -> Vec<LabelHistoryEntry> {
        let log = {
            let logs = self.logs.read().await;
            match logs.get(resource_id) {
                Some(log) => log.clone(),
                None => return Vec::new(),
            }
        };
        let entries = log.lock().await;
        entries.iter().rev().cloned().collect()
    }

    /// Look up one entry of a resource's history
    pub async fn entry(&self, resource_id: &str, entry_id: Uuid) -> Result<LabelHistoryEntry, AppError> {
        self.history(resource_id)
            .await
            .into_iter()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "History entry {} not found for resource {}",
                    entry_id, resource_id
                ))
            })
    }

    /// Number of entries recorded for a resource
    pub async fn len(&self, resource_id: &str) -> usize {
        self.history(resource_id).await.len()
    }
}

/// Holds one resource's log locked; appends made through it keep commit order
pub struct HistoryWriter {
    resource_id: String,
    entries: OwnedMutexGuard<Vec<LabelHistoryEntry>>,
}

impl HistoryWriter {
    pub fn append(
        &mut self,
        previous_labels: LabelMapping,
        new_labels: LabelMapping,
        actor: &str,
        change_type: HistoryChangeType,
        reason: Option<String>,
    ) -> LabelHistoryEntry {
        // Timestamps never run backwards within one resource's log
        let now = Utc::now();
        let timestamp = self
            .entries
            .last()
            .map(|last| last.timestamp.max(now))
            .unwrap_or(now);

        let entry = LabelHistoryEntry {
            id: Uuid::new_v4(),
            resource_id: self.resource_id.clone(),
            sequence: self.entries.len() as u64 + 1,
            timestamp,
            actor: actor.to_string(),
            previous_labels,
            new_labels,
            change_type,
            reason,
        };
        self.entries.push(entry.clone());

        info!(
            "Recorded {:?} #{} for resource {} by {}",
            change_type, entry.sequence, self.resource_id, actor
        );
        entry
    }
}

impl Default for HistoryArena {
    fn default() -> Self {
        Self::new()
    }
}
