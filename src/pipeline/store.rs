//! Saved pipeline storage
//!
//! In-memory store for user-authored pipelines. Definitions are validated
//! before they are accepted, so evaluation only ever sees well-formed ones.

use crate::error::{conflict_error, AppError};
use crate::models::SavedPipeline;
use crate::pipeline::validation::validate_pipeline;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Thread-safe pipeline store
pub struct PipelineStore {
    pipelines: Arc<RwLock<HashMap<String, SavedPipeline>>>,
}

impl PipelineStore {
    pub fn new() -> Self {
        Self {
            pipelines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Save a new pipeline
    pub async fn create(&self, pipeline: SavedPipeline) -> Result<SavedPipeline, AppError> {
        validate_pipeline(&pipeline)?;

        let mut pipelines = self.pipelines.write().await;
        if pipelines.contains_key(&pipeline.id) {
            return Err(conflict_error(format!("Pipeline {} already exists", pipeline.id)));
        }

        info!(
            "Saved pipeline {} ({} operations)",
            pipeline.id,
            pipeline.operations.len()
        );
        pipelines.insert(pipeline.id.clone(), pipeline.clone());
        Ok(pipeline)
    }

    /// Get a pipeline by ID
    pub async fn get(&self, id: &str) -> Result<SavedPipeline, AppError> {
        let pipelines = self.pipelines.read().await;
        pipelines
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Pipeline {} not found", id)))
    }

    /// All pipelines, oldest first
    pub async fn list(&self) -> Vec<SavedPipeline> {
        let pipelines = self.pipelines.read().await;
        let mut list: Vec<SavedPipeline> = pipelines.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut pipelines = self.pipelines.write().await;
        pipelines
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Pipeline {} not found", id)))
    }

    pub async fn count(&self) -> usize {
        self.pipelines.read().await.len()
    }
}

impl Default for PipelineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelOperation, OperationConfig, OperationType};
    use chrono::{Duration, Utc};

    fn pipeline(id: &str, offset_secs: i64) -> SavedPipeline {
        SavedPipeline {
            id: id.into(),
            name: format!("pipeline {}", id),
            operations: vec![LabelOperation::new(
                "op-1",
                OperationType::Add,
                OperationConfig {
                    key: Some("owner".into()),
                    value: Some("platform".into()),
                    ..Default::default()
                },
            )],
            created_at: Utc::now() + Duration::seconds(offset_secs),
            created_by: Some("alice".into()),
        }
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let store = PipelineStore::new();
        store.create(pipeline("b", 10)).await.unwrap();
        store.create(pipeline("a", 20)).await.unwrap();

        let ids: Vec<String> = store.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        store.delete("b").await.unwrap();
        assert_eq!(store.count().await, 1);
        assert!(matches!(store.get("b").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_rejected() {
        let store = PipelineStore::new();
        store.create(pipeline("a", 0)).await.unwrap();
        assert!(matches!(
            store.create(pipeline("a", 0)).await,
            Err(AppError::Conflict(_))
        ));

        let mut invalid = pipeline("c", 0);
        invalid.operations[0].config.value = None;
        assert!(matches!(
            store.create(invalid).await,
            Err(AppError::Validation(_))
        ));
    }
}
