//! Batch fan-out
//!
//! Resources have no cross-dependencies during evaluation, so large batches
//! are split into chunks and evaluated on blocking worker threads. Results
//! are keyed by resource id; chunk completion order does not matter.

use crate::config::EngineConfig;
use crate::models::{BatchOutcome, GceResource};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub async fn evaluate_chunked<T, F>(
    resources: Vec<GceResource>,
    engine: &EngineConfig,
    evaluate: F,
) -> BatchOutcome<T>
where
    T: Send + 'static,
    F: Fn(&[GceResource]) -> BatchOutcome<T> + Send + Sync + 'static,
{
    if resources.len() < engine.parallel_threshold {
        return evaluate(&resources);
    }

    let chunk_size = engine.chunk_size.max(1);
    let evaluate = Arc::new(evaluate);

    let workers: Vec<(Vec<String>, JoinHandle<BatchOutcome<T>>)> = resources
        .chunks(chunk_size)
        .map(|chunk| {
            let ids: Vec<String> = chunk.iter().map(|r| r.id.clone()).collect();
            let chunk = chunk.to_vec();
            let evaluate = evaluate.clone();
            (ids, tokio::task::spawn_blocking(move || evaluate(&chunk)))
        })
        .collect();

    debug!(
        "Evaluating {} resources on {} workers",
        resources.len(),
        workers.len()
    );

    let mut outcome = BatchOutcome::default();
    for (ids, handle) in workers {
        match handle.await {
            Ok(partial) => outcome.merge(partial),
            Err(e) => {
                error!("Evaluation worker failed: {}", e);
                for id in ids {
                    outcome.fail(id, format!("evaluation worker failed: {}", e));
                }
            }
        }
    }

    outcome.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::EngineError;
    use crate::models::ResourceType;

    fn engine(parallel_threshold: usize, chunk_size: usize) -> EngineConfig {
        EngineConfig {
            parallel_threshold,
            chunk_size,
            commit_retry: RetryConfig {
                max_attempts: 1,
                base_delay_ms: 1,
            },
            timeline_max_entries: 10,
            seed_default_policies: false,
        }
    }

    fn resources(n: usize) -> Vec<GceResource> {
        (0..n)
            .map(|i| {
                GceResource::new(
                    format!("r-{:03}", i),
                    format!("vm-{}", i),
                    ResourceType::Instance,
                    "us-east1-b",
                    "RUNNING",
                )
            })
            .collect()
    }

    fn name_lengths(chunk: &[GceResource]) -> BatchOutcome<usize> {
        let mut outcome = BatchOutcome::default();
        for r in chunk {
            if r.id == "r-007" {
                outcome.record(r.id.clone(), Err(EngineError::configuration("test", "rejected")));
            } else {
                outcome.record(r.id.clone(), Ok(r.name.len()));
            }
        }
        outcome.finish()
    }

    #[tokio::test]
    async fn test_chunked_and_inline_agree() {
        let inline = evaluate_chunked(resources(50), &engine(1000, 8), name_lengths).await;
        let chunked = evaluate_chunked(resources(50), &engine(10, 8), name_lengths).await;

        assert_eq!(inline, chunked);
        assert_eq!(chunked.succeeded.len(), 49);
        assert_eq!(chunked.failed[0].id, "r-007");
    }

    #[tokio::test]
    async fn test_panicking_worker_fails_only_its_chunk() {
        let outcome = evaluate_chunked(resources(20), &engine(1, 5), |chunk: &[GceResource]| {
            if chunk.iter().any(|r| r.id == "r-012") {
                panic!("worker crashed");
            }
            name_lengths(chunk)
        })
        .await;

        let failed: Vec<&str> = outcome.failed.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(failed, vec!["r-007", "r-010", "r-011", "r-012", "r-013", "r-014"]);
        assert_eq!(outcome.succeeded.len(), 14);
    }
}
