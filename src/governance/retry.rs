//! Bounded retry for inventory commits
//!
//! Only transient transport failures are retried. A CONFLICT means the
//! caller's view is stale and must be re-read, so it is returned at once.

use crate::config::RetryConfig;
use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const MAX_BACKOFF_MS: u64 = 5_000;

pub async fn with_backoff<T, F, Fut>(
    retry: &RetryConfig,
    operation: &str,
    mut attempt: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut backoff_ms = retry.base_delay_ms;
    let mut tries = 1;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && tries < retry.max_attempts => {
                warn!(error = %e, tries, backoff_ms, "{} failed, retrying", operation);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                tries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&retry(3), "commit", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::Unavailable("inventory timeout".into()))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = with_backoff(&retry(2), "commit", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Unavailable("down".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_conflict_is_never_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = with_backoff(&retry(5), "commit", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Conflict("stale fingerprint".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
