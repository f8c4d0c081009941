use core::future::Future;
use core::time::Duration;

use hall_seat_allocation_config::RetryConfig;
use hall_seat_allocation_core::HallError;
use tracing::warn;

/// Runs a read until it succeeds, fails with a domain error, or `attempts` calls failed with a
/// storage error. The backoff doubles after every failed call.
pub async fn with_retry<T, F, Fut>(
    retry: RetryConfig,
    operation: &'static str,
    call: F,
) -> Result<T, HallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HallError>>,
{
    retry_while(retry, operation, HallError::is_storage, call).await
}

/// Runs a mutation, retrying only failures that never reached storage.
///
/// A statement that failed after being sent may still have committed, so running it again could
/// record the same change twice.
pub async fn with_write_retry<T, F, Fut>(
    retry: RetryConfig,
    operation: &'static str,
    call: F,
) -> Result<T, HallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HallError>>,
{
    retry_while(retry, operation, HallError::is_unapplied_storage, call).await
}

async fn retry_while<T, F, Fut>(
    retry: RetryConfig,
    operation: &'static str,
    retryable: fn(&HallError) -> bool,
    mut call: F,
) -> Result<T, HallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HallError>>,
{
    let mut backoff = Duration::from_millis(retry.initial_backoff_ms);
    let mut attempt = 1;
    loop {
        match call().await {
            Err(err) if retryable(&err) && attempt < retry.attempts => {
                warn!(
                    operation,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "storage unavailable, retrying: {err}"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use hall_seat_allocation_core::{Missing, NoticeId, StorageError};

    use super::*;

    const FAST: RetryConfig = RetryConfig {
        attempts: 3,
        initial_backoff_ms: 1,
    };

    fn unavailable() -> HallError {
        HallError::Storage(StorageError::new(std::io::Error::other("connection reset")))
    }

    fn refused() -> HallError {
        HallError::Storage(StorageError::unreachable(std::io::Error::other(
            "connection refused",
        )))
    }

    #[tokio::test]
    async fn storage_errors_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let result = with_retry(FAST, "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retry(FAST, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "storage_unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn domain_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retry(FAST, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(HallError::NotFound(Missing::Notice(NoticeId(1))))
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "not_found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_that_may_have_been_applied_run_once() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_write_retry(FAST, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "storage_unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_are_retried_while_storage_is_unreachable() {
        let calls = &AtomicU32::new(0);
        let result = with_write_retry(FAST, "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(refused())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn writes_stop_at_the_first_applied_failure() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_write_retry(FAST, "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(refused())
            } else {
                Err(unavailable())
            }
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "storage_unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
