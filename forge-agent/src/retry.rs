//! Retry policy for provider calls (spec.md §7): transient failures are
//! retried with exponential backoff; permanent failures surface on the
//! first attempt.

use forge_provider::ProviderError;
use std::future::Future;
use std::time::Duration;

/// Base delay before the first retry. Doubles on each subsequent retry.
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Retries are attempted up to this many times after the initial attempt.
const MAX_RETRIES: u32 = 2;

/// Run `attempt` up to `1 + MAX_RETRIES` times, retrying only on
/// [`ProviderError::is_retryable`] errors with a doubling backoff starting
/// at one second. Permanent errors and the final exhausted attempt are
/// returned as-is.
pub async fn with_retry<T, F, Fut>(mut attempt: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut delay = BASE_DELAY;
    for retry in 0..=MAX_RETRIES {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && retry < MAX_RETRIES => {
                tracing::warn!(retry, ?delay, %error, "transient provider error, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(error) => return Err(error),
        }
    }
    unreachable!("loop always returns on the final iteration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, ProviderError> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("ok")
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, ProviderError> = with_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::Transient("flaky".into()))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, ProviderError> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Transient("always flaky".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_surface_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, ProviderError> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Permanent { status: Some(401), body: "bad key".into() })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
