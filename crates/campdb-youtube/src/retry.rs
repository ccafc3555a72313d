//! Retry with exponential back-off and jitter for the `YouTube` client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 5xx). Quota exhaustion and other
//! application-level errors are returned immediately without any retry.

use std::future::Future;
use std::time::Duration;

use crate::error::YoutubeError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 5xx responses: transient server/infrastructure errors.
///
/// **Not retriable (hard stop):**
/// - [`YoutubeError::QuotaExceeded`] — daily quota; stop immediately.
/// - [`YoutubeError::ApiError`] below 500 — retrying won't fix it.
/// - [`YoutubeError::NotFound`] — the resource does not exist.
/// - [`YoutubeError::Deserialize`] — malformed response; retrying won't fix it.
pub(crate) fn is_retriable(err: &YoutubeError) -> bool {
    match err {
        YoutubeError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        YoutubeError::ApiError { code, .. } => *code >= 500,
        YoutubeError::QuotaExceeded(_)
        | YoutubeError::NotFound(_)
        | YoutubeError::Deserialize { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// Delay doubles per attempt starting at `backoff_base_ms`, with ±25 % jitter,
/// capped at 60 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, YoutubeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, YoutubeError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "YouTube transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn deserialize_err() -> YoutubeError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        YoutubeError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn quota_exceeded_is_not_retriable() {
        assert!(!is_retriable(&YoutubeError::QuotaExceeded(
            "daily limit".to_owned()
        )));
    }

    #[test]
    fn not_found_is_not_retriable() {
        assert!(!is_retriable(&YoutubeError::NotFound("abc".to_owned())));
    }

    #[test]
    fn client_api_error_is_not_retriable_but_server_is() {
        assert!(!is_retriable(&YoutubeError::ApiError {
            code: 400,
            message: "bad".to_owned()
        }));
        assert!(is_retriable(&YoutubeError::ApiError {
            code: 503,
            message: "backend".to_owned()
        }));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!is_retriable(&deserialize_err()));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, YoutubeError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_quota_exceeded() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(YoutubeError::QuotaExceeded("Daily Limit".to_owned()))
            }
        })
        .await;
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "QuotaExceeded must not be retried"
        );
        assert!(matches!(result, Err(YoutubeError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err::<u32, _>(YoutubeError::ApiError {
                        code: 500,
                        message: "internal".to_owned(),
                    })
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(
            calls.load(Ordering::SeqCst),
            3,
            "should have been called 3 times (2 failures + 1 success)"
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(YoutubeError::ApiError {
                    code: 502,
                    message: "bad gateway".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "1 initial + 2 retries");
        assert!(matches!(result, Err(YoutubeError::ApiError { .. })));
    }
}
