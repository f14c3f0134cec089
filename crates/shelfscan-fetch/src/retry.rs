//! Bounded retry with exponential back-off for structured fetch calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation. Transient
//! errors (see [`FetchError::is_retriable`]) are retried up to a total
//! attempt bound; everything else is returned immediately so the caller can
//! apply its fallback policy. Exhaustion is reported as the last error, not
//! as anything fatal; the caller decides whether to fall back or degrade.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Hard cap on a single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Runs `operation` up to `max_attempts` times total, sleeping between
/// attempts on transient errors.
///
/// Back-off before attempt *k* (1-indexed, k ≥ 2) is
/// `backoff_base_ms × 2^(k−2)`, jittered by ±25 % and capped at 60 s.
///
/// | Failed attempt | Sleep before next |
/// |----------------|-------------------|
/// | 1              | base × 2⁰ ± 25 %  |
/// | 2              | base × 2¹ ± 25 %  |
/// | 3              | base × 2² ± 25 %  |
///
/// Non-retriable errors are returned immediately without consuming further
/// attempts. `max_attempts` of 0 is treated as 1.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-retriable error encountered.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_attempts {
                    return Err(err);
                }
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
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "transient fetch error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn server_error() -> FetchError {
        FetchError::UnexpectedStatus {
            status: 500,
            url: "https://catalog.example/api/v2/products/1".to_owned(),
        }
    }

    fn forbidden() -> FetchError {
        FetchError::UnexpectedStatus {
            status: 403,
            url: "https://catalog.example/api/v2/products/1".to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, FetchError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok::<u32, FetchError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn consumes_exactly_max_attempts_when_always_failing() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(server_error())
            }
        })
        .await;
        assert_eq!(
            calls.load(Ordering::SeqCst),
            3,
            "a persistently failing retriable call must use exactly max_attempts"
        );
        assert!(matches!(
            result,
            Err(FetchError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_non_retriable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(forbidden())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "403 must not be retried");
        assert!(matches!(
            result,
            Err(FetchError::UnexpectedStatus { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn zero_max_attempts_still_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(server_error())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
