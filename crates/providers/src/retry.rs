//! Bounded retry with a per-attempt timeout.

use crate::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn none(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            timeout,
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or retries run out.
///
/// Each attempt is bounded by `policy.timeout`; expiry is reported as
/// [`ProviderError::Timeout`]. Backoff grows linearly with the attempt number.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(res) => res,
            Err(_) => Err(ProviderError::Timeout(policy.timeout)),
        };
        match outcome {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                debug!(attempt, error = %e, "retrying provider call");
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = call_with_retry(&fast_policy(3), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::RequestFailed("reset".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = call_with_retry(&fast_policy(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Status {
                status: 502,
                body: String::new(),
            })
        })
        .await;
        assert!(matches!(out, Err(ProviderError::Status { status: 502, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = call_with_retry(&fast_policy(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Status {
                status: 401,
                body: "bad key".into(),
            })
        })
        .await;
        assert!(out.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let out: Result<(), _> = call_with_retry(&fast_policy(0), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(out, Err(ProviderError::Timeout(_))));
    }
}
