//! Timeout-bounded, cancellable collaborator calls
//!
//! A call that exceeds its timeout is retried with exponential backoff up to
//! `max_retries` more times. Collaborator errors are not retried: a failed
//! compile fails the same way twice.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use gantry_config::RunSettings;
use tokio_util::sync::CancellationToken;

use crate::collaborators::CollaboratorResult;
use crate::error::CollaboratorError;

/// Timeout and retry budget for one kind of call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Policy for capability collaborators (compile, instrument, publish)
    pub fn capability(settings: &RunSettings) -> Self {
        Self {
            timeout: settings.capability_timeout,
            max_retries: settings.max_retries,
            initial_backoff: settings.retry_initial_backoff,
        }
    }

    /// Policy for gate metric fetches (test runs)
    pub fn gate(settings: &RunSettings) -> Self {
        Self {
            timeout: settings.gate_timeout,
            max_retries: settings.max_retries,
            initial_backoff: settings.retry_initial_backoff,
        }
    }
}

/// Why a call produced no value
#[derive(Debug)]
pub enum CallFailure {
    /// Every attempt timed out
    TimedOut { attempts: u32 },
    Cancelled,
    Failed(CollaboratorError),
}

/// Run `call` under `policy`, stopping early when `cancel` fires.
pub async fn call_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut call: F,
) -> Result<T, CallFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CollaboratorResult<T>>,
{
    let mut backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_backoff)
        .with_max_elapsed_time(None)
        .build();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(CallFailure::Cancelled),
            outcome = tokio::time::timeout(policy.timeout, call()) => outcome,
        };

        match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => return Err(CallFailure::Failed(err)),
            Err(_elapsed) if attempts > policy.max_retries => {
                tracing::error!(call = label, attempts, "Call timed out, giving up");
                return Err(CallFailure::TimedOut { attempts });
            }
            Err(_elapsed) => {
                let delay = backoff.next_backoff().unwrap_or(policy.initial_backoff);
                tracing::warn!(call = label, attempts, ?delay, "Call timed out, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(CallFailure::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(50),
            max_retries,
            initial_backoff: Duration::from_millis(10),
        }
    }

    #[rstest]
    #[case::no_retries(0)]
    #[case::one_retry(1)]
    #[case::two_retries(2)]
    #[tokio::test(start_paused = true)]
    async fn slow_call_is_retried_then_gives_up(#[case] max_retries: u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> =
            call_with_retry(policy(max_retries), &CancellationToken::new(), "slow", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        let attempts = max_retries + 1;
        assert!(matches!(result, Err(CallFailure::TimedOut { attempts: n }) if n == attempts));
        assert_eq!(calls.load(Ordering::SeqCst), attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn second_attempt_can_succeed() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = call_with_retry(policy(2), &CancellationToken::new(), "flaky", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(7)
            }
        })
        .await;

        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> =
            call_with_retry(policy(3), &CancellationToken::new(), "broken", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(CollaboratorError::failed("exit 1"))
                }
            })
            .await;

        assert!(matches!(result, Err(CallFailure::Failed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_call() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = call_with_retry(policy(3), &cancel, "cancelled", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CallFailure::Cancelled)));
    }
}
