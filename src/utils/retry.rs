use std::time::Duration;

use tokio::time::sleep;

// ============================================================================
// Exponential backoff retry
// ============================================================================
//
// Used where a transient failure is worth a second chance, e.g. a store
// write racing a connection drop. Permanent errors (validation, constraint
// violations) short-circuit without sleeping.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Errors that may clear up on their own are transient; retrying anything
/// else just repeats the same failure.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &BackoffPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Transient,
{
    let mut delay = policy.initial_delay;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(label, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_transient() => {
                tracing::error!(label, error = %err, "permanent failure, not retrying");
                return Err(err);
            }
            Err(err) if attempt == policy.max_attempts => {
                tracing::error!(label, attempt, error = %err, "giving up after retries");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    label,
                    attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );
                sleep(delay).await;
                delay = Duration::from_millis(
                    (delay.as_millis() as f64 * policy.multiplier) as u64,
                )
                .min(policy.max_delay);
            }
        }
    }

    unreachable!("loop returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky({})", self.0)
        }
    }

    impl Transient for Flaky {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    fn quick_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(&quick_policy(3), "test", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Flaky(true))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), Flaky> = retry_with_backoff(&quick_policy(5), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Flaky(false))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let result: Result<(), Flaky> =
            retry_with_backoff(&quick_policy(2), "test", || async { Err(Flaky(true)) }).await;
        assert!(result.is_err());
    }
}
