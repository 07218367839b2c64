use std::time::{Duration, Instant};

use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker - guards the partitioned-transport producer
// ============================================================================
//
// Closed: calls pass through. Open: calls are rejected without touching the
// broker. HalfOpen: a probe window after the recovery timeout; enough
// successes close the circuit, any failure reopens it.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long to reject calls before probing again.
    pub recovery_timeout: Duration,
    /// Successes in half-open needed to close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
pub enum CircuitError<E> {
    Open,
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitError::Open => write!(f, "circuit is open"),
            CircuitError::Inner(err) => write!(f, "{err}"),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitError<E> {}

struct Tracker {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    tracker: Mutex<Tracker>,
    config: CircuitConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            tracker: Mutex::new(Tracker {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            }),
            config,
        }
    }

    /// Run `operation` if the circuit allows it, recording the outcome.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut tracker = self.tracker.lock().await;
            if tracker.state == CircuitState::Open {
                match tracker.opened_at.map(|at| at.elapsed()) {
                    Some(elapsed) if elapsed >= self.config.recovery_timeout => {
                        tracing::info!("circuit half-open, probing");
                        tracker.state = CircuitState::HalfOpen;
                        tracker.successes = 0;
                    }
                    _ => return Err(CircuitError::Open),
                }
            }
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(CircuitError::Inner(err))
            }
        }
    }

    async fn on_success(&self) {
        let mut tracker = self.tracker.lock().await;
        match tracker.state {
            CircuitState::HalfOpen => {
                tracker.successes += 1;
                if tracker.successes >= self.config.success_threshold {
                    tracing::info!(successes = tracker.successes, "circuit closed");
                    tracker.state = CircuitState::Closed;
                    tracker.failures = 0;
                    tracker.successes = 0;
                    tracker.opened_at = None;
                }
            }
            CircuitState::Closed => tracker.failures = 0,
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut tracker = self.tracker.lock().await;
        tracker.failures += 1;
        tracker.opened_at = Some(Instant::now());

        match tracker.state {
            CircuitState::Closed if tracker.failures >= self.config.failure_threshold => {
                tracing::warn!(failures = tracker.failures, "circuit opened");
                tracker.state = CircuitState::Open;
            }
            CircuitState::HalfOpen => {
                tracing::warn!("probe failed, circuit reopened");
                tracker.state = CircuitState::Open;
                tracker.successes = 0;
            }
            _ => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.tracker.lock().await.state
    }

    pub async fn reset(&self) {
        let mut tracker = self.tracker.lock().await;
        tracker.state = CircuitState::Closed;
        tracker.failures = 0;
        tracker.successes = 0;
        tracker.opened_at = None;
    }
}
