//! Three-state circuit breaker.
//!
//! ```text
//!   Closed ──(max_failures consecutive failures)──> Open
//!   Open ──(reset_timeout elapsed, next call)──> HalfOpen
//!   HalfOpen ──(success)──> Closed
//!   HalfOpen ──(failure)──> Open
//! ```
//!
//! State transitions are serialized under a lock; the wrapped operation
//! executes outside it, so slow downstream calls never block other
//! callers' state checks.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Breaker tuning. Defaults match the executor's contract: open after
/// 5 consecutive failures, probe again after 30 seconds.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub max_failures: u32,
    /// How long the circuit stays open before a probe is allowed.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation, calls pass through.
    Closed,
    /// Short-circuiting: calls fail fast with [`GuardError::CircuitOpen`].
    Open,
    /// Probing: the next call decides between `Closed` and `Open`.
    HalfOpen,
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The circuit is open; the operation was not invoked.
    #[error("circuit breaker is open")]
    CircuitOpen,
    /// The operation ran and failed; the failure is counted and propagated.
    #[error("{0}")]
    Inner(E),
}

struct BreakerCore {
    state: BreakerState,
    failures: u32,
    last_failure: Option<Instant>,
}

/// Shared circuit breaker. One instance typically guards one downstream
/// dependency process-wide.
pub struct CircuitBreaker {
    config: BreakerConfig,
    core: Mutex<BreakerCore>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            core: Mutex::new(BreakerCore {
                state: BreakerState::Closed,
                failures: 0,
                last_failure: None,
            }),
        }
    }

    /// Run `op` under breaker protection.
    ///
    /// When the circuit is open and the reset timeout has not elapsed, the
    /// operation is not invoked and [`GuardError::CircuitOpen`] is
    /// returned. A success in the half-open state closes the circuit and
    /// zeroes the failure count; any failure is counted and, at the
    /// threshold, opens the circuit.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut core = self.core.lock().expect("breaker lock poisoned");
            if core.state == BreakerState::Open {
                let elapsed_past_timeout = core
                    .last_failure
                    .is_some_and(|at| at.elapsed() > self.config.reset_timeout);
                if elapsed_past_timeout {
                    core.state = BreakerState::HalfOpen;
                    debug!("circuit breaker half-open, probing");
                } else {
                    return Err(GuardError::CircuitOpen);
                }
            }
        }

        let result = op().await;

        let mut core = self.core.lock().expect("breaker lock poisoned");
        match result {
            Ok(value) => {
                if core.state == BreakerState::HalfOpen {
                    debug!("circuit breaker closed after successful probe");
                }
                core.state = BreakerState::Closed;
                core.failures = 0;
                Ok(value)
            }
            Err(err) => {
                core.failures += 1;
                core.last_failure = Some(Instant::now());
                if core.failures >= self.config.max_failures {
                    if core.state != BreakerState::Open {
                        warn!(failures = core.failures, "circuit breaker opened");
                    }
                    core.state = BreakerState::Open;
                } else if core.state == BreakerState::HalfOpen {
                    // A failed probe re-opens immediately.
                    core.state = BreakerState::Open;
                }
                Err(GuardError::Inner(err))
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        self.core.lock().expect("breaker lock poisoned").state
    }

    pub fn failure_count(&self) -> u32 {
        self.core.lock().expect("breaker lock poisoned").failures
    }
}
