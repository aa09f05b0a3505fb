//! Executor configuration.

use std::time::Duration;

use corral_guard::BreakerConfig;

/// Tuning for the worker pool and its fault isolation.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum concurrently running workload lifecycles.
    pub max_workers: usize,
    /// Circuit breaker guarding every runtime call.
    pub breaker: BreakerConfig,
    /// CPU weight granted per priority unit when creating containers.
    /// The engine's convention is 1024 = one full CPU.
    pub cpu_shares_per_priority: i64,
    /// Grace period for stop requests before the engine escalates.
    pub stop_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            breaker: BreakerConfig::default(),
            cpu_shares_per_priority: 512,
            stop_grace: Duration::from_secs(10),
        }
    }
}
