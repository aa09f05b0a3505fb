//! corral-executor — drives admitted workloads through their container
//! lifecycle.
//!
//! The executor owns a bounded worker pool: at most `max_workers`
//! lifecycles run concurrently, each one stepping through create → start
//! → wait → cleanup with every runtime call wrapped in a process-wide
//! circuit breaker. Failures are classified by the step that raised them
//! and recorded in both the workload record and the failure counters.

pub mod config;
pub mod executor;

pub use config::ExecutorConfig;
pub use executor::{ExecuteError, Executor, FailureStage};
