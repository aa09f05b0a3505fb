//! The container runtime driver interface.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Descriptor handed to the runtime when creating a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    /// Memory limit in MB; the driver translates to engine units.
    pub memory_mb: u64,
    /// CPU weight (1024 = one full CPU).
    pub cpu_shares: i64,
}

/// One entry from a container listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
}

/// Detailed container state from an inspect call.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInspect {
    pub id: String,
    pub image: String,
    pub state: String,
    pub exit_code: Option<i64>,
    pub started_at_ms: Option<u64>,
}

/// One statistics sample for a running container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerStatsSample {
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub memory_limit_bytes: u64,
    pub memory_percent: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
    pub pids: u64,
}

/// External collaborator that materializes containers from descriptors.
///
/// Every operation is asynchronous and cancellable by dropping the
/// returned future; `stop_container` additionally takes the grace period
/// after which the engine escalates.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container and return its runtime handle.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Block until the container exits; returns its exit code.
    async fn wait_container(&self, id: &str) -> Result<i64>;

    /// Gracefully stop a running container, escalating after `timeout`.
    async fn stop_container(&self, id: &str, timeout: Duration) -> Result<()>;

    /// Remove a container. Callers treat failures as best-effort.
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Fetch the container's collected log output.
    async fn container_logs(&self, id: &str) -> Result<String>;

    /// Inspect a container's current state.
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect>;

    /// List running containers.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;

    /// Sample resource statistics for a running container.
    async fn container_stats(&self, id: &str) -> Result<ContainerStatsSample>;
}
