//! Container discovery — periodic statistics sampling.
//!
//! The sampler polls the runtime for all running containers on a fixed
//! interval, exports each container's resource usage as labelled gauges,
//! prunes series for containers that have gone away, and keeps a
//! queryable snapshot map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use corral_metrics::{ContainerUsage, Metrics};

use crate::driver::{ContainerRuntime, ContainerStatsSample};

/// Latest observation for one discovered container.
#[derive(Debug, Clone)]
pub struct ContainerObservation {
    pub id: String,
    pub name: String,
    pub image: String,
    pub stats: ContainerStatsSample,
}

/// Polls runtime statistics for every running container.
pub struct ContainerSampler {
    runtime: Arc<dyn ContainerRuntime>,
    metrics: Arc<Metrics>,
    interval: Duration,
    observed: Mutex<HashMap<String, ContainerObservation>>,
}

impl ContainerSampler {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, metrics: Arc<Metrics>, interval: Duration) -> Self {
        Self {
            runtime,
            metrics,
            interval,
            observed: Mutex::new(HashMap::new()),
        }
    }

    /// Run the discovery loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.interval, "container discovery started");
        // Initial scan before the first tick.
        self.sample_once().await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await; // The first tick fires immediately; already scanned.

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sample_once().await,
                _ = shutdown.changed() => {
                    info!("container discovery stopped");
                    return;
                }
            }
        }
    }

    /// One discovery pass: list containers, sample stats, prune the gone.
    pub async fn sample_once(&self) {
        let containers = match self.runtime.list_containers().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "container listing failed");
                return;
            }
        };

        let mut seen: HashMap<String, ContainerObservation> = HashMap::new();
        for summary in &containers {
            let stats = match self.runtime.container_stats(&summary.id).await {
                Ok(stats) => stats,
                Err(e) => {
                    debug!(id = %summary.id, error = %e, "container stats unavailable");
                    continue;
                }
            };

            self.metrics.set_container_usage(
                &summary.name,
                &summary.image,
                ContainerUsage {
                    cpu_percent: stats.cpu_percent,
                    memory_bytes: stats.memory_bytes,
                    memory_percent: stats.memory_percent,
                    network_rx_bytes: stats.network_rx_bytes,
                    network_tx_bytes: stats.network_tx_bytes,
                    block_read_bytes: stats.block_read_bytes,
                    block_write_bytes: stats.block_write_bytes,
                    pids: stats.pids,
                },
            );
            seen.insert(
                summary.id.clone(),
                ContainerObservation {
                    id: summary.id.clone(),
                    name: summary.name.clone(),
                    image: summary.image.clone(),
                    stats,
                },
            );
        }

        // Drop series for containers that are no longer running.
        {
            let mut observed = self.observed.lock().expect("sampler lock poisoned");
            for (id, gone) in observed.iter() {
                if !seen.contains_key(id) {
                    self.metrics.remove_container(&gone.name, &gone.image);
                }
            }
            *observed = seen;
        }

        self.metrics.set_discovered_containers(containers.len() as u64);
    }

    /// Snapshot of every discovered container.
    pub fn all_stats(&self) -> Vec<ContainerObservation> {
        let observed = self.observed.lock().expect("sampler lock poisoned");
        observed.values().cloned().collect()
    }

    /// Latest observation for a specific container.
    pub fn stats(&self, id: &str) -> Option<ContainerObservation> {
        let observed = self.observed.lock().expect("sampler lock poisoned");
        observed.get(id).cloned()
    }
}
