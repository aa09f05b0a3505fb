//! Priority scheduling, lower number = higher priority.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use corral_state::{Workload, WorkloadStatus};
use tracing::{debug, info};

use crate::policy::Policy;

/// Runs workloads to completion in priority order. The sort is stable, so
/// equal priorities keep their arrival order.
#[derive(Default)]
pub struct PriorityPolicy {
    queue: Mutex<Vec<Workload>>,
}

impl PriorityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the queue in priority order (stable on ties).
    pub fn drain_ordered(&self) -> Vec<Workload> {
        let mut queue = self.queue.lock().expect("priority queue lock poisoned");
        let mut drained: Vec<Workload> = queue.drain(..).collect();
        drained.sort_by_key(|w| w.priority);
        drained
    }
}

#[async_trait]
impl Policy for PriorityPolicy {
    fn add(&self, mut workload: Workload) {
        workload.status = WorkloadStatus::Waiting;
        debug!(id = %workload.id, priority = workload.priority, "priority: queued");
        self.queue
            .lock()
            .expect("priority queue lock poisoned")
            .push(workload);
    }

    async fn run(&self) {
        for w in self.drain_ordered() {
            let cpu_time = w.cpu_time.unwrap_or(Duration::ZERO);
            info!(id = %w.id, priority = w.priority, ?cpu_time, "priority: running");
            tokio::time::sleep(cpu_time).await;
            info!(id = %w.id, "priority: completed");
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().expect("priority queue lock poisoned").len()
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}
