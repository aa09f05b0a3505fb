//! First-in-first-out scheduling.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use corral_state::{Workload, WorkloadStatus};
use tracing::{debug, info};

use crate::policy::Policy;

/// Runs workloads to completion in arrival order, no preemption.
#[derive(Default)]
pub struct FifoPolicy {
    queue: Mutex<VecDeque<Workload>>,
}

impl FifoPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dequeue the next workload in arrival order.
    pub fn next(&self) -> Option<Workload> {
        self.queue.lock().expect("fifo queue lock poisoned").pop_front()
    }
}

#[async_trait]
impl Policy for FifoPolicy {
    fn add(&self, mut workload: Workload) {
        workload.status = WorkloadStatus::Waiting;
        debug!(id = %workload.id, pid = workload.pid, "fifo: queued");
        self.queue
            .lock()
            .expect("fifo queue lock poisoned")
            .push_back(workload);
    }

    async fn run(&self) {
        while let Some(w) = self.next() {
            let cpu_time = w.cpu_time.unwrap_or(Duration::ZERO);
            info!(id = %w.id, pid = w.pid, ?cpu_time, "fifo: running");
            tokio::time::sleep(cpu_time).await;
            info!(id = %w.id, pid = w.pid, "fifo: completed");
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().expect("fifo queue lock poisoned").len()
    }

    fn name(&self) -> &'static str {
        "fifo"
    }
}
