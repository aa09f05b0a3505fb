//! Fair scheduling by least accumulated run-time.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use corral_state::{Workload, WorkloadStatus};
use tracing::{debug, info};

use crate::policy::{Policy, Slice};

struct Entry {
    workload: Workload,
    remaining: Duration,
    /// Cumulative simulated run-time, the fairness criterion.
    run_time: Duration,
}

/// Always grants the next quantum to the workload that has run the least
/// so far; arrival order breaks ties.
pub struct FairPolicy {
    quantum: Duration,
    queue: Mutex<Vec<Entry>>,
}

impl FairPolicy {
    pub fn new(quantum: Duration) -> Self {
        Self {
            quantum,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Grant one quantum to the least-run workload.
    ///
    /// Completed workloads leave the queue. Returns `None` when empty.
    pub fn next_slice(&self) -> Option<Slice> {
        let mut queue = self.queue.lock().expect("fair queue lock poisoned");
        if queue.is_empty() {
            return None;
        }

        // First entry with the least run-time wins, so ties are stable on
        // arrival order.
        let mut least = 0;
        for (i, entry) in queue.iter().enumerate() {
            if entry.run_time < queue[least].run_time {
                least = i;
            }
        }

        let entry = &mut queue[least];
        let ran_for = entry.remaining.min(self.quantum);
        entry.remaining -= ran_for;
        entry.run_time += ran_for;

        let slice = Slice {
            id: entry.workload.id.clone(),
            pid: entry.workload.pid,
            ran_for,
            remaining: entry.remaining,
        };
        if entry.remaining.is_zero() {
            queue.remove(least);
        }
        Some(slice)
    }
}

#[async_trait]
impl Policy for FairPolicy {
    fn add(&self, mut workload: Workload) {
        workload.status = WorkloadStatus::Waiting;
        let remaining = workload.cpu_time.unwrap_or(Duration::ZERO);
        debug!(id = %workload.id, pid = workload.pid, "fair: queued");
        self.queue.lock().expect("fair queue lock poisoned").push(Entry {
            workload,
            remaining,
            run_time: Duration::ZERO,
        });
    }

    async fn run(&self) {
        while let Some(slice) = self.next_slice() {
            info!(
                id = %slice.id,
                ran_for = ?slice.ran_for,
                remaining = ?slice.remaining,
                "fair: slice"
            );
            tokio::time::sleep(slice.ran_for).await;
            if slice.remaining.is_zero() {
                info!(id = %slice.id, "fair: completed");
            }
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().expect("fair queue lock poisoned").len()
    }

    fn name(&self) -> &'static str {
        "fair"
    }
}
