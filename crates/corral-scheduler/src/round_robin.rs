//! Round-robin scheduling with a fixed time quantum.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use corral_state::{Workload, WorkloadStatus};
use tracing::{debug, info};

use crate::policy::{Policy, Slice};

struct Entry {
    workload: Workload,
    remaining: Duration,
}

/// Rotates the queue head, granting each workload one quantum per turn.
/// A workload with CPU time remaining after its slice re-enters at the
/// tail.
pub struct RoundRobinPolicy {
    quantum: Duration,
    queue: Mutex<VecDeque<Entry>>,
}

impl RoundRobinPolicy {
    pub fn new(quantum: Duration) -> Self {
        Self {
            quantum,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Grant the head workload its next quantum and rotate the queue.
    ///
    /// Returns `None` when the queue is empty. The caller is responsible
    /// for actually spending `ran_for` (the batch driver sleeps; tests
    /// step through slices directly).
    pub fn next_slice(&self) -> Option<Slice> {
        let mut queue = self.queue.lock().expect("round-robin queue lock poisoned");
        let mut entry = queue.pop_front()?;
        let ran_for = entry.remaining.min(self.quantum);
        entry.remaining -= ran_for;

        let slice = Slice {
            id: entry.workload.id.clone(),
            pid: entry.workload.pid,
            ran_for,
            remaining: entry.remaining,
        };
        if entry.remaining > Duration::ZERO {
            queue.push_back(entry);
        }
        Some(slice)
    }
}

#[async_trait]
impl Policy for RoundRobinPolicy {
    fn add(&self, mut workload: Workload) {
        workload.status = WorkloadStatus::Waiting;
        let remaining = workload.cpu_time.unwrap_or(Duration::ZERO);
        debug!(id = %workload.id, pid = workload.pid, "round-robin: queued");
        self.queue
            .lock()
            .expect("round-robin queue lock poisoned")
            .push_back(Entry { workload, remaining });
    }

    async fn run(&self) {
        while let Some(slice) = self.next_slice() {
            info!(
                id = %slice.id,
                pid = slice.pid,
                ran_for = ?slice.ran_for,
                remaining = ?slice.remaining,
                "round-robin: slice"
            );
            tokio::time::sleep(slice.ran_for).await;
            if slice.remaining.is_zero() {
                info!(id = %slice.id, pid = slice.pid, "round-robin: completed");
            }
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().expect("round-robin queue lock poisoned").len()
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_state::WorkloadKind;

    fn workload(id: &str, cpu_ms: u64) -> Workload {
        let mut w = Workload::new(id, 1001, WorkloadKind::Vm, 64);
        w.cpu_time = Some(Duration::from_millis(cpu_ms));
        w
    }

    #[test]
    fn alternates_between_two_workloads() {
        // Quantum 1000ms, both workloads owe 2500ms: the slice order is
        // n1, n2, n1, n2, n1, n2 with remaining times stepping down by a
        // quantum until both hit zero.
        let rr = RoundRobinPolicy::new(Duration::from_millis(1000));
        rr.add(workload("n1", 2500));
        rr.add(workload("n2", 2500));

        let ms = Duration::from_millis;
        let expect = [
            ("n1", ms(1000), ms(1500)),
            ("n2", ms(1000), ms(1500)),
            ("n1", ms(1000), ms(500)),
            ("n2", ms(1000), ms(500)),
            ("n1", ms(500), ms(0)),
            ("n2", ms(500), ms(0)),
        ];
        for (id, ran_for, remaining) in expect {
            let slice = rr.next_slice().unwrap();
            assert_eq!(slice.id, id);
            assert_eq!(slice.ran_for, ran_for);
            assert_eq!(slice.remaining, remaining);
        }
        assert!(rr.next_slice().is_none());
    }

    #[test]
    fn short_workload_finishes_in_one_slice() {
        let rr = RoundRobinPolicy::new(Duration::from_millis(1000));
        rr.add(workload("quick", 300));
        let slice = rr.next_slice().unwrap();
        assert_eq!(slice.ran_for, Duration::from_millis(300));
        assert_eq!(slice.remaining, Duration::ZERO);
        assert!(rr.next_slice().is_none());
    }

    #[test]
    fn zero_cpu_time_completes_immediately() {
        let rr = RoundRobinPolicy::new(Duration::from_millis(1000));
        rr.add(workload("empty", 0));
        let slice = rr.next_slice().unwrap();
        assert_eq!(slice.ran_for, Duration::ZERO);
        assert!(rr.next_slice().is_none());
    }

    #[tokio::test]
    async fn run_drains_the_queue() {
        let rr = RoundRobinPolicy::new(Duration::from_millis(5));
        rr.add(workload("a", 12));
        rr.add(workload("b", 3));
        rr.run().await;
        assert!(rr.is_empty());
    }
}
