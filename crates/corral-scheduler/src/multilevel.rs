//! Multilevel scheduling: route by workload kind to sub-policies.

use async_trait::async_trait;
use corral_state::{Workload, WorkloadKind};
use tracing::debug;

use crate::policy::Policy;

/// Composes two policies: `vm` workloads go to the VM queue, everything
/// else to the task queue. Execution order within each queue is delegated
/// to the owned sub-policy.
pub struct MultilevelPolicy {
    vm_queue: Box<dyn Policy>,
    task_queue: Box<dyn Policy>,
}

impl MultilevelPolicy {
    pub fn new(vm_queue: Box<dyn Policy>, task_queue: Box<dyn Policy>) -> Self {
        Self { vm_queue, task_queue }
    }
}

#[async_trait]
impl Policy for MultilevelPolicy {
    fn add(&self, workload: Workload) {
        if workload.kind == WorkloadKind::Vm {
            debug!(id = %workload.id, "multilevel: routed to vm queue");
            self.vm_queue.add(workload);
        } else {
            debug!(id = %workload.id, "multilevel: routed to task queue");
            self.task_queue.add(workload);
        }
    }

    async fn run(&self) {
        self.vm_queue.run().await;
        self.task_queue.run().await;
    }

    fn len(&self) -> usize {
        self.vm_queue.len() + self.task_queue.len()
    }

    fn name(&self) -> &'static str {
        "multilevel"
    }
}
