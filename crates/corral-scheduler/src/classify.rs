//! Workload classification and automatic policy selection.

use std::path::Path;
use std::time::Duration;

use corral_state::WorkloadKind;
use tracing::info;

use crate::{FairPolicy, MultilevelPolicy, Policy, PriorityPolicy, RoundRobinPolicy};

/// Quantum used by the auto-picked preemptive policies.
const AUTO_QUANTUM: Duration = Duration::from_secs(1);

/// Map a source file path to a workload kind and priority.
///
/// Notebooks need responsiveness and get the highest priority; VM images
/// are batch-friendly and get the lowest.
pub fn classify_workload(file_path: &str) -> (WorkloadKind, i64) {
    let ext = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "ipynb" => (WorkloadKind::Notebook, 0),
        "py" | "sh" => (WorkloadKind::Task, 1),
        "iso" | "qcow2" => (WorkloadKind::Vm, 2),
        _ => (WorkloadKind::Task, 2),
    }
}

/// Pick a scheduling policy from the type distribution of a workload set.
///
/// Notebook-heavy sets get the fair scheduler, VM-heavy sets round-robin,
/// and mixed sets a multilevel composition of round-robin (VMs) over
/// priority (everything else).
pub fn choose_policy(file_paths: &[String]) -> Box<dyn Policy> {
    let mut notebooks = 0usize;
    let mut vms = 0usize;
    let mut tasks = 0usize;
    for path in file_paths {
        match classify_workload(path).0 {
            WorkloadKind::Notebook => notebooks += 1,
            WorkloadKind::Vm => vms += 1,
            _ => tasks += 1,
        }
    }
    info!(notebooks, vms, tasks, "workload types detected");

    if notebooks > vms && notebooks > 0 {
        info!("using fair policy for notebook-heavy workload");
        Box::new(FairPolicy::new(AUTO_QUANTUM))
    } else if vms > tasks && vms > 0 {
        info!("using round-robin policy for vm-heavy workload");
        Box::new(RoundRobinPolicy::new(AUTO_QUANTUM))
    } else {
        info!("using multilevel policy for mixed workload");
        Box::new(MultilevelPolicy::new(
            Box::new(RoundRobinPolicy::new(AUTO_QUANTUM)),
            Box::new(PriorityPolicy::new()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify_workload("analysis.ipynb"), (WorkloadKind::Notebook, 0));
        assert_eq!(classify_workload("train.py"), (WorkloadKind::Task, 1));
        assert_eq!(classify_workload("deploy.sh"), (WorkloadKind::Task, 1));
        assert_eq!(classify_workload("ubuntu.iso"), (WorkloadKind::Vm, 2));
        assert_eq!(classify_workload("disk.qcow2"), (WorkloadKind::Vm, 2));
        assert_eq!(classify_workload("data.csv"), (WorkloadKind::Task, 2));
        assert_eq!(classify_workload("no-extension"), (WorkloadKind::Task, 2));
    }

    #[test]
    fn notebook_heavy_picks_fair() {
        let policy = choose_policy(&paths(&["a.ipynb", "b.ipynb", "c.ipynb", "vm.iso", "t.py"]));
        assert_eq!(policy.name(), "fair");
    }

    #[test]
    fn vm_heavy_picks_round_robin() {
        let policy = choose_policy(&paths(&["a.iso", "b.iso", "c.iso", "t.py"]));
        assert_eq!(policy.name(), "round_robin");
    }

    #[test]
    fn mixed_picks_multilevel() {
        let policy = choose_policy(&paths(&["a.py", "b.py", "vm.iso"]));
        assert_eq!(policy.name(), "multilevel");
    }

    #[test]
    fn empty_set_picks_multilevel() {
        let policy = choose_policy(&[]);
        assert_eq!(policy.name(), "multilevel");
    }
}
