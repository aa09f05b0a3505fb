//! Domain types for the Corral control plane.
//!
//! [`Workload`] is the record shared by the store, the scheduler policies
//! and the executor. It is serializable to JSON for the REST surface;
//! the simulation-only `cpu_time` field stays off the wire.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique identifier for a workload (externally supplied).
pub type WorkloadId = String;

/// What a workload materializes as. The control plane treats this as an
/// opaque tag except for multilevel routing (`vm` vs. the rest) and
/// telemetry labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Container,
    Task,
    Vm,
    Notebook,
}

impl WorkloadKind {
    /// Stable label used in metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Container => "container",
            WorkloadKind::Task => "task",
            WorkloadKind::Vm => "vm",
            WorkloadKind::Notebook => "notebook",
        }
    }
}

/// Lifecycle status of a workload.
///
/// Transitions are monotonically forward: `waiting → running → {done, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Waiting,
    Running,
    Done,
    Failed,
}

impl WorkloadStatus {
    /// Whether this status ends the lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkloadStatus::Done | WorkloadStatus::Failed)
    }

    /// Position in the forward-only transition order.
    pub(crate) fn rank(self) -> u8 {
        match self {
            WorkloadStatus::Waiting => 0,
            WorkloadStatus::Running => 1,
            WorkloadStatus::Done | WorkloadStatus::Failed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadStatus::Waiting => "waiting",
            WorkloadStatus::Running => "running",
            WorkloadStatus::Done => "done",
            WorkloadStatus::Failed => "failed",
        }
    }
}

/// A unit of scheduled work with a resource request and runtime descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub id: WorkloadId,
    /// Monotonically assigned process number (see [`crate::PidAllocator`]).
    pub pid: u32,
    #[serde(rename = "type")]
    pub kind: WorkloadKind,
    /// Memory request in MB; reserved for the lifetime of the record.
    pub memory_mb: u64,
    /// Scheduling priority, lower = higher.
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Expected CPU time. Only the simulation schedulers read this; it is
    /// not part of the wire record.
    #[serde(skip)]
    pub cpu_time: Option<Duration>,
    pub status: WorkloadStatus,
    /// Runtime handle, assigned after container creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    /// Epoch milliseconds, stamped by the store on insert.
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl Workload {
    /// Build a new waiting workload with the given identity and request.
    pub fn new(id: impl Into<String>, pid: u32, kind: WorkloadKind, memory_mb: u64) -> Self {
        Self {
            id: id.into(),
            pid,
            kind,
            memory_mb,
            priority: 0,
            image: None,
            command: Vec::new(),
            file_path: None,
            cpu_time: None,
            status: WorkloadStatus::Waiting,
            container_id: None,
            created_at_ms: 0,
            started_at_ms: None,
            completed_at_ms: None,
        }
    }
}

/// Current Unix epoch in milliseconds.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ranks_are_forward_only() {
        assert!(WorkloadStatus::Waiting.rank() < WorkloadStatus::Running.rank());
        assert!(WorkloadStatus::Running.rank() < WorkloadStatus::Done.rank());
        assert_eq!(WorkloadStatus::Done.rank(), WorkloadStatus::Failed.rank());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!WorkloadStatus::Waiting.is_terminal());
        assert!(!WorkloadStatus::Running.is_terminal());
        assert!(WorkloadStatus::Done.is_terminal());
        assert!(WorkloadStatus::Failed.is_terminal());
    }

    #[test]
    fn workload_serializes_without_simulation_fields() {
        let w = Workload::new("job-1", 1001, WorkloadKind::Container, 256);
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["type"], "container");
        assert_eq!(json["status"], "waiting");
        assert!(json.get("cpu_time").is_none());
        assert!(json.get("started_at_ms").is_none());
    }

    #[test]
    fn workload_round_trips_through_json() {
        let mut w = Workload::new("job-2", 1002, WorkloadKind::Vm, 512);
        w.image = Some("alpine:3.20".to_string());
        w.command = vec!["sleep".to_string(), "1".to_string()];
        let json = serde_json::to_string(&w).unwrap();
        let back: Workload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn epoch_ms_is_recent() {
        // After 2024-01-01.
        assert!(epoch_ms() > 1_704_067_200_000);
    }
}
