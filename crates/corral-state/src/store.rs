//! WorkloadStore — thread-safe in-memory workload state.
//!
//! The store owns every workload record; other subsystems operate on cloned
//! snapshots. Status transitions are forward-only, and the store stamps the
//! lifecycle timestamps: creation on insert, start on the transition to
//! running, completion on the transition to a terminal state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::types::{epoch_ms, Workload, WorkloadStatus};

/// Cloneable handle to the shared workload map.
///
/// All operations take the lock for the duration of the map access only;
/// no lock is held across calls into other subsystems.
#[derive(Clone, Default)]
pub struct WorkloadStore {
    inner: Arc<RwLock<HashMap<String, Workload>>>,
}

impl WorkloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a workload, stamping its creation time.
    ///
    /// An existing record under the same ID is replaced.
    pub fn add(&self, mut workload: Workload) {
        workload.created_at_ms = epoch_ms();
        let mut map = self.inner.write().expect("workload store lock poisoned");
        debug!(id = %workload.id, pid = workload.pid, "workload stored");
        map.insert(workload.id.clone(), workload);
    }

    /// Look up a workload by ID, returning a cloned snapshot.
    pub fn get(&self, id: &str) -> Option<Workload> {
        let map = self.inner.read().expect("workload store lock poisoned");
        map.get(id).cloned()
    }

    /// Point-in-time snapshot of every record. Safe to iterate without
    /// further locking.
    pub fn get_all(&self) -> Vec<Workload> {
        let map = self.inner.read().expect("workload store lock poisoned");
        map.values().cloned().collect()
    }

    /// Advance a workload's status.
    ///
    /// Transitions are forward-only; a transition to an equal or earlier
    /// lifecycle stage is refused and leaves the record unchanged. Entering
    /// `running` stamps the start time (once); entering a terminal state
    /// stamps the completion time.
    ///
    /// Returns `false` if the workload is unknown or the transition was
    /// refused.
    pub fn update_status(&self, id: &str, status: WorkloadStatus) -> bool {
        let mut map = self.inner.write().expect("workload store lock poisoned");
        let Some(w) = map.get_mut(id) else {
            return false;
        };
        if status.rank() <= w.status.rank() {
            debug!(id, from = w.status.as_str(), to = status.as_str(), "status transition refused");
            return false;
        }
        w.status = status;
        let now = epoch_ms();
        if status == WorkloadStatus::Running && w.started_at_ms.is_none() {
            w.started_at_ms = Some(now);
        }
        if status.is_terminal() {
            w.completed_at_ms = Some(now);
        }
        debug!(id, status = status.as_str(), "workload status updated");
        true
    }

    /// Record the runtime handle assigned to a workload.
    pub fn set_container_id(&self, id: &str, container_id: &str) -> bool {
        let mut map = self.inner.write().expect("workload store lock poisoned");
        match map.get_mut(id) {
            Some(w) => {
                w.container_id = Some(container_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Remove a workload record. Returns `true` if it existed.
    pub fn delete(&self, id: &str) -> bool {
        let mut map = self.inner.write().expect("workload store lock poisoned");
        let existed = map.remove(id).is_some();
        if existed {
            debug!(id, "workload deleted");
        }
        existed
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("workload store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
