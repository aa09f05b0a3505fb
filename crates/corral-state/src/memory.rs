//! Memory accounting — global budget and named control groups.
//!
//! [`MemoryManager`] answers admission decisions against a single memory
//! dimension. Two interfaces coexist: a global pool charged per workload,
//! and named control groups with their own limits for group-local
//! admission. Both never panic and report failure as `false`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

/// A named resource-limit bucket scoping memory and notional CPU shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlGroup {
    pub name: String,
    /// CPU weight (1024 = one full CPU).
    pub cpu_shares: i64,
    /// Memory limit in MB.
    pub memory_limit_mb: u64,
    /// Current usage in MB.
    pub memory_used_mb: u64,
}

struct Accounts {
    total_mb: u64,
    used_mb: u64,
    groups: HashMap<String, ControlGroup>,
}

/// Cloneable handle to the memory accountant.
///
/// A single mutex serializes the global pool and every group; admission
/// decisions are therefore linearizable.
#[derive(Clone)]
pub struct MemoryManager {
    inner: Arc<Mutex<Accounts>>,
}

impl MemoryManager {
    /// Create an accountant with the given total capacity in MB.
    pub fn new(total_mb: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Accounts {
                total_mb,
                used_mb: 0,
                groups: HashMap::new(),
            })),
        }
    }

    // ── Global pool ────────────────────────────────────────────────

    /// Reserve `mb` from the global pool for `id`.
    ///
    /// Succeeds and charges the pool iff `used + mb ≤ total`; otherwise
    /// returns `false` with no side effect.
    pub fn allocate(&self, id: &str, mb: u64) -> bool {
        let mut acc = self.inner.lock().expect("memory accounts lock poisoned");
        if acc.used_mb + mb > acc.total_mb {
            warn!(
                id,
                requested_mb = mb,
                available_mb = acc.total_mb - acc.used_mb,
                "memory admission refused"
            );
            return false;
        }
        acc.used_mb += mb;
        debug!(id, mb, used_mb = acc.used_mb, total_mb = acc.total_mb, "memory allocated");
        true
    }

    /// Return `mb` to the global pool. Usage is clamped at zero.
    pub fn free(&self, id: &str, mb: u64) {
        let mut acc = self.inner.lock().expect("memory accounts lock poisoned");
        acc.used_mb = acc.used_mb.saturating_sub(mb);
        debug!(id, mb, used_mb = acc.used_mb, total_mb = acc.total_mb, "memory freed");
    }

    pub fn used_mb(&self) -> u64 {
        self.inner.lock().expect("memory accounts lock poisoned").used_mb
    }

    pub fn total_mb(&self) -> u64 {
        self.inner.lock().expect("memory accounts lock poisoned").total_mb
    }

    // ── Named control groups ───────────────────────────────────────

    /// Create (or replace) a control group with its own limits.
    pub fn create_group(&self, name: &str, cpu_shares: i64, memory_limit_mb: u64) {
        let mut acc = self.inner.lock().expect("memory accounts lock poisoned");
        acc.groups.insert(
            name.to_string(),
            ControlGroup {
                name: name.to_string(),
                cpu_shares,
                memory_limit_mb,
                memory_used_mb: 0,
            },
        );
        debug!(group = name, cpu_shares, memory_limit_mb, "control group created");
    }

    /// Reserve `mb` inside a named group. Admission is group-local.
    ///
    /// Returns `false` when the group does not exist or the reservation
    /// would exceed the group's limit.
    pub fn allocate_in(&self, name: &str, mb: u64) -> bool {
        let mut acc = self.inner.lock().expect("memory accounts lock poisoned");
        let Some(group) = acc.groups.get_mut(name) else {
            return false;
        };
        if group.memory_used_mb + mb > group.memory_limit_mb {
            warn!(group = name, requested_mb = mb, limit_mb = group.memory_limit_mb, "group admission refused");
            return false;
        }
        group.memory_used_mb += mb;
        true
    }

    /// Return `mb` to a named group, clamped at zero. Unknown groups are
    /// ignored.
    pub fn free_in(&self, name: &str, mb: u64) {
        let mut acc = self.inner.lock().expect("memory accounts lock poisoned");
        if let Some(group) = acc.groups.get_mut(name) {
            group.memory_used_mb = group.memory_used_mb.saturating_sub(mb);
        }
    }

    /// Snapshot of a named group.
    pub fn get_group(&self, name: &str) -> Option<ControlGroup> {
        let acc = self.inner.lock().expect("memory accounts lock poisoned");
        acc.groups.get(name).cloned()
    }
}
