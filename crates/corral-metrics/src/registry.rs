//! The metrics registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

/// Fixed-bucket histogram with a cumulative sum and count.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bounds of each bucket, ascending. An implicit `+Inf` bucket
    /// is always rendered.
    bounds: Vec<f64>,
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

impl Histogram {
    pub fn new(bounds: Vec<f64>) -> Self {
        let counts = vec![0; bounds.len()];
        Self {
            bounds,
            counts,
            sum: 0.0,
            count: 0,
        }
    }

    /// Default buckets for workload durations (seconds).
    pub fn duration_buckets() -> Self {
        Self::new(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    }

    /// Buckets for container startup times (seconds).
    pub fn startup_buckets() -> Self {
        Self::new(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    }

    pub fn observe(&mut self, value: f64) {
        for (i, bound) in self.bounds.iter().enumerate() {
            if value <= *bound {
                self.counts[i] += 1;
            }
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub(crate) fn bucket_counts(&self) -> &[u64] {
        &self.counts
    }

    pub(crate) fn sum(&self) -> f64 {
        self.sum
    }
}

/// Resource usage sampled for one discovered container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerUsage {
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub memory_percent: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
    pub pids: u64,
}

/// Process-wide telemetry registry.
///
/// Label maps are ordered so exposition output is deterministic.
pub struct Metrics {
    /// Gauge: workloads currently running.
    workloads_running: AtomicI64,
    /// Gauge: memory charged against the global pool, in MB.
    memory_used_mb: AtomicU64,
    /// Gauge: containers currently visible to the discovery sampler.
    discovered_containers: AtomicU64,
    /// Counter: completed workloads by type.
    completed: Mutex<BTreeMap<&'static str, u64>>,
    /// Counter: failures by (type, reason).
    failures: Mutex<BTreeMap<(&'static str, &'static str), u64>>,
    /// Gauge: queue length per scheduler policy.
    queue_length: Mutex<BTreeMap<&'static str, u64>>,
    /// Histogram: workload duration per type, in seconds.
    duration_seconds: Mutex<BTreeMap<&'static str, Histogram>>,
    /// Histogram: container startup time in seconds.
    startup_seconds: Mutex<Histogram>,
    /// Gauges: per-container resource usage, keyed by (container, image).
    containers: Mutex<BTreeMap<(String, String), ContainerUsage>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            workloads_running: AtomicI64::new(0),
            memory_used_mb: AtomicU64::new(0),
            discovered_containers: AtomicU64::new(0),
            completed: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(BTreeMap::new()),
            queue_length: Mutex::new(BTreeMap::new()),
            duration_seconds: Mutex::new(BTreeMap::new()),
            startup_seconds: Mutex::new(Histogram::startup_buckets()),
            containers: Mutex::new(BTreeMap::new()),
        }
    }

    // ── Workload lifecycle ─────────────────────────────────────────

    pub fn inc_running(&self) {
        self.workloads_running.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_running(&self) {
        self.workloads_running.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn running(&self) -> i64 {
        self.workloads_running.load(Ordering::Relaxed)
    }

    pub fn inc_completed(&self, kind: &'static str) {
        let mut map = self.completed.lock().expect("metrics lock poisoned");
        *map.entry(kind).or_insert(0) += 1;
    }

    pub fn inc_failure(&self, kind: &'static str, reason: &'static str) {
        let mut map = self.failures.lock().expect("metrics lock poisoned");
        *map.entry((kind, reason)).or_insert(0) += 1;
    }

    pub fn observe_duration(&self, kind: &'static str, seconds: f64) {
        let mut map = self.duration_seconds.lock().expect("metrics lock poisoned");
        map.entry(kind)
            .or_insert_with(Histogram::duration_buckets)
            .observe(seconds);
    }

    pub fn observe_container_startup(&self, seconds: f64) {
        self.startup_seconds
            .lock()
            .expect("metrics lock poisoned")
            .observe(seconds);
    }

    // ── Resources and queues ───────────────────────────────────────

    pub fn set_memory_used_mb(&self, mb: u64) {
        self.memory_used_mb.store(mb, Ordering::Relaxed);
    }

    pub fn set_queue_length(&self, policy: &'static str, len: u64) {
        let mut map = self.queue_length.lock().expect("metrics lock poisoned");
        map.insert(policy, len);
    }

    // ── Container discovery ────────────────────────────────────────

    pub fn set_discovered_containers(&self, count: u64) {
        self.discovered_containers.store(count, Ordering::Relaxed);
    }

    /// Record the latest resource sample for a container.
    pub fn set_container_usage(&self, container: &str, image: &str, usage: ContainerUsage) {
        let mut map = self.containers.lock().expect("metrics lock poisoned");
        map.insert((container.to_string(), image.to_string()), usage);
    }

    /// Drop every series for a container that is no longer running.
    pub fn remove_container(&self, container: &str, image: &str) {
        let mut map = self.containers.lock().expect("metrics lock poisoned");
        map.remove(&(container.to_string(), image.to_string()));
    }

    // ── Snapshot accessors used by the exposition renderer ─────────

    pub(crate) fn snapshot_running(&self) -> i64 {
        self.workloads_running.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot_memory_used_mb(&self) -> u64 {
        self.memory_used_mb.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot_discovered(&self) -> u64 {
        self.discovered_containers.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot_completed(&self) -> BTreeMap<&'static str, u64> {
        self.completed.lock().expect("metrics lock poisoned").clone()
    }

    pub(crate) fn snapshot_failures(&self) -> BTreeMap<(&'static str, &'static str), u64> {
        self.failures.lock().expect("metrics lock poisoned").clone()
    }

    pub(crate) fn snapshot_queue_length(&self) -> BTreeMap<&'static str, u64> {
        self.queue_length.lock().expect("metrics lock poisoned").clone()
    }

    pub(crate) fn snapshot_durations(&self) -> BTreeMap<&'static str, Histogram> {
        self.duration_seconds.lock().expect("metrics lock poisoned").clone()
    }

    pub(crate) fn snapshot_startup(&self) -> Histogram {
        self.startup_seconds.lock().expect("metrics lock poisoned").clone()
    }

    pub(crate) fn snapshot_containers(&self) -> BTreeMap<(String, String), ContainerUsage> {
        self.containers.lock().expect("metrics lock poisoned").clone()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_gauge_tracks_inc_dec() {
        let m = Metrics::new();
        m.inc_running();
        m.inc_running();
        m.dec_running();
        assert_eq!(m.running(), 1);
    }

    #[test]
    fn completed_counts_by_kind() {
        let m = Metrics::new();
        m.inc_completed("task");
        m.inc_completed("task");
        m.inc_completed("vm");
        let snap = m.snapshot_completed();
        assert_eq!(snap["task"], 2);
        assert_eq!(snap["vm"], 1);
    }

    #[test]
    fn failures_count_by_kind_and_reason() {
        let m = Metrics::new();
        m.inc_failure("container", "create");
        m.inc_failure("container", "create");
        m.inc_failure("container", "exit");
        let snap = m.snapshot_failures();
        assert_eq!(snap[&("container", "create")], 2);
        assert_eq!(snap[&("container", "exit")], 1);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let mut h = Histogram::new(vec![1.0, 5.0, 10.0]);
        h.observe(0.5);
        h.observe(3.0);
        h.observe(7.0);
        h.observe(100.0);
        assert_eq!(h.bucket_counts(), &[1, 2, 3]);
        assert_eq!(h.count(), 4);
        assert!((h.sum() - 110.5).abs() < 1e-9);
    }

    #[test]
    fn container_series_can_be_pruned() {
        let m = Metrics::new();
        m.set_container_usage("web-1", "nginx", ContainerUsage::default());
        assert_eq!(m.snapshot_containers().len(), 1);
        m.remove_container("web-1", "nginx");
        assert!(m.snapshot_containers().is_empty());
    }
}
