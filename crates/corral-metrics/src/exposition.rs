//! Prometheus text exposition format.
//!
//! Renders the live registry into the text format scraped by Prometheus
//! or any compatible agent.

use std::fmt::Write as _;

use crate::registry::{Histogram, Metrics};

impl Metrics {
    /// Render every series into the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP corral_workloads_running Number of workloads currently running.\n");
        out.push_str("# TYPE corral_workloads_running gauge\n");
        let _ = writeln!(out, "corral_workloads_running {}", self.snapshot_running());

        out.push_str("# HELP corral_workloads_completed_total Completed workloads by type.\n");
        out.push_str("# TYPE corral_workloads_completed_total counter\n");
        for (kind, count) in self.snapshot_completed() {
            let _ = writeln!(out, "corral_workloads_completed_total{{type=\"{kind}\"}} {count}");
        }

        out.push_str("# HELP corral_workload_failures_total Workload failures by type and reason.\n");
        out.push_str("# TYPE corral_workload_failures_total counter\n");
        for ((kind, reason), count) in self.snapshot_failures() {
            let _ = writeln!(
                out,
                "corral_workload_failures_total{{type=\"{kind}\",reason=\"{reason}\"}} {count}"
            );
        }

        out.push_str("# HELP corral_workload_duration_seconds Workload execution duration by type.\n");
        out.push_str("# TYPE corral_workload_duration_seconds histogram\n");
        for (kind, histogram) in self.snapshot_durations() {
            render_histogram(
                &mut out,
                "corral_workload_duration_seconds",
                &format!("type=\"{kind}\""),
                &histogram,
            );
        }

        out.push_str("# HELP corral_memory_usage_megabytes Memory charged against the global pool.\n");
        out.push_str("# TYPE corral_memory_usage_megabytes gauge\n");
        let _ = writeln!(out, "corral_memory_usage_megabytes {}", self.snapshot_memory_used_mb());

        out.push_str("# HELP corral_scheduler_queue_length Workloads queued per scheduler policy.\n");
        out.push_str("# TYPE corral_scheduler_queue_length gauge\n");
        for (policy, len) in self.snapshot_queue_length() {
            let _ = writeln!(out, "corral_scheduler_queue_length{{scheduler=\"{policy}\"}} {len}");
        }

        out.push_str("# HELP corral_container_startup_seconds Container startup time.\n");
        out.push_str("# TYPE corral_container_startup_seconds histogram\n");
        render_histogram(&mut out, "corral_container_startup_seconds", "", &self.snapshot_startup());

        out.push_str("# HELP corral_discovered_containers Running containers visible to discovery.\n");
        out.push_str("# TYPE corral_discovered_containers gauge\n");
        let _ = writeln!(out, "corral_discovered_containers {}", self.snapshot_discovered());

        let containers = self.snapshot_containers();
        render_container_gauge(&mut out, "corral_container_cpu_percent", "Container CPU usage percentage.", &containers, |u| format!("{:.2}", u.cpu_percent));
        render_container_gauge(&mut out, "corral_container_memory_bytes", "Container memory usage in bytes.", &containers, |u| u.memory_bytes.to_string());
        render_container_gauge(&mut out, "corral_container_memory_percent", "Container memory usage percentage.", &containers, |u| format!("{:.2}", u.memory_percent));
        render_container_gauge(&mut out, "corral_container_network_rx_bytes", "Container network received bytes.", &containers, |u| u.network_rx_bytes.to_string());
        render_container_gauge(&mut out, "corral_container_network_tx_bytes", "Container network transmitted bytes.", &containers, |u| u.network_tx_bytes.to_string());
        render_container_gauge(&mut out, "corral_container_block_read_bytes", "Container block device read bytes.", &containers, |u| u.block_read_bytes.to_string());
        render_container_gauge(&mut out, "corral_container_block_write_bytes", "Container block device written bytes.", &containers, |u| u.block_write_bytes.to_string());
        render_container_gauge(&mut out, "corral_container_pids", "Number of processes in the container.", &containers, |u| u.pids.to_string());

        out
    }
}

fn render_histogram(out: &mut String, name: &str, labels: &str, histogram: &Histogram) {
    let sep = if labels.is_empty() { "" } else { "," };
    for (bound, count) in histogram.bounds().iter().zip(histogram.bucket_counts()) {
        let _ = writeln!(out, "{name}_bucket{{{labels}{sep}le=\"{bound}\"}} {count}");
    }
    let _ = writeln!(out, "{name}_bucket{{{labels}{sep}le=\"+Inf\"}} {}", histogram.count());
    if labels.is_empty() {
        let _ = writeln!(out, "{name}_sum {}", histogram.sum());
        let _ = writeln!(out, "{name}_count {}", histogram.count());
    } else {
        let _ = writeln!(out, "{name}_sum{{{labels}}} {}", histogram.sum());
        let _ = writeln!(out, "{name}_count{{{labels}}} {}", histogram.count());
    }
}

fn render_container_gauge(
    out: &mut String,
    name: &str,
    help: &str,
    containers: &std::collections::BTreeMap<(String, String), crate::ContainerUsage>,
    value: impl Fn(&crate::ContainerUsage) -> String,
) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    for ((container, image), usage) in containers {
        let _ = writeln!(
            out,
            "{name}{{container=\"{container}\",image=\"{image}\"}} {}",
            value(usage)
        );
    }
}
