//! Workload manifest loading.
//!
//! Batch mode consumes a YAML list of workload descriptors:
//!
//! ```yaml
//! - id: train-1
//!   type: task
//!   cpu_time: 2.5s
//!   memory_mb: 256
//!   file_path: jobs/train.py
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use corral_state::WorkloadKind;

/// One declarative workload descriptor from the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WorkloadKind,
    /// Expected CPU time as a duration string (`"2.5s"`, `"500ms"`).
    pub cpu_time: String,
    pub memory_mb: u64,
    #[serde(default)]
    pub file_path: String,
}

/// Load a workload manifest from a YAML file.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let entries: Vec<ManifestEntry> =
        serde_yaml::from_str(&content).context("parsing workload manifest")?;
    Ok(entries)
}

/// Parse a duration string: one or more `<number><unit>` segments with
/// units `ns`, `us`, `ms`, `s`, `m`, `h` (e.g. `"1m30s"`, `"2.5s"`).
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| anyhow::anyhow!("missing unit in duration {input:?}"))?;
        if digits_end == 0 {
            bail!("malformed duration {input:?}");
        }
        let value: f64 = rest[..digits_end]
            .parse()
            .with_context(|| format!("malformed duration {input:?}"))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let seconds = match unit {
            "ns" => value / 1e9,
            "us" | "µs" => value / 1e6,
            "ms" => value / 1e3,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => bail!("unknown duration unit {unit:?} in {input:?}"),
        };
        total += Duration::from_secs_f64(seconds);
    }
    Ok(total)
}
