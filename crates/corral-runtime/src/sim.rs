//! In-process simulated container runtime.
//!
//! Containers are clocked entries: `wait_container` sleeps out the
//! configured run time and then reports the scripted exit code. Two
//! command conventions make tests expressive:
//!
//! - `["exit", "N"]` — the container exits with code N
//! - `["hold"]` — `wait_container` blocks until [`SimulatedRuntime::finish`]
//!   or a stop releases it
//!
//! Failure injection (`fail_next_*`) makes the next N calls of an
//! operation fail, which is how the circuit-breaker paths are exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use crate::driver::{
    ContainerInspect, ContainerRuntime, ContainerSpec, ContainerStatsSample, ContainerSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimState {
    Created,
    Running,
    Exited,
}

struct SimContainer {
    image: String,
    command: Vec<String>,
    memory_limit_mb: u64,
    state: SimState,
    exit_code: Option<i64>,
    released: Arc<Notify>,
}

struct SimCore {
    containers: HashMap<String, SimContainer>,
}

/// Clock-driven stand-in for a container engine.
pub struct SimulatedRuntime {
    core: Mutex<SimCore>,
    next_id: AtomicU64,
    /// Default run time for containers without an explicit script.
    run_time: Duration,
    fail_creates: AtomicU32,
    fail_starts: AtomicU32,
    fail_waits: AtomicU32,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::with_run_time(Duration::from_millis(5))
    }

    /// Use `run_time` as the default simulated execution time.
    pub fn with_run_time(run_time: Duration) -> Self {
        Self {
            core: Mutex::new(SimCore {
                containers: HashMap::new(),
            }),
            next_id: AtomicU64::new(1),
            run_time,
            fail_creates: AtomicU32::new(0),
            fail_starts: AtomicU32::new(0),
            fail_waits: AtomicU32::new(0),
        }
    }

    /// Make the next `n` create calls fail.
    pub fn fail_next_creates(&self, n: u32) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` start calls fail.
    pub fn fail_next_starts(&self, n: u32) {
        self.fail_starts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` wait calls fail.
    pub fn fail_next_waits(&self, n: u32) {
        self.fail_waits.store(n, Ordering::SeqCst);
    }

    /// Force a held container to exit with the given code.
    pub fn finish(&self, id: &str, exit_code: i64) {
        let mut core = self.core.lock().expect("sim runtime lock poisoned");
        if let Some(c) = core.containers.get_mut(id) {
            c.state = SimState::Exited;
            c.exit_code = Some(exit_code);
            c.released.notify_waiters();
        }
    }

    /// Number of containers the runtime currently knows about.
    pub fn container_count(&self) -> usize {
        self.core.lock().expect("sim runtime lock poisoned").containers.len()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn scripted_exit_code(command: &[String]) -> i64 {
        if command.first().map(String::as_str) == Some("exit") {
            command
                .get(1)
                .and_then(|c| c.parse().ok())
                .unwrap_or(0)
        } else {
            0
        }
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for SimulatedRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        if Self::take_failure(&self.fail_creates) {
            bail!("simulated create failure");
        }
        let id = format!("sim-{:08x}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut core = self.core.lock().expect("sim runtime lock poisoned");
        core.containers.insert(
            id.clone(),
            SimContainer {
                image: spec.image.clone(),
                command: spec.command.clone(),
                memory_limit_mb: spec.memory_mb,
                state: SimState::Created,
                exit_code: None,
                released: Arc::new(Notify::new()),
            },
        );
        debug!(%id, image = %spec.image, "sim container created");
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        if Self::take_failure(&self.fail_starts) {
            bail!("simulated start failure");
        }
        let mut core = self.core.lock().expect("sim runtime lock poisoned");
        let c = core
            .containers
            .get_mut(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        c.state = SimState::Running;
        debug!(%id, "sim container started");
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        if Self::take_failure(&self.fail_waits) {
            bail!("simulated wait failure");
        }

        let (held, released, exit_code) = {
            let core = self.core.lock().expect("sim runtime lock poisoned");
            let c = core
                .containers
                .get(id)
                .ok_or_else(|| anyhow!("no such container: {id}"))?;
            if c.state == SimState::Exited {
                return Ok(c.exit_code.unwrap_or(0));
            }
            let held = c.command.first().map(String::as_str) == Some("hold");
            (held, Arc::clone(&c.released), Self::scripted_exit_code(&c.command))
        };

        if held {
            // Block until finish() or stop_container() releases us. The
            // notified future is created before re-checking state so a
            // release between the check and the await is never missed.
            loop {
                let notified = released.notified();
                {
                    let core = self.core.lock().expect("sim runtime lock poisoned");
                    let c = core
                        .containers
                        .get(id)
                        .ok_or_else(|| anyhow!("no such container: {id}"))?;
                    if c.state == SimState::Exited {
                        return Ok(c.exit_code.unwrap_or(0));
                    }
                }
                notified.await;
            }
        }

        tokio::time::sleep(self.run_time).await;

        let mut core = self.core.lock().expect("sim runtime lock poisoned");
        let c = core
            .containers
            .get_mut(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        if c.state != SimState::Exited {
            c.state = SimState::Exited;
            c.exit_code = Some(exit_code);
        }
        Ok(c.exit_code.unwrap_or(0))
    }

    async fn stop_container(&self, id: &str, _timeout: Duration) -> Result<()> {
        let mut core = self.core.lock().expect("sim runtime lock poisoned");
        let c = core
            .containers
            .get_mut(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        c.state = SimState::Exited;
        c.exit_code.get_or_insert(137);
        c.released.notify_waiters();
        debug!(%id, "sim container stopped");
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let mut core = self.core.lock().expect("sim runtime lock poisoned");
        core.containers
            .remove(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        debug!(%id, "sim container removed");
        Ok(())
    }

    async fn container_logs(&self, id: &str) -> Result<String> {
        let core = self.core.lock().expect("sim runtime lock poisoned");
        let c = core
            .containers
            .get(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        Ok(format!("{} {}\n", c.image, c.command.join(" ")))
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect> {
        let core = self.core.lock().expect("sim runtime lock poisoned");
        let c = core
            .containers
            .get(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        Ok(ContainerInspect {
            id: id.to_string(),
            image: c.image.clone(),
            state: match c.state {
                SimState::Created => "created".to_string(),
                SimState::Running => "running".to_string(),
                SimState::Exited => "exited".to_string(),
            },
            exit_code: c.exit_code,
            started_at_ms: None,
        })
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let core = self.core.lock().expect("sim runtime lock poisoned");
        let mut out: Vec<ContainerSummary> = core
            .containers
            .iter()
            .filter(|(_, c)| c.state == SimState::Running)
            .map(|(id, c)| ContainerSummary {
                id: id.clone(),
                name: id.clone(),
                image: c.image.clone(),
                state: "running".to_string(),
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn container_stats(&self, id: &str) -> Result<ContainerStatsSample> {
        let core = self.core.lock().expect("sim runtime lock poisoned");
        let c = core
            .containers
            .get(id)
            .ok_or_else(|| anyhow!("no such container: {id}"))?;
        let memory_limit_bytes = c.memory_limit_mb * 1024 * 1024;
        // Fabricated but stable numbers so sampled series are non-trivial.
        let memory_bytes = memory_limit_bytes / 4;
        Ok(ContainerStatsSample {
            cpu_percent: 1.0,
            memory_bytes,
            memory_limit_bytes,
            memory_percent: 25.0,
            network_rx_bytes: 0,
            network_tx_bytes: 0,
            block_read_bytes: 0,
            block_write_bytes: 0,
            pids: 1,
        })
    }
}
