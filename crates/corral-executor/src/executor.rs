//! The workload lifecycle driver.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use corral_guard::{CircuitBreaker, GuardError};
use corral_metrics::Metrics;
use corral_runtime::{ContainerRuntime, ContainerSpec};
use corral_state::{Workload, WorkloadStatus, WorkloadStore};

use crate::config::ExecutorConfig;

/// Which lifecycle step a failure originated from. Used as the `reason`
/// label on the failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Create,
    Start,
    Wait,
    Exit,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureStage::Create => "create",
            FailureStage::Start => "start",
            FailureStage::Wait => "wait",
            FailureStage::Exit => "exit",
        }
    }
}

/// Terminal error of one workload lifecycle.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The circuit breaker short-circuited a runtime call.
    #[error("circuit breaker open during {}", .0.as_str())]
    CircuitOpen(FailureStage),
    /// A runtime call ran and failed.
    #[error("container {} failed: {source}", .stage.as_str())]
    Runtime {
        stage: FailureStage,
        source: anyhow::Error,
    },
}

/// Bounded worker pool running workload lifecycles.
///
/// Cheap to share as an `Arc`; `execute_async` spawns a task per workload
/// and `wait` drains everything spawned so far.
pub struct Executor {
    runtime: Arc<dyn ContainerRuntime>,
    store: WorkloadStore,
    metrics: Arc<Metrics>,
    breaker: CircuitBreaker,
    permits: Arc<Semaphore>,
    inflight: Mutex<Vec<JoinHandle<()>>>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: WorkloadStore,
        metrics: Arc<Metrics>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            runtime,
            store,
            metrics,
            breaker: CircuitBreaker::new(config.breaker.clone()),
            permits: Arc::new(Semaphore::new(config.max_workers)),
            inflight: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Run one workload lifecycle to its terminal state.
    ///
    /// Blocks while the worker pool is saturated. The workload record must
    /// already be registered in the store; this only issues status
    /// transitions. Lifecycle failures are recorded in the store and the
    /// failure counters before being returned.
    pub async fn execute(&self, workload: Workload) -> Result<(), ExecuteError> {
        // The pool semaphore is never closed, so acquisition only fails if
        // the executor itself is being torn down; treat that as a no-op.
        let Ok(_permit) = self.permits.acquire().await else {
            return Ok(());
        };

        self.store.update_status(&workload.id, WorkloadStatus::Running);
        self.metrics.inc_running();
        info!(id = %workload.id, pid = workload.pid, "workload running");

        let started = Instant::now();
        let result = self.drive(&workload).await;

        self.metrics
            .observe_duration(workload.kind.as_str(), started.elapsed().as_secs_f64());
        self.metrics.dec_running();
        result
    }

    /// Fire-and-forget variant of [`execute`]; the spawned lifecycle is
    /// tracked and drained by [`wait`].
    ///
    /// [`execute`]: Executor::execute
    /// [`wait`]: Executor::wait
    pub fn execute_async(self: &Arc<Self>, workload: Workload) {
        let executor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let id = workload.id.clone();
            if let Err(e) = executor.execute(workload).await {
                error!(id = %id, error = %e, "workload execution failed");
            }
        });
        self.inflight
            .lock()
            .expect("executor inflight lock poisoned")
            .push(handle);
    }

    /// Block until every lifecycle spawned via [`execute_async`] has
    /// completed.
    ///
    /// [`execute_async`]: Executor::execute_async
    pub async fn wait(&self) {
        loop {
            let drained: Vec<JoinHandle<()>> = {
                let mut inflight = self
                    .inflight
                    .lock()
                    .expect("executor inflight lock poisoned");
                inflight.drain(..).collect()
            };
            if drained.is_empty() {
                return;
            }
            for handle in drained {
                let _ = handle.await;
            }
        }
    }

    /// Gracefully stop a container, giving it the configured grace period.
    pub async fn stop_container(&self, container_id: &str) -> anyhow::Result<()> {
        self.runtime
            .stop_container(container_id, self.config.stop_grace)
            .await
    }

    /// Breaker state, exposed for observability and tests.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    // ── Lifecycle steps ────────────────────────────────────────────

    async fn drive(&self, workload: &Workload) -> Result<(), ExecuteError> {
        let spec = ContainerSpec {
            image: workload.image.clone().unwrap_or_default(),
            command: workload.command.clone(),
            memory_mb: workload.memory_mb,
            cpu_shares: workload.priority * self.config.cpu_shares_per_priority,
        };

        let container_id = match self
            .breaker
            .call(|| self.runtime.create_container(&spec))
            .await
        {
            Ok(id) => id,
            Err(e) => return Err(self.fail(workload, FailureStage::Create, e)),
        };
        self.store.set_container_id(&workload.id, &container_id);

        let startup = Instant::now();
        if let Err(e) = self
            .breaker
            .call(|| self.runtime.start_container(&container_id))
            .await
        {
            return Err(self.fail(workload, FailureStage::Start, e));
        }
        self.metrics
            .observe_container_startup(startup.elapsed().as_secs_f64());

        let exit_code = match self
            .breaker
            .call(|| self.runtime.wait_container(&container_id))
            .await
        {
            Ok(code) => code,
            Err(e) => return Err(self.fail(workload, FailureStage::Wait, e)),
        };

        if exit_code == 0 {
            self.store.update_status(&workload.id, WorkloadStatus::Done);
            self.metrics.inc_completed(workload.kind.as_str());
            info!(id = %workload.id, "workload done");
        } else {
            self.store.update_status(&workload.id, WorkloadStatus::Failed);
            self.metrics
                .inc_failure(workload.kind.as_str(), FailureStage::Exit.as_str());
            warn!(id = %workload.id, exit_code, "workload exited non-zero");
        }

        // Cleanup is best-effort and never masks the lifecycle outcome.
        if let Err(e) = self.runtime.remove_container(&container_id).await {
            debug!(id = %workload.id, error = %e, "container removal failed");
        }
        Ok(())
    }

    fn fail(
        &self,
        workload: &Workload,
        stage: FailureStage,
        err: GuardError<anyhow::Error>,
    ) -> ExecuteError {
        self.store.update_status(&workload.id, WorkloadStatus::Failed);
        self.metrics
            .inc_failure(workload.kind.as_str(), stage.as_str());
        match err {
            GuardError::CircuitOpen => {
                warn!(id = %workload.id, stage = stage.as_str(), "circuit breaker open, runtime calls paused");
                ExecuteError::CircuitOpen(stage)
            }
            GuardError::Inner(source) => {
                error!(id = %workload.id, stage = stage.as_str(), error = %source, "runtime call failed");
                ExecuteError::Runtime { stage, source }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_guard::{BreakerConfig, BreakerState};
    use corral_runtime::SimulatedRuntime;
    use corral_state::WorkloadKind;
    use std::time::Duration;

    struct Fixture {
        runtime: Arc<SimulatedRuntime>,
        store: WorkloadStore,
        metrics: Arc<Metrics>,
        executor: Arc<Executor>,
    }

    fn fixture(config: ExecutorConfig) -> Fixture {
        let runtime = Arc::new(SimulatedRuntime::with_run_time(Duration::from_millis(2)));
        let store = WorkloadStore::new();
        let metrics = Arc::new(Metrics::new());
        let executor = Arc::new(Executor::new(
            runtime.clone() as Arc<dyn ContainerRuntime>,
            store.clone(),
            metrics.clone(),
            config,
        ));
        Fixture {
            runtime,
            store,
            metrics,
            executor,
        }
    }

    fn workload(id: &str, command: &[&str]) -> Workload {
        let mut w = Workload::new(id, 1001, WorkloadKind::Container, 64);
        w.image = Some("alpine".to_string());
        w.command = command.iter().map(|s| s.to_string()).collect();
        w
    }

    #[tokio::test]
    async fn successful_lifecycle_ends_done() {
        let f = fixture(ExecutorConfig::default());
        let w = workload("ok-1", &[]);
        f.store.add(w.clone());

        f.executor.execute(w).await.unwrap();

        let record = f.store.get("ok-1").unwrap();
        assert_eq!(record.status, WorkloadStatus::Done);
        assert!(record.container_id.is_some());
        assert!(record.completed_at_ms.unwrap() >= record.started_at_ms.unwrap());
        assert_eq!(f.metrics.running(), 0);
        // The container was removed in cleanup.
        assert_eq!(f.runtime.container_count(), 0);
    }

    #[tokio::test]
    async fn non_zero_exit_ends_failed_with_exit_reason() {
        let f = fixture(ExecutorConfig::default());
        let w = workload("bad-exit", &["exit", "2"]);
        f.store.add(w.clone());

        f.executor.execute(w).await.unwrap();

        assert_eq!(f.store.get("bad-exit").unwrap().status, WorkloadStatus::Failed);
        let failures = f.metrics.render();
        assert!(failures.contains("corral_workload_failures_total{type=\"container\",reason=\"exit\"} 1"));
    }

    #[tokio::test]
    async fn create_failure_is_classified() {
        let f = fixture(ExecutorConfig::default());
        f.runtime.fail_next_creates(1);
        let w = workload("no-create", &[]);
        f.store.add(w.clone());

        let err = f.executor.execute(w).await.unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Runtime {
                stage: FailureStage::Create,
                ..
            }
        ));
        assert_eq!(f.store.get("no-create").unwrap().status, WorkloadStatus::Failed);
    }

    #[tokio::test]
    async fn start_failure_is_classified() {
        let f = fixture(ExecutorConfig::default());
        f.runtime.fail_next_starts(1);
        let w = workload("no-start", &[]);
        f.store.add(w.clone());

        let err = f.executor.execute(w).await.unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Runtime {
                stage: FailureStage::Start,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn wait_failure_is_classified() {
        let f = fixture(ExecutorConfig::default());
        f.runtime.fail_next_waits(1);
        let w = workload("no-wait", &[]);
        f.store.add(w.clone());

        let err = f.executor.execute(w).await.unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Runtime {
                stage: FailureStage::Wait,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn breaker_opens_after_failure_burst() {
        let config = ExecutorConfig {
            breaker: BreakerConfig {
                max_failures: 3,
                reset_timeout: Duration::from_secs(30),
            },
            ..ExecutorConfig::default()
        };
        let f = fixture(config);
        f.runtime.fail_next_creates(3);

        for i in 0..3 {
            let w = workload(&format!("burst-{i}"), &[]);
            f.store.add(w.clone());
            let _ = f.executor.execute(w).await;
        }
        assert_eq!(f.executor.breaker().state(), BreakerState::Open);

        // The next lifecycle short-circuits without touching the runtime.
        let w = workload("quarantined", &[]);
        f.store.add(w.clone());
        let err = f.executor.execute(w).await.unwrap_err();
        assert!(matches!(err, ExecuteError::CircuitOpen(FailureStage::Create)));
        assert_eq!(f.store.get("quarantined").unwrap().status, WorkloadStatus::Failed);
    }

    #[tokio::test]
    async fn worker_pool_bounds_running_workloads() {
        let config = ExecutorConfig {
            max_workers: 2,
            ..ExecutorConfig::default()
        };
        let f = fixture(config);

        for i in 0..3 {
            let w = workload(&format!("held-{i}"), &["hold"]);
            f.store.add(w.clone());
            f.executor.execute_async(w);
        }

        // Two lifecycles hold the only permits; the third stays waiting.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let running: Vec<Workload> = f
            .store
            .get_all()
            .into_iter()
            .filter(|w| w.status == WorkloadStatus::Running)
            .collect();
        assert_eq!(running.len(), 2);
        assert_eq!(f.metrics.running(), 2);

        // Terminating one running container frees a permit for the third.
        let released = running[0].container_id.clone().unwrap();
        f.runtime.finish(&released, 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.metrics.running(), 2);

        // Drain: finish whatever is currently running until all are done.
        for w in f.store.get_all() {
            if let Some(cid) = w.container_id {
                f.runtime.finish(&cid, 0);
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        for w in f.store.get_all() {
            if let Some(cid) = w.container_id {
                f.runtime.finish(&cid, 0);
            }
        }
        f.executor.wait().await;
        assert_eq!(f.metrics.running(), 0);
        for w in f.store.get_all() {
            assert_eq!(w.status, WorkloadStatus::Done, "workload {} not done", w.id);
        }
    }

    #[tokio::test]
    async fn wait_drains_spawned_lifecycles() {
        let f = fixture(ExecutorConfig::default());
        for i in 0..5 {
            let w = workload(&format!("async-{i}"), &[]);
            f.store.add(w.clone());
            f.executor.execute_async(w);
        }
        f.executor.wait().await;
        for w in f.store.get_all() {
            assert_eq!(w.status, WorkloadStatus::Done);
        }
        assert_eq!(f.metrics.running(), 0);
    }

    #[tokio::test]
    async fn stop_container_uses_grace_period() {
        let f = fixture(ExecutorConfig::default());
        let w = workload("stoppable", &["hold"]);
        f.store.add(w.clone());
        f.executor.execute_async(w);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cid = f.store.get("stoppable").unwrap().container_id.unwrap();
        f.executor.stop_container(&cid).await.unwrap();
        f.executor.wait().await;
        // A stopped container reports a non-zero exit, so the workload
        // lands in failed with the exit reason.
        assert_eq!(f.store.get("stoppable").unwrap().status, WorkloadStatus::Failed);
    }
}
