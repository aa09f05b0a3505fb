//! corrald — the Corral daemon.
//!
//! Two modes:
//!
//! - **serve** — the full control plane: REST API with admission, the
//!   bounded executor, container discovery and a telemetry endpoint on a
//!   separate port.
//! - **batch** — standalone simulation: load a workload manifest, pick a
//!   scheduling policy from the type mix and drive the queue through
//!   simulated CPU time.
//!
//! ```text
//! corrald serve --api-port 8080 --telemetry-port 9090 --memory-mb 4096
//! corrald batch --manifest configs/workloads.yaml --memory-mb 1024
//! ```

mod config;
mod signals;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::{info, warn};

use corral_api::{build_router, ApiState};
use corral_executor::{Executor, ExecutorConfig};
use corral_guard::RateLimiter;
use corral_metrics::{telemetry_router, Metrics};
use corral_runtime::{ContainerRuntime, ContainerSampler, SimulatedRuntime};
use corral_scheduler::{choose_policy, classify_workload, MultilevelPolicy, Policy, PriorityPolicy, RoundRobinPolicy};
use corral_state::{MemoryManager, PidAllocator, Workload, WorkloadStore};

use crate::signals::SignalRouter;

/// How long in-flight lifecycles get to drain on shutdown.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "corrald", about = "Corral workload orchestrator daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST control plane.
    Serve {
        /// API listen port.
        #[arg(long, default_value = "8080")]
        api_port: u16,

        /// Telemetry (metrics) listen port.
        #[arg(long, default_value = "9090")]
        telemetry_port: u16,

        /// Total schedulable memory in MB.
        #[arg(long, default_value = "4096")]
        memory_mb: u64,

        /// Maximum concurrently running workloads.
        #[arg(long, default_value = "4")]
        max_workers: usize,

        /// API rate limit in requests per second.
        #[arg(long, default_value = "100")]
        rate: f64,

        /// API burst capacity.
        #[arg(long, default_value = "50")]
        burst: f64,

        /// Container discovery interval in seconds.
        #[arg(long, default_value = "5")]
        sample_interval: u64,

        /// CPU weight granted per priority unit.
        #[arg(long, default_value = "512")]
        cpu_shares_per_priority: i64,
    },

    /// Simulate a workload manifest without a runtime.
    Batch {
        /// Path to the YAML workload manifest.
        #[arg(long)]
        manifest: PathBuf,

        /// Total schedulable memory in MB.
        #[arg(long, default_value = "1024")]
        memory_mb: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,corrald=debug,corral=debug".parse().expect("valid filter")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            api_port,
            telemetry_port,
            memory_mb,
            max_workers,
            rate,
            burst,
            sample_interval,
            cpu_shares_per_priority,
        } => {
            run_serve(ServeOptions {
                api_port,
                telemetry_port,
                memory_mb,
                max_workers,
                rate,
                burst,
                sample_interval: Duration::from_secs(sample_interval),
                cpu_shares_per_priority,
            })
            .await
        }
        Command::Batch { manifest, memory_mb } => run_batch(&manifest, memory_mb).await,
    }
}

struct ServeOptions {
    api_port: u16,
    telemetry_port: u16,
    memory_mb: u64,
    max_workers: usize,
    rate: f64,
    burst: f64,
    sample_interval: Duration,
    cpu_shares_per_priority: i64,
}

async fn run_serve(opts: ServeOptions) -> anyhow::Result<()> {
    info!("corral daemon starting");

    // ── Subsystems ─────────────────────────────────────────────────

    let metrics = Arc::new(Metrics::new());
    let store = WorkloadStore::new();
    let memory = MemoryManager::new(opts.memory_mb);
    let pids = Arc::new(PidAllocator::new());

    // The engine-backed driver is deployment-specific; the daemon wires
    // the in-process simulated runtime in its place.
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(SimulatedRuntime::new());

    let executor = Arc::new(Executor::new(
        Arc::clone(&runtime),
        store.clone(),
        Arc::clone(&metrics),
        ExecutorConfig {
            max_workers: opts.max_workers,
            cpu_shares_per_priority: opts.cpu_shares_per_priority,
            ..ExecutorConfig::default()
        },
    ));
    info!(max_workers = opts.max_workers, "executor initialized");

    let policy: Arc<dyn Policy> = Arc::new(MultilevelPolicy::new(
        Box::new(RoundRobinPolicy::new(Duration::from_secs(1))),
        Box::new(PriorityPolicy::new()),
    ));
    info!(policy = policy.name(), "scheduler initialized");

    let sampler = Arc::new(ContainerSampler::new(
        Arc::clone(&runtime),
        Arc::clone(&metrics),
        opts.sample_interval,
    ));

    // ── Shutdown wiring ────────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let router = SignalRouter::new();
    for kind in [SignalKind::interrupt(), SignalKind::terminate(), SignalKind::quit()] {
        let shutdown_tx = shutdown_tx.clone();
        router.register(kind, move || {
            let _ = shutdown_tx.send(true);
        });
    }
    router
        .listen_os_signals()
        .context("installing signal streams")?;
    let dispatcher = router
        .start(shutdown_rx.clone())
        .context("signal dispatcher already started")?;

    // ── Background tasks ───────────────────────────────────────────

    let sampler_handle = {
        let sampler = Arc::clone(&sampler);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { sampler.run(shutdown).await })
    };

    let telemetry_handle = {
        let router = telemetry_router(Arc::clone(&metrics));
        let addr = SocketAddr::from(([0, 0, 0, 0], opts.telemetry_port));
        let mut shutdown = shutdown_rx.clone();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("binding telemetry port")?;
        info!(%addr, "telemetry server listening");
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            });
            if let Err(e) = server.await {
                warn!(error = %e, "telemetry server error");
            }
        })
    };

    // ── API server ─────────────────────────────────────────────────

    let api_state = ApiState {
        store,
        memory,
        pids,
        policy,
        executor: Arc::clone(&executor),
        limiter: Arc::new(RateLimiter::new(opts.rate, opts.burst)),
        metrics,
    };
    let api = build_router(api_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], opts.api_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding API port")?;
    info!(%addr, "API server listening");

    let mut api_shutdown = shutdown_rx.clone();
    axum::serve(listener, api)
        .with_graceful_shutdown(async move {
            let _ = api_shutdown.changed().await;
            info!("shutdown signal received");
        })
        .await
        .context("API server failed")?;

    // ── Drain ──────────────────────────────────────────────────────

    if tokio::time::timeout(DRAIN_DEADLINE, executor.wait())
        .await
        .is_err()
    {
        warn!(deadline = ?DRAIN_DEADLINE, "drain deadline exceeded, abandoning in-flight workloads");
    }

    let _ = shutdown_tx.send(true);
    let _ = sampler_handle.await;
    let _ = telemetry_handle.await;
    dispatcher.abort();

    info!("corral daemon stopped");
    Ok(())
}

async fn run_batch(manifest: &std::path::Path, memory_mb: u64) -> anyhow::Result<()> {
    let entries = config::load_manifest(manifest)?;
    info!(workloads = entries.len(), "manifest loaded");

    let memory = MemoryManager::new(memory_mb);
    let metrics = Metrics::new();
    let pids = PidAllocator::new();

    let paths: Vec<String> = entries.iter().map(|e| e.file_path.clone()).collect();
    let policy = choose_policy(&paths);

    let mut accepted: Vec<Workload> = Vec::new();
    for entry in &entries {
        let cpu_time = config::parse_duration(&entry.cpu_time)
            .with_context(|| format!("workload {}", entry.id))?;
        let (_, priority) = classify_workload(&entry.file_path);

        let mut workload = Workload::new(
            entry.id.clone(),
            pids.next_pid(),
            entry.kind,
            entry.memory_mb,
        );
        workload.cpu_time = Some(cpu_time);
        workload.priority = priority;
        workload.file_path = Some(entry.file_path.clone());

        if !memory.allocate(&workload.id, workload.memory_mb) {
            warn!(id = %workload.id, memory_mb = workload.memory_mb, "workload rejected, not enough memory");
            continue;
        }
        metrics.set_memory_used_mb(memory.used_mb());
        metrics.inc_running();
        policy.add(workload.clone());
        accepted.push(workload);
    }
    metrics.set_queue_length(policy.name(), policy.len() as u64);

    info!(policy = policy.name(), accepted = accepted.len(), "running batch simulation");
    policy.run().await;

    for workload in &accepted {
        memory.free(&workload.id, workload.memory_mb);
        metrics.dec_running();
        metrics.inc_completed(workload.kind.as_str());
        metrics.set_memory_used_mb(memory.used_mb());
    }

    info!("all workloads complete");
    Ok(())
}
