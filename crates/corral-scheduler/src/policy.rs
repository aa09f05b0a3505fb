//! The common scheduling-policy contract.

use std::time::Duration;

use async_trait::async_trait;
use corral_state::Workload;

/// One quantum of simulated execution granted to a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub id: String,
    pub pid: u32,
    /// How long the workload ran in this slice.
    pub ran_for: Duration,
    /// CPU time still owed after this slice.
    pub remaining: Duration,
}

/// A queueing discipline over admitted workloads.
///
/// Policies are shared between the admission front-end (which enqueues)
/// and either the batch driver (which calls [`run`]) or the executor
/// (which dispatches workloads itself, leaving `run` unused).
///
/// [`run`]: Policy::run
#[async_trait]
pub trait Policy: Send + Sync {
    /// Enqueue a workload. Never blocks.
    fn add(&self, workload: Workload);

    /// Drive every queued workload through its simulated CPU time.
    ///
    /// Only meaningful in standalone batch mode; sleeps per quantum or
    /// per remaining CPU time.
    async fn run(&self);

    /// Number of workloads currently queued.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable policy name for telemetry labels.
    fn name(&self) -> &'static str;
}
