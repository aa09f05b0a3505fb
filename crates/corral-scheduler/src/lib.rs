//! corral-scheduler — queueing disciplines for admitted workloads.
//!
//! Five policies implement the common [`Policy`] contract:
//!
//! | Policy | Selection | Preemption |
//! |---|---|---|
//! | [`FifoPolicy`] | Arrival order | None |
//! | [`RoundRobinPolicy`] | Rotate head, consume one quantum | Time-slice |
//! | [`PriorityPolicy`] | Stable sort ascending by priority | None |
//! | [`FairPolicy`] | Least accumulated run-time first | Quantum-based |
//! | [`MultilevelPolicy`] | `vm` → sub-policy A, rest → sub-policy B | Delegated |
//!
//! `add` never blocks. `run` drives the queue through simulated CPU time
//! (used by batch mode); when an executor dispatches workloads, `run` is
//! simply never invoked. The quantum-sliced policies factor their stepping
//! into `next_slice`, so ordering is testable without sleeping.
//!
//! [`classify_workload`] and [`choose_policy`] implement the admission
//! front-end's auto-pick rule over a workload manifest.

pub mod classify;
pub mod fair;
pub mod fifo;
pub mod multilevel;
pub mod policy;
pub mod priority;
pub mod round_robin;

pub use classify::{choose_policy, classify_workload};
pub use fair::FairPolicy;
pub use fifo::FifoPolicy;
pub use multilevel::MultilevelPolicy;
pub use policy::{Policy, Slice};
pub use priority::PriorityPolicy;
pub use round_robin::RoundRobinPolicy;
