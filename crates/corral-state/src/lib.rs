//! corral-state — workload records and shared control-plane state.
//!
//! Everything here is in-memory: the orchestrator makes no durability
//! promises across restarts. The crate provides:
//!
//! - [`Workload`] — the unit of scheduled work, with lifecycle timestamps
//! - [`WorkloadStore`] — thread-safe ID → record mapping with status
//!   transition stamping
//! - [`MemoryManager`] — global memory budget plus named control groups
//! - [`PidAllocator`] — monotonic unique process numbers
//!
//! All handles are cheaply cloneable and safe to share across tasks.

pub mod memory;
pub mod pid;
pub mod store;
pub mod types;

pub use memory::{ControlGroup, MemoryManager};
pub use pid::PidAllocator;
pub use store::WorkloadStore;
pub use types::{epoch_ms, Workload, WorkloadId, WorkloadKind, WorkloadStatus};
