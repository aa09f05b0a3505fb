//! corral-runtime — the seam to the container runtime.
//!
//! The control plane never talks to a container engine directly; it goes
//! through the [`ContainerRuntime`] trait. Production deployments plug in
//! an engine-backed driver; tests and dry-run mode use the in-process
//! [`SimulatedRuntime`], which materializes containers as clocked tasks.
//!
//! [`ContainerSampler`] is the discovery loop that polls runtime
//! statistics for every running container and exports them as labelled
//! telemetry series.

pub mod driver;
pub mod sampler;
pub mod sim;

pub use driver::{
    ContainerInspect, ContainerRuntime, ContainerSpec, ContainerStatsSample, ContainerSummary,
};
pub use sampler::{ContainerObservation, ContainerSampler};
pub use sim::SimulatedRuntime;
