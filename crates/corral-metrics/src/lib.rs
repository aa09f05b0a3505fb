//! corral-metrics — operational telemetry for the control plane.
//!
//! A process-wide [`Metrics`] registry collects the orchestrator's
//! series — workload lifecycle counters, the memory gauge, per-policy
//! queue lengths, duration histograms and per-container resource
//! gauges — and renders them in the Prometheus text exposition format.
//!
//! The registry is plain atomics and mutex-guarded maps; scraping renders
//! directly from live state, there is no snapshot pipeline in between.

pub mod exposition;
pub mod registry;

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

pub use registry::{ContainerUsage, Histogram, Metrics};

/// Build the telemetry router, served on its own port.
pub fn telemetry_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .with_state(metrics)
}

async fn serve_metrics(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}
