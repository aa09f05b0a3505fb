//! corral-api — the REST surface of the control plane.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/workloads` | Submit a workload |
//! | GET | `/api/v1/workloads` | List all workloads |
//! | GET | `/api/v1/workloads/{id}` | Get one workload |
//! | DELETE | `/api/v1/workloads/{id}` | Stop, free and delete a workload |
//! | GET | `/api/v1/health` | Liveness probe |
//!
//! Every `/api/v1` request passes the token-bucket rate limiter first.
//! Submission runs the full admission pipeline: rate limit → memory
//! admission → store + scheduler registration → asynchronous dispatch to
//! the executor.

pub mod handlers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{extract::State, Json, Router};

use corral_executor::Executor;
use corral_guard::RateLimiter;
use corral_metrics::Metrics;
use corral_scheduler::Policy;
use corral_state::{MemoryManager, PidAllocator, WorkloadStore};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: WorkloadStore,
    pub memory: MemoryManager,
    pub pids: Arc<PidAllocator>,
    pub policy: Arc<dyn Policy>,
    pub executor: Arc<Executor>,
    pub limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
}

/// Build the `/api/v1` router with rate limiting applied.
pub fn build_router(state: ApiState) -> Router {
    let api = Router::new()
        .route(
            "/workloads",
            get(handlers::list_workloads).post(handlers::create_workload),
        )
        .route(
            "/workloads/{id}",
            get(handlers::get_workload).delete(handlers::delete_workload),
        )
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}

/// Reject requests when the token bucket is empty.
async fn rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.limiter.allow() {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"error": "rate limit exceeded"})),
        )
            .into_response();
    }
    next.run(request).await
}
