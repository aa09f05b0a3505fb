//! API surface regression tests.
//!
//! Drives the router directly with `tower::ServiceExt::oneshot`, backed
//! by the simulated container runtime.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use corral_api::{build_router, ApiState};
use corral_executor::{Executor, ExecutorConfig};
use corral_guard::RateLimiter;
use corral_metrics::Metrics;
use corral_runtime::{ContainerRuntime, SimulatedRuntime};
use corral_scheduler::{FifoPolicy, Policy};
use corral_state::{MemoryManager, PidAllocator, WorkloadStore};

struct Fixture {
    router: Router,
    state: ApiState,
}

fn fixture_with(total_mb: u64, limiter: RateLimiter) -> Fixture {
    let runtime = Arc::new(SimulatedRuntime::with_run_time(Duration::from_millis(2)));
    let store = WorkloadStore::new();
    let metrics = Arc::new(Metrics::new());
    let executor = Arc::new(Executor::new(
        runtime as Arc<dyn ContainerRuntime>,
        store.clone(),
        metrics.clone(),
        ExecutorConfig::default(),
    ));
    let state = ApiState {
        store,
        memory: MemoryManager::new(total_mb),
        pids: Arc::new(PidAllocator::new()),
        policy: Arc::new(FifoPolicy::new()) as Arc<dyn Policy>,
        executor,
        limiter: Arc::new(limiter),
        metrics,
    };
    Fixture {
        router: build_router(state.clone()),
        state,
    }
}

fn fixture(total_mb: u64) -> Fixture {
    fixture_with(total_mb, RateLimiter::new(100.0, 50.0))
}

fn submission(id: &str, memory_mb: u64) -> Request<Body> {
    let body = serde_json::json!({
        "id": id,
        "type": "container",
        "memory_mb": memory_mb,
        "image": "alpine:3.20",
        "command": [],
        "priority": 1,
    });
    Request::builder()
        .method("POST")
        .uri("/api/v1/workloads")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_healthy() {
    let f = fixture(1024);
    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "healthy");
}

#[tokio::test]
async fn submission_returns_created_record() {
    let f = fixture(1024);
    let resp = f.router.clone().oneshot(submission("job-1", 256)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let record = body_json(resp).await;
    assert_eq!(record["id"], "job-1");
    assert_eq!(record["type"], "container");
    assert_eq!(record["status"], "waiting");
    assert!(record["pid"].as_u64().unwrap() > 1000);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let f = fixture(1024);
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/workloads")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_fields_are_bad_request() {
    let f = fixture(1024);
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/workloads")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"id": "x"}"#))
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_workload_is_not_found() {
    let f = fixture(1024);
    let req = Request::builder()
        .uri("/api/v1/workloads/ghost")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admission_under_memory_pressure() {
    // 1024 MB total: a 700 MB workload is admitted, a 400 MB one is
    // refused, and deleting the first frees room for a resubmission.
    let f = fixture(1024);

    let resp = f.router.clone().oneshot(submission("a", 700)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = f.router.clone().oneshot(submission("b", 400)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INSUFFICIENT_STORAGE);

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/workloads/a")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "deleted");

    let resp = f.router.clone().oneshot(submission("b", 400)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(f.state.memory.used_mb(), 400);
}

#[tokio::test]
async fn delete_frees_memory_and_record() {
    let f = fixture(1024);
    let resp = f.router.clone().oneshot(submission("gone", 512)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(f.state.memory.used_mb(), 512);

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/workloads/gone")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(f.state.memory.used_mb(), 0);

    let req = Request::builder()
        .uri("/api/v1/workloads/gone")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_is_not_found() {
    let f = fixture(1024);
    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/workloads/ghost")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_all_records() {
    let f = fixture(1024);
    for id in ["l1", "l2", "l3"] {
        let resp = f.router.clone().oneshot(submission(id, 64)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let req = Request::builder()
        .uri("/api/v1/workloads")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn rate_limit_rejects_when_bucket_empties() {
    // Two-token bucket with a negligible refill rate: the third request
    // in quick succession must be rejected.
    let f = fixture_with(1024, RateLimiter::new(0.001, 2.0));

    for _ in 0..2 {
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let resp = f.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let resp = f.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn admitted_workload_reaches_terminal_state() {
    let f = fixture(1024);
    let resp = f.router.clone().oneshot(submission("lifecycle", 64)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    f.state.executor.wait().await;
    let record = f.state.store.get("lifecycle").unwrap();
    assert_eq!(record.status, corral_state::WorkloadStatus::Done);
    assert!(record.completed_at_ms.is_some());
}
