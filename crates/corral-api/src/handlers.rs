//! REST API handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use corral_state::{Workload, WorkloadKind, WorkloadStatus};

use crate::ApiState;

/// Workload submission body.
#[derive(Debug, Deserialize)]
pub struct CreateWorkloadRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WorkloadKind,
    pub memory_mb: u64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub priority: i64,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

/// POST /api/v1/workloads
///
/// Admission pipeline: decode → memory reservation → store + scheduler
/// registration → asynchronous dispatch. Lifecycle failures after this
/// point are recorded in the workload record, not in this response.
pub async fn create_workload(
    State(state): State<ApiState>,
    body: Result<Json<CreateWorkloadRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };
    if req.id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "workload id must not be empty");
    }

    let mut workload = Workload::new(req.id, state.pids.next_pid(), req.kind, req.memory_mb);
    workload.image = req.image;
    workload.command = req.command;
    workload.priority = req.priority;

    if !state.memory.allocate(&workload.id, workload.memory_mb) {
        return error_response(StatusCode::INSUFFICIENT_STORAGE, "not enough memory");
    }

    state.store.add(workload.clone());
    state.policy.add(workload.clone());
    state.metrics.set_memory_used_mb(state.memory.used_mb());
    state
        .metrics
        .set_queue_length(state.policy.name(), state.policy.len() as u64);

    info!(id = %workload.id, pid = workload.pid, kind = workload.kind.as_str(), "workload admitted");
    state.executor.execute_async(workload.clone());

    // Respond with the stored record so timestamps are included.
    let record = state.store.get(&workload.id).unwrap_or(workload);
    (StatusCode::CREATED, Json(record)).into_response()
}

/// GET /api/v1/workloads
pub async fn list_workloads(State(state): State<ApiState>) -> Response {
    Json(state.store.get_all()).into_response()
}

/// GET /api/v1/workloads/{id}
pub async fn get_workload(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.store.get(&id) {
        Some(workload) => Json(workload).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "workload not found"),
    }
}

/// DELETE /api/v1/workloads/{id}
///
/// Best-effort stops a running container, frees the memory reservation
/// and removes the record.
pub async fn delete_workload(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Some(workload) = state.store.get(&id) else {
        return error_response(StatusCode::NOT_FOUND, "workload not found");
    };

    if workload.status == WorkloadStatus::Running {
        if let Some(container_id) = &workload.container_id {
            let _ = state.executor.stop_container(container_id).await;
        }
    }

    state.memory.free(&workload.id, workload.memory_mb);
    state.store.delete(&workload.id);
    state.metrics.set_memory_used_mb(state.memory.used_mb());

    info!(id = %workload.id, "workload deleted");
    Json(serde_json::json!({"status": "deleted"})).into_response()
}

/// GET /api/v1/health
pub async fn health() -> Response {
    Json(serde_json::json!({"status": "healthy"})).into_response()
}
