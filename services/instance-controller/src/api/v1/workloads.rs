//! Workload endpoints.
//!
//! Stand-in for the scheduler: report the address assigned to a workload, or
//! report that it terminated.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use ic_api::{ObjectKey, WorkloadStatus};
use tracing::info;

use crate::api::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{name}", get(get_workload).delete(delete_workload))
        .route("/{name}/status", put(update_workload_status))
}

async fn get_workload(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let workload = state
        .store()
        .get_workload(&ObjectKey::new(namespace, name))
        .await?;
    Ok(Json(workload))
}

async fn update_workload_status(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(status): Json<WorkloadStatus>,
) -> Result<impl IntoResponse, ApiError> {
    let key = ObjectKey::new(namespace, name);
    let mut workload = state.store().get_workload(&key).await?;
    workload.status = status;

    let workload = state.store().update_workload(workload).await?;
    info!(
        workload = %key,
        phase = ?workload.status.phase,
        ip = %workload.status.ip,
        "Workload status reported"
    );
    Ok(Json(workload))
}

async fn delete_workload(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = ObjectKey::new(namespace, name);
    state.store().delete_workload(&key).await?;
    info!(workload = %key, "Workload terminated");
    Ok(StatusCode::NO_CONTENT)
}
