//! Instance endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use ic_api::{Instance, InstanceMetadata, InstanceSpec, InstanceState, ObjectKey};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_instances).post(create_instance))
        .route("/{name}", get(get_instance).delete(delete_instance))
        .route("/{name}/status", put(update_instance_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub spec: InstanceSpec,
}

/// Status report from the running application. Absent fields are left
/// unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub state: Option<InstanceState>,
    #[serde(default)]
    pub metadata: Option<InstanceMetadata>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

async fn list_instances(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let items: Vec<Instance> = state
        .store()
        .list_instances()
        .await?
        .into_iter()
        .filter(|i| i.metadata.namespace == namespace)
        .collect();
    Ok(Json(ListResponse { items }))
}

async fn create_instance(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Json(req): Json<CreateInstanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::bad_request("invalid_name", "name is required"));
    }

    let mut instance = Instance::new(namespace, req.name, req.spec.template);
    instance.metadata.labels = req.labels;
    instance.metadata.annotations = req.annotations;

    let instance = state.store().create_instance(instance).await?;
    info!(instance = %instance.key(), "Instance created");
    Ok((StatusCode::CREATED, Json(instance)))
}

async fn get_instance(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let instance = state
        .store()
        .get_instance(&ObjectKey::new(namespace, name))
        .await?;
    Ok(Json(instance))
}

async fn delete_instance(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = ObjectKey::new(namespace, name);
    state.store().delete_instance(&key).await?;
    info!(instance = %key, "Instance deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a status report and publish a state-changed event when the
/// lifecycle state or the opaque application state moved.
async fn update_instance_status(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = ObjectKey::new(namespace, name);
    let mut instance = state.store().get_instance(&key).await?;

    if instance.uid().is_none() || instance.status.state.is_none() {
        return Err(ApiError::conflict(
            "not_initialized",
            format!("instance {key} has not been initialized yet"),
        ));
    }

    let old_state = instance.status.state;
    let old_opaque = instance.status.metadata.state.clone();

    if let Some(next) = req.state {
        instance
            .status
            .advance_to(next)
            .map_err(|e| ApiError::conflict("invalid_state_transition", e.to_string()))?;
    }
    if let Some(metadata) = req.metadata {
        instance.status.metadata = metadata;
    }

    // Reject what could never be published.
    ic_events::project_instance(&instance)
        .map_err(|e| ApiError::bad_request("malformed_state", e.to_string()))?;

    let instance = state.store().update_instance(instance).await?;

    if instance.status.state != old_state || instance.status.metadata.state != old_opaque {
        info!(
            instance = %key,
            from = ?old_state,
            to = ?instance.status.state,
            "Instance state changed"
        );
        if let Err(e) = state
            .emitter()
            .instance_state_changed(
                &instance,
                old_opaque.as_bytes(),
                instance.status.metadata.state.as_bytes(),
            )
            .await
        {
            warn!(instance = %key, error = %e, "Dropping state-changed event");
        }
    }

    Ok(Json(instance))
}
