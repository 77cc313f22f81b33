//! Health check endpoints.

use axum::{response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status: "ok".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Current timestamp (RFC 3339).
    pub timestamp: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
}

fn ok() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "instance-controller".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Is the service running? Does not check dependencies.
async fn healthz() -> impl IntoResponse {
    ok()
}

/// Liveness probe.
async fn livez() -> impl IntoResponse {
    ok()
}
