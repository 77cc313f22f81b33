//! API v1 routes.

mod instances;
mod workloads;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/namespaces/{namespace}/instances", instances::routes())
        .nest("/namespaces/{namespace}/workloads", workloads::routes())
}
