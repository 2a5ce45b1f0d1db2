//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    pages: u64,
}

/// Public health check endpoint.
///
/// Returns basic service health for load balancer probes, plus the number
/// of pages held in the page store.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "sitefront",
        version: env!("CARGO_PKG_VERSION"),
        pages: state.pages.entry_count(),
    })
}
