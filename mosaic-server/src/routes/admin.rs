//! Admin endpoints: /health, /api/stats

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    tracing::debug!("health check requested");
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Server statistics response
#[derive(Serialize)]
pub struct StatsResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Storage type (memory or file)
    pub storage_type: &'static str,
    /// Uploads that produced an artifact
    pub completed: u64,
    /// Uploads that failed at any stage
    pub failed: u64,
    /// Server version
    pub version: &'static str,
}

/// Server statistics endpoint
///
/// GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    tracing::debug!("server stats requested");

    Json(StatsResponse {
        uptime_secs: state.uptime_secs(),
        storage_type: state.artifacts.method(),
        completed: state.completed_count(),
        failed: state.failed_count(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
