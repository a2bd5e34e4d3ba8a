//! HTTP route handlers and router configuration

mod admin;
mod artifacts;
mod blob;
mod upload;

pub use blob::BlobResponse;
pub use upload::{UploadResponse, SUCCESS_MESSAGE};

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use mosaic_core::artifact::ARTIFACT_ROUTE_PREFIX;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the main application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(admin::health))
        .route("/api/stats", get(admin::stats))
        // Upload pipeline
        .route("/api/upload", post(upload::upload))
        .route("/api/blob", post(blob::put_blob))
        // Stored artifacts
        .route(
            &format!("{ARTIFACT_ROUTE_PREFIX}/:name"),
            get(artifacts::get_artifact),
        );

    let mut router = router
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(state.config.body_limit))
        .layer(TraceLayer::new_for_http());

    if state.config.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}
