//! Artifact download: GET /artifacts/:name

use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response> {
    let stored = state
        .artifacts
        .get(&name)
        .await?
        .ok_or_else(|| ServerError::not_found(format!("Artifact not found: {name}")))?;

    tracing::debug!(name = %name, bytes = stored.bytes.len(), "serving artifact");

    Ok((
        [
            (header::CONTENT_TYPE, stored.content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        stored.bytes,
    )
        .into_response())
}
