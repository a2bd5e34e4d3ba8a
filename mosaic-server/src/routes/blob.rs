//! Raw artifact upload: POST /api/blob?filename=<name>

use crate::error::{Result, ServerError};
use crate::state::AppState;
use bytes::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct BlobParams {
    pub filename: Option<String>,
}

/// Stored blob description
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobResponse {
    pub url: String,
    /// Stored name (unique, derived from `filename`)
    pub pathname: String,
    pub content_type: String,
    pub size: usize,
}

/// Store the request body directly in the artifact store.
pub async fn put_blob(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BlobParams>,
    body: Bytes,
) -> Result<Json<BlobResponse>> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ServerError::bad_request("filename query parameter is required"))?;

    let written = state.artifacts.put(&filename, &body).await?;
    tracing::info!(
        filename = %filename,
        name = %written.name,
        bytes = written.size_bytes,
        url = %written.reference,
        "blob stored"
    );

    Ok(Json(BlobResponse {
        url: written.reference.into_url(),
        pathname: written.name,
        content_type: written.content_type.to_string(),
        size: written.size_bytes,
    }))
}
