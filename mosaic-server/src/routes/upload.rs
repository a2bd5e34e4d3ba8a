//! Upload endpoint: POST /api/upload

use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::Json;
use mosaic_core::request::{GRID_NUM_FIELD, MAIN_IMAGE_FIELD, OUTPUT_WIDTH_FIELD, TILES_FIELD};
use mosaic_core::{UploadRequest, UploadedFile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SUCCESS_MESSAGE: &str = "Mosaic generated successfully.";

/// Successful upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Public URL of the stored mosaic
    pub path: String,
}

/// Generate a mosaic from a multipart upload
///
/// POST /api/upload
///
/// Fields: `mainImage` (one file), `tiles` (one or more files), `gridNum`,
/// `outputWidth`. Unknown fields are ignored.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let outcome = handle(&state, multipart).await;
    match &outcome {
        Ok(_) => state.record_completed(),
        Err(_) => state.record_failed(),
    }
    outcome
}

async fn handle(state: &AppState, multipart: Multipart) -> Result<Json<UploadResponse>> {
    let request = read_upload(multipart).await?;
    tracing::debug!(
        tiles = request.tiles.len(),
        bytes = request.payload_bytes(),
        "multipart upload received"
    );

    let reference = state.pipeline.run(request).await?;

    Ok(Json(UploadResponse {
        message: SUCCESS_MESSAGE.to_string(),
        path: reference.into_url(),
    }))
}

/// Collect the multipart stream into an [`UploadRequest`].
///
/// Field-level rules (missing files, bad numbers) are left to validation;
/// only framing problems and a repeated `mainImage` are rejected here.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest> {
    let mut request = UploadRequest::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            MAIN_IMAGE_FIELD => {
                if request.main_image.is_some() {
                    return Err(ServerError::bad_request(
                        "mainImage accepts exactly one file",
                    ));
                }
                request.main_image = Some(read_file(&name, field).await?);
            }
            TILES_FIELD => {
                let tile = read_file(&name, field).await?;
                request.tiles.push(tile);
            }
            GRID_NUM_FIELD => {
                request.grid_num = Some(field.text().await.map_err(multipart_error)?);
            }
            OUTPUT_WIDTH_FIELD => {
                request.output_width = Some(field.text().await.map_err(multipart_error)?);
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    Ok(request)
}

async fn read_file(name: &str, field: Field<'_>) -> Result<UploadedFile> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    let mut file = UploadedFile::new(name, bytes);
    if let Some(file_name) = file_name {
        file = file.with_file_name(file_name);
    }
    if let Some(content_type) = content_type {
        file = file.with_content_type(content_type);
    }
    Ok(file)
}

fn multipart_error(e: MultipartError) -> ServerError {
    ServerError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
}
