//! Server error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mosaic_core::{BuildError, PersistenceError, PipelineError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Compact error type tags carried in the `@type` field of error bodies.
pub mod errors {
    pub const MISSING_MAIN_IMAGE: &str = "err:mosaic/MissingMainImage";
    pub const MISSING_TILES: &str = "err:mosaic/MissingTiles";
    pub const TOO_MANY_TILES: &str = "err:mosaic/TooManyTiles";
    pub const INVALID_GRID_NUM: &str = "err:mosaic/InvalidGridNum";
    pub const INVALID_OUTPUT_WIDTH: &str = "err:mosaic/InvalidOutputWidth";
    pub const INGEST_FAILURE: &str = "err:mosaic/IngestFailure";
    pub const BUILD_FAILURE: &str = "err:mosaic/BuildFailure";
    pub const BUILD_TIMEOUT: &str = "err:mosaic/BuildTimeout";
    pub const OUTPUT_TOO_LARGE: &str = "err:mosaic/OutputTooLarge";
    pub const PERSISTENCE_FAILURE: &str = "err:mosaic/PersistenceFailure";
    pub const BAD_REQUEST: &str = "err:mosaic/BadRequest";
    pub const NOT_FOUND: &str = "err:mosaic/NotFound";
    pub const INTERNAL: &str = "err:mosaic/Internal";
}

/// Server error type that wraps pipeline errors and provides HTTP status mapping
#[derive(Error, Debug)]
pub enum ServerError {
    /// Pipeline stage failure
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Malformed request outside the pipeline (multipart framing, query params)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not Found (404)
    #[error("{0}")]
    NotFound(String),

    /// Anything else that is the server's fault
    #[error("Server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Map error to error type IRI (compact form)
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Pipeline(PipelineError::Validation(v)) => match v {
                ValidationError::MissingMainImage => errors::MISSING_MAIN_IMAGE,
                ValidationError::MissingTiles => errors::MISSING_TILES,
                ValidationError::TooManyTiles { .. } => errors::TOO_MANY_TILES,
                ValidationError::InvalidGridNum(_) => errors::INVALID_GRID_NUM,
                ValidationError::InvalidOutputWidth(_) => errors::INVALID_OUTPUT_WIDTH,
            },
            ServerError::Pipeline(PipelineError::Ingest(_)) => errors::INGEST_FAILURE,
            ServerError::Pipeline(PipelineError::Build(BuildError::Timeout(_))) => {
                errors::BUILD_TIMEOUT
            }
            ServerError::Pipeline(PipelineError::Build(BuildError::OutputTooLarge { .. })) => {
                errors::OUTPUT_TOO_LARGE
            }
            ServerError::Pipeline(PipelineError::Build(_)) => errors::BUILD_FAILURE,
            ServerError::Pipeline(PipelineError::Persistence(_)) => errors::PERSISTENCE_FAILURE,
            ServerError::BadRequest(_) => errors::BAD_REQUEST,
            ServerError::NotFound(_) => errors::NOT_FOUND,
            ServerError::Internal(_) => errors::INTERNAL,
        }
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 - Bad Request (client errors)
            ServerError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Persistence(PersistenceError::InvalidName(_))) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,

            // 404 - Not Found
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,

            // 500 - ingest, build, persistence and everything else
            ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServerError::BadRequest(msg.into())
    }

    /// Create a not found error (404)
    pub fn not_found(msg: impl Into<String>) -> Self {
        ServerError::NotFound(msg.into())
    }

    /// Create an internal error (500)
    pub fn internal(msg: impl Into<String>) -> Self {
        ServerError::Internal(msg.into())
    }
}

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        ServerError::Pipeline(PipelineError::Validation(e))
    }
}

impl From<PersistenceError> for ServerError {
    fn from(e: PersistenceError) -> Self {
        ServerError::Pipeline(PipelineError::Persistence(e))
    }
}

/// Body text for 5xx responses; the detail (scratch paths, decoder output)
/// stays in the server log.
pub const SERVER_ERROR_MESSAGE: &str = "Server error during file processing.";

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub status: u16,
    /// Error type (compact IRI, e.g., "err:mosaic/InvalidGridNum")
    #[serde(rename = "@type")]
    pub error_type: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "request failed");
        } else {
            tracing::debug!(error = %self, error_type, "request rejected");
        }

        let message = if status.is_server_error() {
            SERVER_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            error: message,
            status: status.as_u16(),
            error_type: error_type.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"{}","status":{},"@type":"{}"}}"#,
                SERVER_ERROR_MESSAGE,
                status.as_u16(),
                error_type
            )
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
