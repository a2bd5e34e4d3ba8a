//! Error types for mosaic-core
//!
//! Each pipeline stage owns one error enum. [`PipelineError`] unifies them so
//! the orchestrator can report which stage a request died in.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`PipelineError`]
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Client-caused rejection of an upload request.
///
/// Messages always name the offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No `mainImage` file in the request
    #[error("mainImage is required")]
    MissingMainImage,

    /// No `tiles` files in the request
    #[error("tiles must contain at least one file")]
    MissingTiles,

    /// More `tiles` files than the configured maximum
    #[error("tiles accepts at most {max} files, got {count}")]
    TooManyTiles { count: usize, max: usize },

    /// `gridNum` missing, non-numeric or outside [1, 100]
    #[error("Invalid gridNum parameter: {0}")]
    InvalidGridNum(String),

    /// `outputWidth` missing, non-numeric or outside [1, max]
    #[error("Invalid outputWidth parameter: {0}")]
    InvalidOutputWidth(String),
}

/// Failure writing uploaded bytes to ephemeral storage
#[derive(Error, Debug)]
pub enum IngestError {
    /// Creating the per-request scratch directory failed
    #[error("Failed to create ingest directory under {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing one uploaded file failed
    #[error("Failed to write {field} to {path}: {source}")]
    Write {
        field: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Mosaic builder failure (decode, compose, encode or timeout)
#[derive(Error, Debug)]
pub enum BuildError {
    /// Reading or decoding an input image failed
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// Encoding the composed mosaic failed
    #[error("Failed to encode mosaic: {0}")]
    Encode(#[source] image::ImageError),

    /// No tile images were supplied
    #[error("No tile images to build from")]
    NoTiles,

    /// The main image's aspect ratio would give an output taller than allowed
    #[error("Output of {width}x{height} exceeds the maximum height of {max_height}")]
    OutputTooLarge {
        width: u32,
        height: u32,
        max_height: u32,
    },

    /// The builder did not finish within the configured bound
    #[error("Mosaic build timed out after {0:?}")]
    Timeout(Duration),

    /// The builder task panicked or was cancelled
    #[error("Mosaic build task failed: {0}")]
    Aborted(String),
}

/// Artifact store failure
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O error writing or reading the store
    #[error("Artifact store I/O error: {0}")]
    Io(String),

    /// The requested filename cannot be stored
    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),

    /// The store is not reachable or refused the write
    #[error("Artifact store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Create an I/O error
    pub fn io(msg: impl Into<String>) -> Self {
        PersistenceError::Io(msg.into())
    }

    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>) -> Self {
        PersistenceError::InvalidName(name.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        PersistenceError::Unavailable(msg.into())
    }
}

/// Terminal failure of one pipeline run, tagged by stage
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PipelineError {
    /// Whether the client caused this failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_) | PipelineError::Build(BuildError::OutputTooLarge { .. })
        )
    }
}
