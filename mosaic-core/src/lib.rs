//! # Mosaic Core
//!
//! Upload-to-artifact pipeline for photomosaic generation.
//!
//! This crate provides:
//! - Request types: [`UploadRequest`], [`UploadedFile`]
//! - The validation layer ([`validate()`]) and [`BuildParameters`]
//! - A per-request temporary ingest store ([`IngestStore`])
//! - The [`MosaicBuilder`] capability and the bundled [`ImageMosaicBuilder`]
//! - The [`ArtifactStore`] trait with file and memory backends
//! - The request orchestrator ([`MosaicPipeline`])
//!
//! ## Example
//!
//! ```ignore
//! use mosaic_core::{ImageMosaicBuilder, MemoryArtifactStore, MosaicPipeline};
//! use std::sync::Arc;
//!
//! let pipeline = MosaicPipeline::new(
//!     Arc::new(ImageMosaicBuilder::new()),
//!     Arc::new(MemoryArtifactStore::new("http://localhost:8090")),
//! );
//! let reference = pipeline.run(request).await?;
//! println!("{}", reference.url());
//! ```

pub mod artifact;
pub mod builder;
pub mod compose;
pub mod error;
pub mod ingest;
pub mod orchestrator;
pub mod params;
pub mod request;
pub mod validate;

pub use artifact::{
    ArtifactReference, ArtifactStore, ArtifactWriteResult, FileArtifactStore,
    MemoryArtifactStore, StoredArtifact,
};
pub use builder::{MosaicArtifact, MosaicBuilder};
pub use compose::ImageMosaicBuilder;
pub use error::{BuildError, IngestError, PersistenceError, PipelineError, Result, ValidationError};
pub use ingest::{IngestSession, IngestStore, IngestedFile};
pub use orchestrator::{
    MosaicPipeline, PipelineRun, PipelineStage, DEFAULT_BUILD_TIMEOUT, DEFAULT_MAX_CONCURRENT_BUILDS,
};
pub use params::{BuildParameters, MatchingAlgorithm, OutputFormat};
pub use request::{UploadRequest, UploadedFile};
pub use validate::{validate, Limits, ValidatedUpload};
