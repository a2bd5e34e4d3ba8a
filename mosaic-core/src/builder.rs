//! Mosaic builder capability
//!
//! The orchestrator only knows this trait. [`crate::compose::ImageMosaicBuilder`]
//! is the bundled implementation; anything else that can turn a main image
//! and a set of tiles into an encoded buffer can be swapped in.

use crate::error::BuildError;
use crate::params::BuildParameters;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Default filename stem for generated mosaics
pub const DEFAULT_ARTIFACT_STEM: &str = "finalMosaic";

/// The encoded output of one build
#[derive(Clone, PartialEq, Eq)]
pub struct MosaicArtifact {
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
    pub content_type: &'static str,
}

impl Debug for MosaicArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MosaicArtifact")
            .field("len", &self.bytes.len())
            .field("suggested_filename", &self.suggested_filename)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Builds a photomosaic from files on disk.
///
/// Implementations are synchronous and may be CPU heavy; callers run them on
/// a blocking thread.
pub trait MosaicBuilder: Debug + Send + Sync {
    /// # Errors
    ///
    /// Any unreadable or undecodable input fails the whole build.
    fn build(
        &self,
        main_image: &Path,
        tiles: &[PathBuf],
        params: &BuildParameters,
    ) -> Result<MosaicArtifact, BuildError>;
}
