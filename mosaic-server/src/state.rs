//! Application state management
//!
//! One [`AppState`] is shared (behind an `Arc`) by every handler. Requests do
//! not coordinate through it beyond the artifact store's naming counter and
//! the outcome counters used by `/api/stats`.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::telemetry::TelemetryConfig;
use mosaic_core::{
    ArtifactStore, FileArtifactStore, ImageMosaicBuilder, IngestStore, MemoryArtifactStore,
    MosaicPipeline,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Telemetry configuration
    pub telemetry_config: TelemetryConfig,

    /// Upload-to-artifact pipeline
    pub pipeline: MosaicPipeline,

    /// Artifact store (same instance the pipeline persists into)
    pub artifacts: Arc<dyn ArtifactStore>,

    /// Server start time for uptime tracking
    pub start_time: Instant,

    completed: AtomicU64,
    failed: AtomicU64,
}

impl AppState {
    /// Create new application state from config
    ///
    /// Uses a [`FileArtifactStore`] when `storage_path` is set, otherwise an
    /// in-process [`MemoryArtifactStore`].
    pub fn new(config: ServerConfig, telemetry_config: TelemetryConfig) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::internal(format!("Invalid configuration: {e}")))?;

        let public_url = config.effective_public_url();
        let artifacts: Arc<dyn ArtifactStore> = match &config.storage_path {
            Some(path) => Arc::new(FileArtifactStore::new(path.clone(), &public_url)),
            None => Arc::new(MemoryArtifactStore::new(&public_url)),
        };

        let ingest = match &config.ingest_dir {
            Some(dir) => IngestStore::new(dir.clone()),
            None => IngestStore::default(),
        };

        let builder = ImageMosaicBuilder::new().with_max_output_height(config.max_output_width);
        let pipeline = MosaicPipeline::new(Arc::new(builder), artifacts.clone())
            .with_ingest_store(ingest)
            .with_limits(config.limits())
            .with_build_timeout(config.build_timeout())
            .with_max_concurrent_builds(config.max_concurrent_builds);

        Ok(Self::with_pipeline(config, telemetry_config, pipeline))
    }

    /// Create state around an already-assembled pipeline (custom builder or store).
    pub fn with_pipeline(
        config: ServerConfig,
        telemetry_config: TelemetryConfig,
        pipeline: MosaicPipeline,
    ) -> Self {
        let artifacts = pipeline.artifact_store().clone();
        Self {
            config,
            telemetry_config,
            pipeline,
            artifacts,
            start_time: Instant::now(),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of uploads that produced an artifact
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Number of uploads that ended in any error (validation included)
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_without_storage_path() {
        let state = AppState::new(ServerConfig::default(), TelemetryConfig::default()).unwrap();
        assert_eq!(state.artifacts.method(), "memory");
        assert_eq!(state.completed_count(), 0);
        assert_eq!(state.failed_count(), 0);
    }

    #[test]
    fn file_store_with_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            storage_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let state = AppState::new(config, TelemetryConfig::default()).unwrap();
        assert_eq!(state.artifacts.method(), "file");
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ServerConfig {
            build_timeout_secs: 0,
            ..Default::default()
        };
        assert!(AppState::new(config, TelemetryConfig::default()).is_err());
    }

    #[test]
    fn counters_increment() {
        let state = AppState::new(ServerConfig::default(), TelemetryConfig::default()).unwrap();
        state.record_completed();
        state.record_completed();
        state.record_failed();
        assert_eq!(state.completed_count(), 2);
        assert_eq!(state.failed_count(), 1);
    }
}
