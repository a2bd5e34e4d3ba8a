//! Request orchestrator
//!
//! Drives one upload through
//! `Received → Validating → Ingesting → Building → Persisting → Completed`.
//! The first failing stage moves the run to `Failed` and nothing after it
//! runs. Only a fully persisted artifact is ever returned.
//!
//! The builder runs on tokio's blocking pool under a timeout. A timed-out
//! build is reported as [`BuildError::Timeout`]; its thread is left to finish
//! on its own and the result is discarded. The ingest session and a build
//! permit move into that thread, so scratch files outlive the builder that
//! reads them and abandoned builds still count against
//! [`DEFAULT_MAX_CONCURRENT_BUILDS`].

use crate::artifact::{ArtifactReference, ArtifactStore};
use crate::builder::MosaicBuilder;
use crate::error::{BuildError, PipelineError, Result};
use crate::ingest::IngestStore;
use crate::request::UploadRequest;
use crate::validate::{validate, Limits};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::Instrument;

/// Default bound on a single builder invocation. Only the caller stops
/// waiting; the blocking thread runs until the builder returns.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of builds allowed on the blocking pool at once, timed-out
/// ones included
pub const DEFAULT_MAX_CONCURRENT_BUILDS: usize = 4;

/// Lifecycle of one request, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Received,
    Validating,
    Ingesting,
    Building,
    Persisting,
    Completed,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Received => "received",
            PipelineStage::Validating => "validating",
            PipelineStage::Ingesting => "ingesting",
            PipelineStage::Building => "building",
            PipelineStage::Persisting => "persisting",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Forward-only stage recorder
#[derive(Debug)]
struct StageTracker {
    stages: Vec<PipelineStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stages: vec![PipelineStage::Received],
        }
    }

    fn current(&self) -> PipelineStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(PipelineStage::Received)
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(next > self.current(), "stage went backwards");
        tracing::debug!(from = %self.current(), to = %next, "pipeline stage");
        self.stages.push(next);
    }
}

/// Outcome of one run, with the stages it passed through
#[derive(Debug)]
pub struct PipelineRun {
    pub request_id: String,
    pub stages: Vec<PipelineStage>,
    pub outcome: Result<ArtifactReference>,
}

impl PipelineRun {
    /// Stage the run ended in (`Completed` or `Failed`)
    pub fn final_stage(&self) -> PipelineStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(PipelineStage::Received)
    }

    /// Last stage entered before `Failed`, if the run failed
    pub fn failed_at(&self) -> Option<PipelineStage> {
        match self.stages.as_slice() {
            [.., before, PipelineStage::Failed] => Some(*before),
            _ => None,
        }
    }
}

/// The upload-to-artifact pipeline
#[derive(Debug, Clone)]
pub struct MosaicPipeline {
    ingest: IngestStore,
    builder: Arc<dyn MosaicBuilder>,
    store: Arc<dyn ArtifactStore>,
    limits: Limits,
    build_timeout: Duration,
    build_permits: Arc<Semaphore>,
}

impl MosaicPipeline {
    /// Pipeline with the system temp dir for ingest, default limits and
    /// default build timeout.
    pub fn new(builder: Arc<dyn MosaicBuilder>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            ingest: IngestStore::default(),
            builder,
            store,
            limits: Limits::default(),
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            build_permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_BUILDS)),
        }
    }

    pub fn with_ingest_store(mut self, ingest: IngestStore) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    /// Cap on builds occupying blocking threads. Requests beyond it wait for
    /// a permit before their build timeout starts.
    pub fn with_max_concurrent_builds(mut self, max: usize) -> Self {
        self.build_permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn build_timeout(&self) -> Duration {
        self.build_timeout
    }

    pub fn artifact_store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Run one request to completion and return its artifact reference.
    pub async fn run(&self, request: UploadRequest) -> Result<ArtifactReference> {
        self.execute(request).await.outcome
    }

    /// Run one request and report every stage it passed through.
    pub async fn execute(&self, request: UploadRequest) -> PipelineRun {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!("mosaic_pipeline", request_id = %request_id);

        async move {
            let started = Instant::now();
            let mut tracker = StageTracker::new();
            let outcome = self.stages(request, &mut tracker).await;

            match &outcome {
                Ok(reference) => {
                    tracker.advance(PipelineStage::Completed);
                    tracing::info!(
                        url = %reference,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "mosaic generated"
                    );
                }
                Err(err) => {
                    let stage = tracker.current();
                    tracker.advance(PipelineStage::Failed);
                    if err.is_client_error() {
                        tracing::info!(stage = %stage, error = %err, "upload rejected");
                    } else {
                        tracing::warn!(stage = %stage, error = %err, "mosaic pipeline failed");
                    }
                }
            }

            PipelineRun {
                request_id,
                stages: tracker.stages,
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    async fn stages(
        &self,
        request: UploadRequest,
        tracker: &mut StageTracker,
    ) -> Result<ArtifactReference> {
        tracker.advance(PipelineStage::Validating);
        let validated = validate(&request, &self.limits)?;
        tracing::debug!(
            tiles = validated.tiles.len(),
            grid_num = validated.params.grid_num(),
            output_width = validated.params.output_width(),
            bytes = request.payload_bytes(),
            "upload validated"
        );

        tracker.advance(PipelineStage::Ingesting);
        let mut session = self.ingest.begin().await?;
        let main = session.ingest(validated.main_image).await?;
        let tiles = session.ingest_all(validated.tiles).await?;

        tracker.advance(PipelineStage::Building);
        let permit = Arc::clone(&self.build_permits)
            .acquire_owned()
            .await
            .map_err(|e| BuildError::Aborted(e.to_string()))?;
        let artifact = {
            let builder = Arc::clone(&self.builder);
            let main_path = main.temporary_path.clone();
            let tile_paths: Vec<PathBuf> = tiles.into_iter().map(|f| f.temporary_path).collect();
            let params = validated.params.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let built = builder.build(&main_path, &tile_paths, &params);
                // Scratch files go only once the builder has stopped reading them.
                drop(session);
                drop(permit);
                built
            });

            match tokio::time::timeout(self.build_timeout, handle).await {
                Err(_) => Err(BuildError::Timeout(self.build_timeout)),
                Ok(Err(join)) => Err(BuildError::Aborted(join.to_string())),
                Ok(Ok(built)) => built,
            }
        };
        let artifact = artifact?;

        tracker.advance(PipelineStage::Persisting);
        let written = self
            .store
            .put(&artifact.suggested_filename, &artifact.bytes)
            .await
            .map_err(PipelineError::Persistence)?;
        tracing::debug!(
            name = %written.name,
            bytes = written.size_bytes,
            store = self.store.method(),
            "artifact persisted"
        );

        Ok(written.reference)
    }
}
