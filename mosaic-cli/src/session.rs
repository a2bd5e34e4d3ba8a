//! Upload session: drives one generation at a time against a
//! [`MosaicService`] and records successes in the gallery.

use crate::error::{CliError, CliResult};
use crate::gallery::{GalleryCache, GalleryStore};
use crate::remote_client::{GenerateJob, MosaicClient, RemoteError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

/// What the session needs from a mosaic server.
#[async_trait]
pub trait MosaicService: Send + Sync {
    /// Run the pipeline remotely; returns the artifact URL.
    async fn generate(&self, job: &GenerateJob) -> Result<String, RemoteError>;

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError>;
}

#[async_trait]
impl MosaicService for MosaicClient {
    async fn generate(&self, job: &GenerateJob) -> Result<String, RemoteError> {
        Ok(self.upload(job).await?.path)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        MosaicClient::fetch(self, url).await
    }
}

#[derive(Debug)]
pub struct Session<S> {
    gallery: GalleryCache<S>,
    loading: bool,
}

impl<S: GalleryStore> Session<S> {
    pub fn new(gallery: GalleryCache<S>) -> Self {
        Self {
            gallery,
            loading: false,
        }
    }

    /// True while a generate call is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn gallery(&self) -> &GalleryCache<S> {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut GalleryCache<S> {
        &mut self.gallery
    }

    /// Submit `job`. On success the URL is appended to the gallery; on any
    /// failure the gallery is untouched. The loading flag is cleared either way.
    pub async fn generate<M: MosaicService + ?Sized>(
        &mut self,
        service: &M,
        job: &GenerateJob,
    ) -> CliResult<String> {
        self.loading = true;
        let outcome = service.generate(job).await;
        self.loading = false;

        let url = outcome?;
        self.gallery.append(url.clone())?;
        tracing::info!(url = %url, entries = self.gallery.len(), "mosaic added to gallery");
        Ok(url)
    }

    /// Download gallery entry `index` to `dest`. Out-of-range indices are
    /// rejected before any network call.
    pub async fn download<M: MosaicService + ?Sized>(
        &mut self,
        service: &M,
        index: usize,
        dest: &Path,
    ) -> CliResult<u64> {
        self.gallery.open_at_index(index)?;
        let url = self
            .gallery
            .current()
            .ok_or_else(|| CliError::NotFound(format!("no gallery entry at index {index}")))?
            .to_string();

        let bytes = service.fetch(&url).await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| CliError::Input(format!("cannot write {}: {e}", dest.display())))?;
        tracing::info!(url = %url, dest = %dest.display(), bytes = bytes.len(), "artifact downloaded");
        Ok(bytes.len() as u64)
    }
}

/// Local filename for a downloaded artifact URL (last path segment).
pub fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("mosaic.png")
        .to_string()
}
