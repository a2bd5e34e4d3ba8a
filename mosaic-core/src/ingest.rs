//! Temporary ingest store
//!
//! Each request gets its own [`IngestSession`]: a fresh scratch directory
//! under the ingest root. Uploaded files are written there with unique names
//! (`{field}-{index}-{uuid}{ext}`) and the whole directory is removed when the
//! session is dropped, whatever way the request ends.

use crate::error::IngestError;
use crate::request::UploadedFile;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A file written to ephemeral storage for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    pub field_name: String,
    pub temporary_path: PathBuf,
    /// Extension of the original filename, with leading dot, or empty
    pub original_extension: String,
}

/// Factory for per-request ingest sessions
#[derive(Debug, Clone)]
pub struct IngestStore {
    root: PathBuf,
}

impl Default for IngestStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl IngestStore {
    /// Create a store whose sessions live under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a new session with its own scratch directory.
    pub async fn begin(&self) -> Result<IngestSession, IngestError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| IngestError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let dir = tempfile::Builder::new()
            .prefix("mosaic-ingest-")
            .tempdir_in(&self.root)
            .map_err(|source| IngestError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        tracing::trace!(dir = %dir.path().display(), "ingest session opened");
        Ok(IngestSession { dir, written: 0 })
    }
}

/// Scratch space for one request; deleted on drop
#[derive(Debug)]
pub struct IngestSession {
    dir: TempDir,
    written: usize,
}

impl IngestSession {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write one uploaded file into the session directory.
    pub async fn ingest(&mut self, file: &UploadedFile) -> Result<IngestedFile, IngestError> {
        let extension = file.extension();
        let name = format!(
            "{}-{}-{}{}",
            sanitize_field(&file.field_name),
            self.written,
            uuid::Uuid::new_v4().simple(),
            extension
        );
        let path = self.dir.path().join(name);

        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|source| IngestError::Write {
                field: file.field_name.clone(),
                path: path.clone(),
                source,
            })?;
        self.written += 1;

        Ok(IngestedFile {
            field_name: file.field_name.clone(),
            temporary_path: path,
            original_extension: extension,
        })
    }

    /// Write every file in order
    pub async fn ingest_all(
        &mut self,
        files: &[UploadedFile],
    ) -> Result<Vec<IngestedFile>, IngestError> {
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            out.push(self.ingest(file).await?);
        }
        Ok(out)
    }
}

fn sanitize_field(field: &str) -> String {
    let cleaned: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
