//! Artifact storage
//!
//! ## Traits
//!
//! - [`ArtifactStore`]: persist a finished buffer and hand back a public URL
//!
//! ## Implementations
//!
//! - [`FileArtifactStore`]: files under a root directory (tokio::fs)
//! - [`MemoryArtifactStore`]: in-process map, for tests and ephemeral servers
//!
//! ## Naming
//!
//! Every `put` derives a fresh stored name from the desired filename:
//! `{stem}-{unix_ms}-{seq}-{sha256[..8]}.{ext}`. The sequence number comes
//! from a per-store atomic counter, so two calls never produce the same name
//! even when they land in the same millisecond with identical bytes.

use crate::error::PersistenceError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// URL path segment under which artifacts are served
pub const ARTIFACT_ROUTE_PREFIX: &str = "/artifacts";

/// Publicly resolvable reference to a stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactReference {
    url: String,
}

impl ArtifactReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_url(self) -> String {
        self.url
    }

    /// Last path segment of the URL (the stored name)
    pub fn name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Result of a successful `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWriteResult {
    pub reference: ArtifactReference,
    /// Unique stored name (`pathname` in the blob API)
    pub name: String,
    pub content_type: &'static str,
    pub size_bytes: usize,
}

/// Bytes read back from a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Durable artifact persistence.
///
/// `put` must never overwrite an earlier artifact; see the module docs for
/// the naming scheme.
#[async_trait]
pub trait ArtifactStore: Debug + Send + Sync {
    /// Persist `bytes` under a unique name derived from `desired_filename`.
    async fn put(
        &self,
        desired_filename: &str,
        bytes: &[u8],
    ) -> Result<ArtifactWriteResult, PersistenceError>;

    /// Read a stored artifact by its stored name.
    ///
    /// Returns `Ok(None)` when nothing is stored under `name`.
    async fn get(&self, name: &str) -> Result<Option<StoredArtifact>, PersistenceError>;

    /// Backend identifier for logging ("file", "memory")
    fn method(&self) -> &'static str;
}

// ============================================================================
// Naming helpers
// ============================================================================

/// Shared naming state: public URL base plus the collision counter
#[derive(Debug)]
struct Namer {
    public_base_url: String,
    seq: AtomicU64,
}

impl Namer {
    fn new(public_base_url: &str) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            seq: AtomicU64::new(0),
        }
    }

    fn next_name(&self, desired_filename: &str, bytes: &[u8]) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        unique_name(desired_filename, bytes, unix_millis(), seq)
    }

    fn reference(&self, name: &str) -> ArtifactReference {
        ArtifactReference::new(format!(
            "{}{}/{}",
            self.public_base_url, ARTIFACT_ROUTE_PREFIX, name
        ))
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Compute SHA-256 of bytes and return as hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Build a stored name: `{stem}-{millis}-{seq}-{hash8}.{ext}`.
///
/// Stem and extension are reduced to `[A-Za-z0-9_-]`; an empty stem becomes
/// `artifact` and an empty extension `bin`.
pub fn unique_name(desired_filename: &str, bytes: &[u8], millis: u128, seq: u64) -> String {
    let file = desired_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(desired_filename);
    let (stem, ext) = match file.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, e),
        _ => (file, ""),
    };

    let clean = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    };
    let mut stem = clean(stem);
    if stem.is_empty() {
        stem = "artifact".to_string();
    }
    let mut ext = clean(ext).to_ascii_lowercase();
    if ext.is_empty() {
        ext = "bin".to_string();
    }

    let hash = sha256_hex(bytes);
    format!("{stem}-{millis}-{seq}-{}.{ext}", &hash[..8])
}

/// Whether `name` is a plain stored name (no separators or traversal)
pub fn is_valid_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Content type inferred from a stored name's extension
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// FileArtifactStore
// ============================================================================

/// Artifact store writing files under a root directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
    namer: Arc<Namer>,
}

impl FileArtifactStore {
    /// Create a file store rooted at `root`, publishing URLs under
    /// `{public_base_url}/artifacts/`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            namer: Arc::new(Namer::new(public_base_url)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn put(
        &self,
        desired_filename: &str,
        bytes: &[u8],
    ) -> Result<ArtifactWriteResult, PersistenceError> {
        let name = self.namer.next_name(desired_filename, bytes);

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            PersistenceError::io(format!(
                "Failed to create directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        // Write beside the target, then rename, so readers never see a
        // half-written artifact.
        let final_path = self.root.join(&name);
        let tmp_path = self.root.join(format!(".{name}.tmp"));
        tokio::fs::write(&tmp_path, bytes).await.map_err(|e| {
            PersistenceError::io(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(PersistenceError::io(format!(
                "Failed to move {} into place: {}",
                final_path.display(),
                e
            )));
        }

        Ok(ArtifactWriteResult {
            reference: self.namer.reference(&name),
            content_type: content_type_for(&name),
            size_bytes: bytes.len(),
            name,
        })
    }

    async fn get(&self, name: &str) -> Result<Option<StoredArtifact>, PersistenceError> {
        if !is_valid_artifact_name(name) {
            return Err(PersistenceError::invalid_name(name));
        }
        let path = self.root.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(StoredArtifact {
                bytes,
                content_type: content_type_for(name),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn method(&self) -> &'static str {
        "file"
    }
}

// ============================================================================
// MemoryArtifactStore
// ============================================================================

/// In-memory artifact store
#[derive(Debug, Clone)]
pub struct MemoryArtifactStore {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    namer: Arc<Namer>,
}

impl MemoryArtifactStore {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            namer: Arc::new(Namer::new(public_base_url)),
        }
    }

    /// Number of stored artifacts
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(
        &self,
        desired_filename: &str,
        bytes: &[u8],
    ) -> Result<ArtifactWriteResult, PersistenceError> {
        let name = self.namer.next_name(desired_filename, bytes);
        self.data.write().insert(name.clone(), bytes.to_vec());
        Ok(ArtifactWriteResult {
            reference: self.namer.reference(&name),
            content_type: content_type_for(&name),
            size_bytes: bytes.len(),
            name,
        })
    }

    async fn get(&self, name: &str) -> Result<Option<StoredArtifact>, PersistenceError> {
        if !is_valid_artifact_name(name) {
            return Err(PersistenceError::invalid_name(name));
        }
        Ok(self.data.read().get(name).map(|bytes| StoredArtifact {
            bytes: bytes.clone(),
            content_type: content_type_for(name),
        }))
    }

    fn method(&self) -> &'static str {
        "memory"
    }
}
