//! Client-side gallery of generated mosaics.
//!
//! The gallery is an append-only list of artifact URLs persisted as a JSON
//! array of strings under a single named entry (`cachedImages`). A
//! [`Lightbox`] tracks which entry is being viewed.

use crate::viewer::Lightbox;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Name of the persisted gallery entry
pub const GALLERY_KEY: &str = "cachedImages";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("failed to persist gallery: {0}")]
    Persist(String),

    #[error("no gallery entry at index {index} (gallery has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Storage for the single serialized gallery value.
pub trait GalleryStore: Send + Sync {
    /// Read the stored value. `Ok(None)` when nothing was ever saved.
    fn load(&self) -> Result<Option<String>, GalleryError>;

    /// Replace the stored value.
    fn save(&self, value: &str) -> Result<(), GalleryError>;
}

/// Gallery persisted as `<data_dir>/cachedImages.json`.
#[derive(Debug, Clone)]
pub struct FileGalleryStore {
    path: PathBuf,
}

impl FileGalleryStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{GALLERY_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GalleryStore for FileGalleryStore {
    fn load(&self) -> Result<Option<String>, GalleryError> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GalleryError::Persist(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, value: &str) -> Result<(), GalleryError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| GalleryError::Persist(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            GalleryError::Persist(format!("replace {}: {e}", self.path.display()))
        })
    }
}

/// In-memory store with an optional save failure switch.
#[derive(Debug, Default)]
pub struct MemoryGalleryStore {
    value: Mutex<Option<String>>,
    fail_saves: AtomicBool,
}

impl MemoryGalleryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self) -> Option<String> {
        self.value.lock().clone()
    }
}

impl GalleryStore for MemoryGalleryStore {
    fn load(&self) -> Result<Option<String>, GalleryError> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, value: &str) -> Result<(), GalleryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(GalleryError::Persist("store refused write".to_string()));
        }
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }
}

/// Ordered, append-only list of artifact URLs plus viewer state.
#[derive(Debug)]
pub struct GalleryCache<S> {
    store: S,
    entries: Vec<String>,
    viewer: Lightbox,
}

impl<S: GalleryStore> GalleryCache<S> {
    /// Restore from `store`. A missing, unreadable or malformed value yields
    /// an empty gallery; restore never fails.
    pub fn restore(store: S) -> Self {
        let entries = match store.load() {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed gallery data");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read gallery, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(entries = entries.len(), "gallery restored");

        Self {
            store,
            entries,
            viewer: Lightbox::default(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append `url` and persist the whole sequence.
    ///
    /// If persisting fails the in-memory sequence is left unchanged.
    pub fn append(&mut self, url: impl Into<String>) -> Result<(), GalleryError> {
        let url = url.into();
        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.extend(self.entries.iter().cloned());
        next.push(url);

        let raw = serde_json::to_string(&next)
            .map_err(|e| GalleryError::Persist(format!("serialize gallery: {e}")))?;
        self.store.save(&raw)?;

        self.entries = next;
        tracing::debug!(entries = self.entries.len(), "gallery entry appended");
        Ok(())
    }

    pub fn viewer(&self) -> &Lightbox {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut Lightbox {
        &mut self.viewer
    }

    /// Open the viewer on entry `index`. Out of range is rejected and the
    /// viewer is left as it was.
    pub fn open_at_index(&mut self, index: usize) -> Result<(), GalleryError> {
        if index >= self.entries.len() {
            return Err(GalleryError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        self.viewer.show(index);
        Ok(())
    }

    pub fn next(&mut self) {
        self.viewer.next(self.entries.len());
    }

    pub fn previous(&mut self) {
        self.viewer.previous(self.entries.len());
    }

    /// URL of the entry the open viewer is showing
    pub fn current(&self) -> Option<&str> {
        if self.viewer.is_open() {
            self.get(self.viewer.index())
        } else {
            None
        }
    }
}
