pub mod download;
pub mod gallery;
pub mod generate;
pub mod show;

use crate::gallery::{FileGalleryStore, GalleryCache};
use crate::session::Session;
use std::path::Path;

/// Session backed by the gallery file in `data_dir`.
pub(crate) fn open_session(data_dir: &Path) -> Session<FileGalleryStore> {
    Session::new(GalleryCache::restore(FileGalleryStore::new(data_dir)))
}
