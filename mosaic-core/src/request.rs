//! Upload request types
//!
//! An [`UploadRequest`] is what the HTTP layer hands the orchestrator: the raw
//! uploaded files plus the string-encoded numeric fields, exactly as they
//! arrived. Nothing here is validated yet; see [`crate::validate`].

use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// Multipart field carrying the main image
pub const MAIN_IMAGE_FIELD: &str = "mainImage";
/// Multipart field carrying tile images (repeatable)
pub const TILES_FIELD: &str = "tiles";
/// Multipart field carrying the grid size
pub const GRID_NUM_FIELD: &str = "gridNum";
/// Multipart field carrying the output width in pixels
pub const OUTPUT_WIDTH_FIELD: &str = "outputWidth";

/// One uploaded file held in memory until ingest
#[derive(Clone)]
pub struct UploadedFile {
    /// Multipart field name the file arrived under
    pub field_name: String,
    /// Client-supplied filename, if any
    pub file_name: Option<String>,
    /// Client-supplied content type, if any
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Bytes,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedFile {
    pub fn new(field_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: None,
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Extension of the original filename including the leading dot
    /// (`".png"`), or an empty string when there is none.
    pub fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

/// Raw upload request, one per HTTP call
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub main_image: Option<UploadedFile>,
    pub tiles: Vec<UploadedFile>,
    pub grid_num: Option<String>,
    pub output_width: Option<String>,
}

impl UploadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_image(mut self, file: UploadedFile) -> Self {
        self.main_image = Some(file);
        self
    }

    pub fn tile(mut self, file: UploadedFile) -> Self {
        self.tiles.push(file);
        self
    }

    pub fn grid_num(mut self, value: impl Into<String>) -> Self {
        self.grid_num = Some(value.into());
        self
    }

    pub fn output_width(mut self, value: impl Into<String>) -> Self {
        self.output_width = Some(value.into());
        self
    }

    /// Total bytes across all uploaded files
    pub fn payload_bytes(&self) -> usize {
        self.main_image.iter().map(|f| f.bytes.len()).sum::<usize>()
            + self.tiles.iter().map(|f| f.bytes.len()).sum::<usize>()
    }
}
