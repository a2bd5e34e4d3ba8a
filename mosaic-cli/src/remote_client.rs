//! HTTP client for the mosaic server.
//!
//! Sends multipart uploads to `POST /api/upload` and fetches stored artifacts
//! by URL.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Covers the server's default build timeout plus upload time.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Form defaults matching the original upload page.
pub const DEFAULT_GRID_NUM: u32 = 10;
pub const DEFAULT_OUTPUT_WIDTH: u32 = 250;

/// One mosaic generation request
#[derive(Debug, Clone)]
pub struct GenerateJob {
    pub main_image: PathBuf,
    pub tiles: Vec<PathBuf>,
    pub grid_num: u32,
    pub output_width: u32,
}

impl GenerateJob {
    pub fn new(main_image: impl Into<PathBuf>, tiles: Vec<PathBuf>) -> Self {
        Self {
            main_image: main_image.into(),
            tiles,
            grid_num: DEFAULT_GRID_NUM,
            output_width: DEFAULT_OUTPUT_WIDTH,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for a mosaic server.
#[derive(Clone)]
pub struct MosaicClient {
    client: Client,
    base_url: String,
}

impl fmt::Debug for MosaicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MosaicClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Error type for server operations.
#[derive(Debug)]
pub enum RemoteError {
    /// Network or connection error
    Network(String),
    /// Local file could not be read for upload
    Read { path: PathBuf, message: String },
    /// 400 Bad Request (includes server error message)
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 5xx Server Error (includes server error message)
    ServerError(String),
    /// Response could not be parsed as expected
    InvalidResponse(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Network(msg) => write!(f, "network error: {msg}"),
            RemoteError::Read { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            RemoteError::BadRequest(msg) => write!(f, "rejected by server: {msg}"),
            RemoteError::NotFound(msg) => write!(f, "not found: {msg}"),
            RemoteError::ServerError(msg) => write!(f, "server error: {msg}"),
            RemoteError::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl MosaicClient {
    /// `base_url` is the server root (e.g., `http://localhost:8090`).
    /// Trailing slashes are stripped.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a non-2xx response to a `RemoteError`, preferring the server's
    /// `error` field over the raw body.
    async fn map_error(resp: reqwest::Response) -> RemoteError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.is_empty() => format!("status {status}"),
            Err(_) => body,
        };

        match status {
            StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => {
                RemoteError::BadRequest(message)
            }
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            s if s.is_server_error() => RemoteError::ServerError(message),
            _ => RemoteError::ServerError(format!("unexpected status {status}: {message}")),
        }
    }

    /// Map a reqwest error (network/timeout) to a `RemoteError`.
    fn map_network_error(e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Network(format!("request timed out: {e}"))
        } else if e.is_connect() {
            RemoteError::Network(format!("connection failed: {e}"))
        } else {
            RemoteError::Network(e.to_string())
        }
    }

    /// Upload the job's images and return the stored mosaic's URL.
    pub async fn upload(&self, job: &GenerateJob) -> Result<UploadResponse, RemoteError> {
        let mut form = Form::new()
            .part("mainImage", file_part(&job.main_image).await?)
            .text("gridNum", job.grid_num.to_string())
            .text("outputWidth", job.output_width.to_string());
        for tile in &job.tiles {
            form = form.part("tiles", file_part(tile).await?);
        }

        let url = format!("{}/api/upload", self.base_url);
        tracing::info!(
            url = %url,
            tiles = job.tiles.len(),
            grid_num = job.grid_num,
            output_width = job.output_width,
            "uploading images"
        );

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_network_error)?;

        if resp.status().is_success() {
            resp.json()
                .await
                .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
        } else {
            Err(Self::map_error(resp).await)
        }
    }

    /// Download an artifact by its full URL.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        tracing::debug!(url = %url, "fetching artifact");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::map_network_error)?;

        if resp.status().is_success() {
            resp.bytes().await.map_err(Self::map_network_error)
        } else {
            Err(Self::map_error(resp).await)
        }
    }
}

async fn file_part(path: &Path) -> Result<Part, RemoteError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| RemoteError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = mime_for(path);

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| RemoteError::InvalidResponse(format!("bad content type {mime}: {e}")))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
