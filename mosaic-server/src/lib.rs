//! Mosaic HTTP Server
//!
//! An axum front end for `mosaic-core`: accepts a main image plus tile images
//! as multipart form data, runs the upload-to-artifact pipeline, and returns
//! the public URL of the stored mosaic.
//!
//! # Endpoints
//!
//! - `POST /api/upload` - generate a mosaic
//! - `POST /api/blob?filename=` - store a raw artifact
//! - `GET /artifacts/:name` - serve a stored artifact
//! - `GET /health`, `GET /api/stats`
//!
//! # Example
//!
//! ```ignore
//! use mosaic_server::{MosaicServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = MosaicServer::new(ServerConfig::default()).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod config;
pub mod config_file;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;
pub use telemetry::{init_logging, TelemetryConfig};

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Mosaic HTTP Server
pub struct MosaicServer {
    /// Application state
    state: Arc<AppState>,
    /// Configured router
    router: Router,
}

impl MosaicServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let telemetry_config = TelemetryConfig::with_server_config(&config);
        let state = Arc::new(AppState::new(config, telemetry_config)?);
        Ok(Self::from_state(state))
    }

    /// Wrap prebuilt state (custom pipeline, shared store)
    pub fn from_state(state: Arc<AppState>) -> Self {
        let router = routes::build_router(state.clone());
        Self { state, router }
    }

    /// Get a reference to the application state
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router for testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.state.config.listen_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (lets tests bind port 0)
    pub async fn serve(self, listener: TcpListener) -> std::result::Result<(), std::io::Error> {
        let addr: SocketAddr = listener.local_addr()?;

        info!(
            addr = %addr,
            storage = %self.state.artifacts.method(),
            public_url = %self.state.config.effective_public_url(),
            "Mosaic server starting"
        );

        axum::serve(listener, self.router).await
    }
}

/// Builder for MosaicServer with fluent API
pub struct MosaicServerBuilder {
    config: ServerConfig,
}

impl MosaicServerBuilder {
    /// Create a new builder with default config (memory storage)
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Create a builder configured for memory storage
    pub fn memory() -> Self {
        Self::new()
    }

    /// Create a builder configured for file storage
    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        let mut builder = Self::new();
        builder.config.storage_path = Some(path.into());
        builder
    }

    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the public base URL used in artifact references
    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_url = Some(url.into());
        self
    }

    /// Enable or disable CORS
    pub fn cors_enabled(mut self, enabled: bool) -> Self {
        self.config.cors_enabled = enabled;
        self
    }

    /// Set the build timeout in seconds
    pub fn build_timeout_secs(mut self, secs: u64) -> Self {
        self.config.build_timeout_secs = secs;
        self
    }

    /// Build the server
    pub fn build(self) -> std::result::Result<MosaicServer, ServerError> {
        MosaicServer::new(self.config)
    }
}

impl Default for MosaicServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
