//! Server configuration

use clap::Parser;
use mosaic_core::params::{DEFAULT_MAX_OUTPUT_WIDTH, DEFAULT_MAX_TILES};
use mosaic_core::{Limits, DEFAULT_MAX_CONCURRENT_BUILDS};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Mosaic HTTP server configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "mosaic-server")]
#[command(about = "Photomosaic upload server")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "MOSAIC_LISTEN_ADDR", default_value = "0.0.0.0:8090")]
    pub listen_addr: SocketAddr,

    /// Public base URL used when building artifact URLs
    /// (defaults to http://<listen_addr>)
    #[arg(long, env = "MOSAIC_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Directory for stored artifacts (enables file storage mode)
    #[arg(long, env = "MOSAIC_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Parent directory for per-request scratch directories (defaults to the OS temp dir)
    #[arg(long, env = "MOSAIC_INGEST_DIR")]
    pub ingest_dir: Option<PathBuf>,

    /// Enable CORS (Cross-Origin Resource Sharing)
    #[arg(long, env = "MOSAIC_CORS_ENABLED", default_value = "true")]
    pub cors_enabled: bool,

    /// Request body size limit in bytes (default 50MB)
    #[arg(long, env = "MOSAIC_BODY_LIMIT", default_value = "52428800")]
    pub body_limit: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MOSAIC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Upper bound on a single mosaic build, in seconds
    #[arg(long, env = "MOSAIC_BUILD_TIMEOUT_SECS", default_value = "120")]
    pub build_timeout_secs: u64,

    /// Builds allowed on the blocking pool at once (timed-out builds included)
    #[arg(long, env = "MOSAIC_MAX_CONCURRENT_BUILDS", default_value = "4")]
    pub max_concurrent_builds: usize,

    /// Maximum number of tile files per upload
    #[arg(long, env = "MOSAIC_MAX_TILES", default_value = "50")]
    pub max_tiles: usize,

    /// Maximum accepted outputWidth; also caps the derived output height
    #[arg(long, env = "MOSAIC_MAX_OUTPUT_WIDTH", default_value = "10000")]
    pub max_output_width: u32,

    /// Path to a config file (or a directory containing `.mosaic/`)
    #[arg(long = "config", env = "MOSAIC_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Config file profile to apply (`[profiles.<name>.server]`)
    #[arg(long, env = "MOSAIC_PROFILE")]
    pub profile: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            public_url: None,
            storage_path: None,
            ingest_dir: None,
            cors_enabled: true,
            body_limit: 50 * 1024 * 1024, // 50MB
            log_level: "info".to_string(),
            build_timeout_secs: 120,
            max_concurrent_builds: DEFAULT_MAX_CONCURRENT_BUILDS,
            max_tiles: DEFAULT_MAX_TILES,
            max_output_width: DEFAULT_MAX_OUTPUT_WIDTH,
            config_file: None,
            profile: None,
        }
    }
}

impl ServerConfig {
    /// Create config from CLI args
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Check if using file storage (vs memory)
    pub fn is_file_storage(&self) -> bool {
        self.storage_path.is_some()
    }

    /// Get storage type string for logging
    pub fn storage_type_str(&self) -> &'static str {
        if self.is_file_storage() {
            "file"
        } else {
            "memory"
        }
    }

    /// Base URL that artifact references are built from, without a trailing slash.
    pub fn effective_public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let addr = self.listen_addr;
                if addr.ip().is_unspecified() {
                    format!("http://localhost:{}", addr.port())
                } else {
                    format!("http://{addr}")
                }
            }
        }
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_tiles: self.max_tiles,
            max_output_width: self.max_output_width,
        }
    }

    /// Validate all configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.build_timeout_secs == 0 {
            return Err("build_timeout_secs must be at least 1".to_string());
        }
        if self.max_concurrent_builds == 0 {
            return Err("max_concurrent_builds must be at least 1".to_string());
        }
        if self.max_tiles == 0 {
            return Err("max_tiles must be at least 1".to_string());
        }
        if self.max_output_width == 0 {
            return Err("max_output_width must be at least 1".to_string());
        }
        if self.body_limit == 0 {
            return Err("body_limit must be greater than 0".to_string());
        }
        if let Some(url) = &self.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!(
                    "public_url must start with http:// or https://, got '{url}'"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_type_str(), "memory");
        assert_eq!(config.effective_public_url(), "http://localhost:8090");
    }

    #[test]
    fn clap_defaults_match_default_impl() {
        let parsed = ServerConfig::try_parse_from(["mosaic-server"]).unwrap();
        let default = ServerConfig::default();
        assert_eq!(parsed.listen_addr, default.listen_addr);
        assert_eq!(parsed.body_limit, default.body_limit);
        assert_eq!(parsed.build_timeout_secs, default.build_timeout_secs);
        assert_eq!(parsed.max_tiles, default.max_tiles);
        assert_eq!(parsed.max_output_width, default.max_output_width);
        assert_eq!(parsed.cors_enabled, default.cors_enabled);
    }

    #[test]
    fn public_url_trailing_slash_trimmed() {
        let config = ServerConfig {
            public_url: Some("https://mosaics.example.com/".into()),
            ..Default::default()
        };
        assert_eq!(
            config.effective_public_url(),
            "https://mosaics.example.com"
        );
    }

    #[test]
    fn explicit_listen_addr_used_for_public_url() {
        let config = ServerConfig {
            listen_addr: "127.0.0.1:9000".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(config.effective_public_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn rejects_bad_values() {
        let zero_timeout = ServerConfig {
            build_timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let bad_url = ServerConfig {
            public_url: Some("ftp://nope".into()),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let zero_tiles = ServerConfig {
            max_tiles: 0,
            ..Default::default()
        };
        assert!(zero_tiles.validate().is_err());
    }

    #[test]
    fn limits_reflect_config() {
        let config = ServerConfig {
            max_tiles: 5,
            max_output_width: 640,
            ..Default::default()
        };
        let limits = config.limits();
        assert_eq!(limits.max_tiles, 5);
        assert_eq!(limits.max_output_width, 640);
    }
}
