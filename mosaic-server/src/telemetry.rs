//! Logging setup
//!
//! Builds a [`TelemetryConfig`] from the environment (with the server's
//! configured log level as fallback) and installs a global `tracing`
//! subscriber once.

use crate::config::ServerConfig;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Primary log filter (RUST_LOG env var)
    pub log_filter: String,
    /// Fallback log level if RUST_LOG not set
    pub default_level: String,
    /// Log format ("human" or "json")
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Human,
    Json,
}

impl TelemetryConfig {
    /// Create telemetry config with server config for CLI log level support
    pub fn with_server_config(server_config: &ServerConfig) -> Self {
        let rust_log = env::var("RUST_LOG").unwrap_or_default();
        let default_level = if rust_log.is_empty() {
            // Fallback to LOG_LEVEL env var, then server config
            env::var("LOG_LEVEL").unwrap_or_else(|_| server_config.log_level.clone())
        } else {
            server_config.log_level.clone()
        };

        Self::from_env_with_defaults(default_level)
    }

    fn from_env_with_defaults(default_level: String) -> Self {
        Self {
            log_filter: env::var("RUST_LOG").unwrap_or_default(),
            default_level,
            log_format: parse_log_format(&env::var("LOG_FORMAT").unwrap_or_default()),
        }
    }

    /// The filter directive that will actually be installed.
    pub fn effective_filter(&self) -> &str {
        if self.log_filter.is_empty() {
            &self.default_level
        } else {
            &self.log_filter
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let rust_log = env::var("RUST_LOG").unwrap_or_default();
        let default_level = if rust_log.is_empty() {
            env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
        } else {
            "info".to_string()
        };

        Self::from_env_with_defaults(default_level)
    }
}

fn parse_log_format(raw: &str) -> LogFormat {
    match raw.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Human,
    }
}

/// Initialize logging
///
/// Safe to call multiple times - will only initialize once.
pub fn init_logging(config: &TelemetryConfig) {
    // A global subscriber may already be set (e.g., from tests)
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("tracing subscriber already initialized, skipping");
        return;
    }

    let filter = EnvFilter::new(config.effective_filter());

    let fmt_layer = match config.log_format {
        // JSON output needs tracing-subscriber's `json` feature; compact until then.
        LogFormat::Json => tracing_subscriber::fmt::layer().compact().boxed(),
        LogFormat::Human => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    // try_init: another thread may have won the race since has_been_set()
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
