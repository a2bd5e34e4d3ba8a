//! Configuration file support for the mosaic server.
//!
//! Loads server configuration from `.mosaic/config.toml` (or JSON) and merges it
//! with CLI args and environment variables. Server settings live under the
//! `[server]` section; other sections are tolerated and ignored.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Profile overlay (`[profiles.<name>.server]`)
//! 4. Config file (`[server]`)
//! 5. Hardcoded defaults

use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Directory name searched for from cwd upward, then under `$HOME`.
pub const MOSAIC_DIR: &str = ".mosaic";

/// Config file names checked inside [`MOSAIC_DIR`], in order.
const CONFIG_FILE_NAMES: &[&str] = &["config.toml", "config.json"];

// ---------------------------------------------------------------------------
// File config serde types (all Option: absence means "not set in file")
// ---------------------------------------------------------------------------

/// Top-level config file structure. Only `server` and `profiles` are read.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MosaicFileConfig {
    /// Server configuration section `[server]`
    #[serde(default)]
    pub server: Option<ServerFileConfig>,

    /// Profile overrides `[profiles.<name>]`
    #[serde(default)]
    pub profiles: Option<HashMap<String, ProfileConfig>>,
}

/// A named profile containing server overrides.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileConfig {
    /// Server overrides for this profile `[profiles.<name>.server]`
    #[serde(default)]
    pub server: Option<ServerFileConfig>,
}

/// The `[server]` section. Every field is `Option` so the file only needs to
/// contain values the user wants to set.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ServerFileConfig {
    pub listen_addr: Option<String>,
    pub public_url: Option<String>,
    pub storage_path: Option<String>,
    pub ingest_dir: Option<String>,
    pub log_level: Option<String>,
    pub cors_enabled: Option<bool>,
    pub body_limit: Option<usize>,

    /// `[server.pipeline]`
    #[serde(default)]
    pub pipeline: Option<PipelineFileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PipelineFileConfig {
    pub build_timeout_secs: Option<u64>,
    pub max_concurrent_builds: Option<usize>,
    pub max_tiles: Option<usize>,
    pub max_output_width: Option<u32>,
}

// ---------------------------------------------------------------------------
// Config file loading
// ---------------------------------------------------------------------------

/// Load a config file from the given path. Detects format by extension:
/// `.json` → JSON, everything else → TOML.
pub fn load_config(path: &Path) -> Result<MosaicFileConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(MosaicFileConfig::default());
    }

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| ConfigFileError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    } else {
        toml::from_str(&content).map_err(|e| ConfigFileError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

/// Errors from config file loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
    #[error("Profile '{name}' not found in config file")]
    ProfileNotFound { name: String },
}

// ---------------------------------------------------------------------------
// Config file discovery
// ---------------------------------------------------------------------------

/// Find a config file in a directory. Logs a warning if more than one exists.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    let mut found = CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|p| p.is_file());
    let first = found.next()?;
    if found.next().is_some() {
        warn!(
            dir = %dir.display(),
            "Both config.toml and config.json found; using config.toml"
        );
    }
    Some(first)
}

/// Resolve the config file path.
///
/// 1. Use explicit `--config` override if provided
/// 2. Walk up from cwd looking for `.mosaic/config.{toml,json}`
/// 3. Check `~/.mosaic/config.{toml,json}` as global fallback
///
/// Returns `None` if no config file is found (this is not an error).
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.is_file() {
            return Some(p.to_path_buf());
        }
        if p.is_dir() {
            if let Some(found) = find_config_in_dir(p) {
                return Some(found);
            }
        }
        if let Some(found) = find_config_in_dir(&p.join(MOSAIC_DIR)) {
            return Some(found);
        }
        warn!(path = %p.display(), "Config file not found at specified path");
        return None;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut current = cwd;
        loop {
            if let Some(found) = find_config_in_dir(&current.join(MOSAIC_DIR)) {
                return Some(found);
            }
            if !current.pop() {
                break;
            }
        }
    }

    dirs::home_dir().and_then(|home| find_config_in_dir(&home.join(MOSAIC_DIR)))
}

// ---------------------------------------------------------------------------
// Deep merge (profile overlay onto base)
// ---------------------------------------------------------------------------

/// Deep-merge `overlay` onto `base`. Only `Some` values in the overlay replace
/// the corresponding base values; `None` in the overlay means "inherit from base".
pub fn deep_merge(base: &mut ServerFileConfig, overlay: &ServerFileConfig) {
    macro_rules! merge_field {
        ($field:ident) => {
            if overlay.$field.is_some() {
                base.$field = overlay.$field.clone();
            }
        };
    }

    merge_field!(listen_addr);
    merge_field!(public_url);
    merge_field!(storage_path);
    merge_field!(ingest_dir);
    merge_field!(log_level);
    merge_field!(cors_enabled);
    merge_field!(body_limit);

    if let Some(ref ovr) = overlay.pipeline {
        let b = base.pipeline.get_or_insert_with(Default::default);
        if ovr.build_timeout_secs.is_some() {
            b.build_timeout_secs = ovr.build_timeout_secs;
        }
        if ovr.max_concurrent_builds.is_some() {
            b.max_concurrent_builds = ovr.max_concurrent_builds;
        }
        if ovr.max_tiles.is_some() {
            b.max_tiles = ovr.max_tiles;
        }
        if ovr.max_output_width.is_some() {
            b.max_output_width = ovr.max_output_width;
        }
    }
}

// ---------------------------------------------------------------------------
// Apply file config to ServerConfig (value_source gating)
// ---------------------------------------------------------------------------

/// All clap arg IDs referenced by `apply_to_server_config`.
///
/// Checked by `test_config_file_arg_ids_match_server_config` so a renamed
/// `ServerConfig` field cannot silently stop honouring the file value.
pub const CONFIG_FILE_ARG_IDS: &[&str] = &[
    "listen_addr",
    "public_url",
    "storage_path",
    "ingest_dir",
    "log_level",
    "cors_enabled",
    "body_limit",
    "build_timeout_secs",
    "max_concurrent_builds",
    "max_tiles",
    "max_output_width",
];

/// Apply config file values to a `ServerConfig`, but only for fields where
/// the user did NOT provide a CLI argument or environment variable.
pub fn apply_to_server_config(
    file: &ServerFileConfig,
    config: &mut ServerConfig,
    matches: &ArgMatches,
) {
    use clap::parser::ValueSource;

    // For scalar fields with `default_value`, value_source is Some(DefaultValue).
    // For Option fields without defaults, value_source is None.
    let is_default = |arg_name: &str| -> bool {
        matches!(
            matches.value_source(arg_name),
            None | Some(ValueSource::DefaultValue)
        )
    };

    // NOTE: clap derive uses the field name (underscores) as the arg ID.
    if is_default("listen_addr") {
        if let Some(ref addr_str) = file.listen_addr {
            if let Ok(addr) = addr_str.parse::<SocketAddr>() {
                config.listen_addr = addr;
            } else {
                warn!(
                    value = addr_str,
                    "Invalid listen_addr in config file, ignoring"
                );
            }
        }
    }

    if is_default("public_url") {
        if let Some(ref url) = file.public_url {
            config.public_url = Some(url.clone());
        }
    }

    if is_default("storage_path") {
        if let Some(ref path) = file.storage_path {
            config.storage_path = Some(PathBuf::from(path));
        }
    }

    if is_default("ingest_dir") {
        if let Some(ref path) = file.ingest_dir {
            config.ingest_dir = Some(PathBuf::from(path));
        }
    }

    if is_default("log_level") {
        if let Some(ref level) = file.log_level {
            config.log_level = level.clone();
        }
    }

    if is_default("cors_enabled") {
        if let Some(v) = file.cors_enabled {
            config.cors_enabled = v;
        }
    }

    if is_default("body_limit") {
        if let Some(v) = file.body_limit {
            config.body_limit = v;
        }
    }

    if let Some(ref pipeline) = file.pipeline {
        if is_default("build_timeout_secs") {
            if let Some(v) = pipeline.build_timeout_secs {
                config.build_timeout_secs = v;
            }
        }
        if is_default("max_concurrent_builds") {
            if let Some(v) = pipeline.max_concurrent_builds {
                config.max_concurrent_builds = v;
            }
        }
        if is_default("max_tiles") {
            if let Some(v) = pipeline.max_tiles {
                config.max_tiles = v;
            }
        }
        if is_default("max_output_width") {
            if let Some(v) = pipeline.max_output_width {
                config.max_output_width = v;
            }
        }
    }
}

/// Resolve, load, overlay the selected profile, and apply to `config`.
pub fn load_and_merge_config(
    config: &mut ServerConfig,
    matches: &ArgMatches,
) -> Result<(), ConfigFileError> {
    let Some(path) = resolve_config_path(config.config_file.as_deref()) else {
        debug!("No config file found, using CLI args and defaults only");
        return Ok(());
    };

    info!(path = %path.display(), "Loading configuration file");

    let file_config = load_config(&path)?;
    let mut server_section = file_config.server.unwrap_or_default();

    if let Some(ref profile_name) = config.profile {
        let overlay = file_config
            .profiles
            .as_ref()
            .and_then(|profiles| profiles.get(profile_name))
            .ok_or_else(|| ConfigFileError::ProfileNotFound {
                name: profile_name.clone(),
            })?;
        if let Some(ref overlay) = overlay.server {
            info!(profile = profile_name, "Applying configuration profile");
            deep_merge(&mut server_section, overlay);
        }
    }

    apply_to_server_config(&server_section, config, matches);

    Ok(())
}
