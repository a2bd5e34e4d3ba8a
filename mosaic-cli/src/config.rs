use crate::error::{CliError, CliResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const MOSAIC_DIR: &str = ".mosaic";

/// Default server root when neither `--server` nor `MOSAIC_SERVER_URL` is set.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8090";

/// Walk up from `start` looking for a `.mosaic/` directory.
fn find_mosaic_dir_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(MOSAIC_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Find `.mosaic/` by walking up from cwd. Returns `None` if not found.
pub fn find_mosaic_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_mosaic_dir_from(&cwd)
}

/// Resolve the client data directory, creating it if needed.
///
/// 1. explicit `--data-dir` / `MOSAIC_DATA_DIR`
/// 2. `.mosaic/` found walking up from cwd
/// 3. `~/.mosaic/`
pub fn resolve_data_dir(explicit: Option<&Path>) -> CliResult<PathBuf> {
    let dir = match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => std::env::current_dir()?.join(p),
        None => match find_mosaic_dir() {
            Some(found) => found,
            None => dirs::home_dir()
                .ok_or_else(|| {
                    CliError::Config(
                        "cannot determine home directory; pass --data-dir".to_string(),
                    )
                })?
                .join(MOSAIC_DIR),
        },
    };

    if dir.exists() && !dir.is_dir() {
        return Err(CliError::Config(format!(
            "data directory is not a directory: {}",
            dir.display()
        )));
    }
    fs::create_dir_all(&dir).map_err(|e| {
        CliError::Config(format!("cannot create data directory {}: {e}", dir.display()))
    })?;
    Ok(dir)
}
