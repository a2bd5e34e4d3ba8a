use colored::Colorize;
use std::fmt;
use std::process;

/// Exit codes for the CLI.
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Data directory / configuration issues.
    Config(String),
    /// Bad file path, unreadable input.
    Input(String),
    /// Gallery entry out of range.
    NotFound(String),
    /// Gallery persistence failure.
    Gallery(crate::gallery::GalleryError),
    /// Argument / usage errors.
    Usage(String),
    /// Mosaic server request failed.
    Remote(crate::remote_client::RemoteError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Input(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::NotFound(msg) => write!(
                f,
                "{} {msg}\n  {} run 'mosaic gallery' to list stored mosaics",
                "error:".red().bold(),
                "help:".cyan().bold(),
            ),
            CliError::Gallery(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Remote(e @ crate::remote_client::RemoteError::Network(_)) => write!(
                f,
                "{} {e}\n  {} is the mosaic server running? set --server or MOSAIC_SERVER_URL",
                "error:".red().bold(),
                "help:".cyan().bold(),
            ),
            CliError::Remote(e) => write!(f, "{} {e}", "error:".red().bold()),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Input(e.to_string())
    }
}

impl From<crate::gallery::GalleryError> for CliError {
    fn from(e: crate::gallery::GalleryError) -> Self {
        match e {
            crate::gallery::GalleryError::IndexOutOfRange { .. } => {
                CliError::NotFound(e.to_string())
            }
            other => CliError::Gallery(other),
        }
    }
}

impl From<crate::remote_client::RemoteError> for CliError {
    fn from(e: crate::remote_client::RemoteError) -> Self {
        CliError::Remote(e)
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
