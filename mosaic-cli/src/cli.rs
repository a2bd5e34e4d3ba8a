use crate::config::DEFAULT_SERVER_URL;
use crate::remote_client::{DEFAULT_GRID_NUM, DEFAULT_OUTPUT_WIDTH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mosaic", about = "Photomosaic generator CLI", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Mosaic server base URL
    #[arg(long, global = true, env = "MOSAIC_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Directory holding the local gallery (defaults to .mosaic/ or ~/.mosaic/)
    #[arg(long, global = true, env = "MOSAIC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a main image and tiles and add the resulting mosaic to the gallery
    Generate {
        /// Image to reproduce as a mosaic
        main_image: PathBuf,

        /// Tile images (at least one)
        #[arg(required = true)]
        tiles: Vec<PathBuf>,

        /// Cells per row/column (1-100)
        #[arg(long, default_value_t = DEFAULT_GRID_NUM)]
        grid_num: u32,

        /// Width of the generated image in pixels
        #[arg(long, default_value_t = DEFAULT_OUTPUT_WIDTH)]
        output_width: u32,
    },

    /// List generated mosaics
    Gallery,

    /// Show one gallery entry
    Show {
        /// Zero-based gallery index
        index: usize,

        /// Zoom steps to apply in the viewer (each doubles, capped at 8x)
        #[arg(long, default_value_t = 0)]
        zoom: u32,
    },

    /// Download a gallery entry
    Download {
        /// Zero-based gallery index
        index: usize,

        /// Output path (defaults to the artifact's file name in cwd)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}
