//! Build parameters handed to the mosaic builder

use serde::Serialize;

/// Smallest accepted grid size
pub const MIN_GRID_NUM: u32 = 1;
/// Largest accepted grid size
pub const MAX_GRID_NUM: u32 = 100;
/// Default upper bound on `outputWidth`
pub const DEFAULT_MAX_OUTPUT_WIDTH: u32 = 10_000;
/// Default upper bound on the output height derived from the main image
pub const DEFAULT_MAX_OUTPUT_HEIGHT: u32 = 10_000;
/// Default upper bound on the number of tile files per request
pub const DEFAULT_MAX_TILES: usize = 50;
/// Tint strength applied to every placed tile
pub const DEFAULT_INTENSITY: f32 = 0.5;

/// Encoded format of the finished mosaic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// Tile selection policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MatchingAlgorithm {
    /// Pick the tile whose average colour is nearest the region's average
    #[default]
    #[serde(rename = "closestColor")]
    ClosestColor,
}

/// Validated, immutable parameters for one build
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildParameters {
    grid_num: u32,
    intensity: f32,
    output_format: OutputFormat,
    output_width: u32,
    matching_algorithm: MatchingAlgorithm,
}

impl BuildParameters {
    /// Parameters with the fixed intensity, format and matching policy.
    ///
    /// Only [`crate::validate`] should call this with user input; it does not
    /// re-check ranges.
    pub fn new(grid_num: u32, output_width: u32) -> Self {
        Self {
            grid_num,
            intensity: DEFAULT_INTENSITY,
            output_format: OutputFormat::Png,
            output_width,
            matching_algorithm: MatchingAlgorithm::ClosestColor,
        }
    }

    pub fn grid_num(&self) -> u32 {
        self.grid_num
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn output_width(&self) -> u32 {
        self.output_width
    }

    pub fn matching_algorithm(&self) -> MatchingAlgorithm {
        self.matching_algorithm
    }
}
