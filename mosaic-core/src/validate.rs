//! Validation layer
//!
//! Rules run in a fixed order and stop at the first failure:
//!
//! 1. `mainImage` present
//! 2. `tiles` present, non-empty and within the tile limit
//! 3. `gridNum` is an integer in `[1, 100]`
//! 4. `outputWidth` is an integer in `[1, max_output_width]`
//!
//! Validation is pure: it never touches the filesystem.

use crate::error::ValidationError;
use crate::params::{
    BuildParameters, DEFAULT_MAX_OUTPUT_WIDTH, DEFAULT_MAX_TILES, MAX_GRID_NUM, MIN_GRID_NUM,
};
use crate::request::{UploadRequest, UploadedFile};

/// Request-size limits enforced during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_tiles: usize,
    pub max_output_width: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tiles: DEFAULT_MAX_TILES,
            max_output_width: DEFAULT_MAX_OUTPUT_WIDTH,
        }
    }
}

/// A request that passed validation, borrowing its files
#[derive(Debug, Clone)]
pub struct ValidatedUpload<'a> {
    pub main_image: &'a UploadedFile,
    pub tiles: &'a [UploadedFile],
    pub params: BuildParameters,
}

/// Validate an upload request against `limits`.
pub fn validate<'a>(
    request: &'a UploadRequest,
    limits: &Limits,
) -> Result<ValidatedUpload<'a>, ValidationError> {
    let main_image = request
        .main_image
        .as_ref()
        .ok_or(ValidationError::MissingMainImage)?;

    if request.tiles.is_empty() {
        return Err(ValidationError::MissingTiles);
    }
    if request.tiles.len() > limits.max_tiles {
        return Err(ValidationError::TooManyTiles {
            count: request.tiles.len(),
            max: limits.max_tiles,
        });
    }

    let grid_num = parse_bounded(
        request.grid_num.as_deref(),
        MIN_GRID_NUM,
        MAX_GRID_NUM,
        "gridNum",
    )
    .map_err(ValidationError::InvalidGridNum)?;

    let output_width = parse_bounded(
        request.output_width.as_deref(),
        1,
        limits.max_output_width,
        "outputWidth",
    )
    .map_err(ValidationError::InvalidOutputWidth)?;

    Ok(ValidatedUpload {
        main_image,
        tiles: &request.tiles,
        params: BuildParameters::new(grid_num, output_width),
    })
}

/// Parse a base-10 integer and check it lies in `[min, max]`.
///
/// Returns a human-readable reason on failure.
fn parse_bounded(raw: Option<&str>, min: u32, max: u32, field: &str) -> Result<u32, String> {
    let raw = raw.ok_or_else(|| format!("{field} is required"))?;
    let trimmed = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    let value: i64 = trimmed
        .parse()
        .map_err(|_| format!("'{trimmed}' is not an integer"))?;

    if value < i64::from(min) || value > i64::from(max) {
        return Err(format!("must be between {min} and {max}, got {value}"));
    }
    // Range check above guarantees the value fits.
    u32::try_from(value).map_err(|_| format!("must be between {min} and {max}, got {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{MatchingAlgorithm, OutputFormat, DEFAULT_INTENSITY};

    fn file(field: &str) -> UploadedFile {
        UploadedFile::new(field, vec![0u8; 4]).with_file_name(format!("{field}.png"))
    }

    fn valid_request() -> UploadRequest {
        UploadRequest::new()
            .main_image(file("mainImage"))
            .tile(file("tiles"))
            .tile(file("tiles"))
            .grid_num("10")
            .output_width("250")
    }

    #[test]
    fn accepts_valid_request_with_fixed_parameters() {
        let req = valid_request();
        let validated = validate(&req, &Limits::default()).unwrap();
        assert_eq!(validated.tiles.len(), 2);
        assert_eq!(validated.params.grid_num(), 10);
        assert_eq!(validated.params.output_width(), 250);
        assert_eq!(validated.params.intensity(), DEFAULT_INTENSITY);
        assert_eq!(validated.params.output_format(), OutputFormat::Png);
        assert_eq!(
            validated.params.matching_algorithm(),
            MatchingAlgorithm::ClosestColor
        );
    }

    #[test]
    fn accepts_every_grid_num_in_range() {
        for n in 1..=100 {
            let req = valid_request().grid_num(n.to_string());
            let validated = validate(&req, &Limits::default())
                .unwrap_or_else(|e| panic!("gridNum {n} rejected: {e}"));
            assert_eq!(validated.params.grid_num(), n);
        }
    }

    #[test]
    fn accepts_output_width_bounds() {
        for w in ["1", "800", "10000"] {
            let req = valid_request().output_width(w);
            assert!(validate(&req, &Limits::default()).is_ok(), "width {w}");
        }
    }

    #[test]
    fn rejects_out_of_range_or_non_numeric_grid_num() {
        for bad in ["0", "101", "-5", "abc", "", "10.5", "1e2"] {
            let req = valid_request().grid_num(bad);
            let err = validate(&req, &Limits::default()).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidGridNum(_)),
                "gridNum {bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_missing_grid_num() {
        let mut req = valid_request();
        req.grid_num = None;
        assert!(matches!(
            validate(&req, &Limits::default()),
            Err(ValidationError::InvalidGridNum(_))
        ));
    }

    #[test]
    fn rejects_bad_output_width() {
        for bad in ["0", "-1", "10001", "wide", "99999999999999999999"] {
            let req = valid_request().output_width(bad);
            let err = validate(&req, &Limits::default()).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidOutputWidth(_)),
                "outputWidth {bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn output_width_bound_is_configurable() {
        let limits = Limits {
            max_output_width: 500,
            ..Limits::default()
        };
        let req = valid_request().output_width("501");
        assert!(matches!(
            validate(&req, &limits),
            Err(ValidationError::InvalidOutputWidth(_))
        ));
    }

    #[test]
    fn trims_whitespace() {
        let req = valid_request().grid_num(" 42 ").output_width("\t300\n");
        let validated = validate(&req, &Limits::default()).unwrap();
        assert_eq!(validated.params.grid_num(), 42);
        assert_eq!(validated.params.output_width(), 300);
    }

    #[test]
    fn non_ascii_whitespace_is_not_trimmed() {
        for bad in ["\u{a0}10", "10\u{2003}", "\u{3000}10\u{3000}"] {
            let req = valid_request().grid_num(bad);
            assert!(
                matches!(
                    validate(&req, &Limits::default()),
                    Err(ValidationError::InvalidGridNum(_))
                ),
                "gridNum {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_main_image_checked_first() {
        let req = UploadRequest::new().grid_num("0");
        assert_eq!(
            validate(&req, &Limits::default()).unwrap_err(),
            ValidationError::MissingMainImage
        );
    }

    #[test]
    fn zero_tiles_always_missing_tiles() {
        for (grid, width) in [("10", "250"), ("0", "0"), ("abc", "xyz"), ("101", "1")] {
            let req = UploadRequest::new()
                .main_image(file("mainImage"))
                .grid_num(grid)
                .output_width(width);
            assert_eq!(
                validate(&req, &Limits::default()).unwrap_err(),
                ValidationError::MissingTiles
            );
        }
    }

    #[test]
    fn too_many_tiles_rejected() {
        let mut req = valid_request();
        req.tiles = (0..51).map(|_| file("tiles")).collect();
        assert_eq!(
            validate(&req, &Limits::default()).unwrap_err(),
            ValidationError::TooManyTiles { count: 51, max: 50 }
        );
    }

    #[test]
    fn grid_num_checked_before_output_width() {
        let req = valid_request().grid_num("0").output_width("0");
        assert!(matches!(
            validate(&req, &Limits::default()),
            Err(ValidationError::InvalidGridNum(_))
        ));
    }
}
