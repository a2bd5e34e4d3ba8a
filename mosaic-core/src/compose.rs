//! Closest-colour photomosaic composition
//!
//! The main image is scaled to the output width (keeping its aspect ratio),
//! split into a `grid_num` x `grid_num` grid, and each cell is replaced by
//! the tile whose average colour is nearest the cell's average colour. The
//! placed tile is then blended toward the cell colour by `intensity`.

use crate::builder::{MosaicArtifact, MosaicBuilder, DEFAULT_ARTIFACT_STEM};
use crate::error::BuildError;
use crate::params::{BuildParameters, MatchingAlgorithm, DEFAULT_MAX_OUTPUT_HEIGHT};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Tiles are averaged from a thumbnail no larger than this on either side
const PALETTE_SAMPLE_SIZE: u32 = 64;

/// Bundled [`MosaicBuilder`] backed by the `image` crate
#[derive(Debug, Clone)]
pub struct ImageMosaicBuilder {
    filter: FilterType,
    max_output_height: u32,
}

impl Default for ImageMosaicBuilder {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
            max_output_height: DEFAULT_MAX_OUTPUT_HEIGHT,
        }
    }
}

impl ImageMosaicBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resampling filter used when scaling the main image and tiles
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Largest output height accepted. The height follows the main image's
    /// aspect ratio, so a tall narrow image can exceed it even when the
    /// requested width is small.
    pub fn with_max_output_height(mut self, max: u32) -> Self {
        self.max_output_height = max.max(1);
        self
    }
}

impl MosaicBuilder for ImageMosaicBuilder {
    fn build(
        &self,
        main_image: &Path,
        tiles: &[PathBuf],
        params: &BuildParameters,
    ) -> Result<MosaicArtifact, BuildError> {
        if tiles.is_empty() {
            return Err(BuildError::NoTiles);
        }

        let main = open_rgb(main_image)?;

        // Checked before any canvas is allocated.
        let width = params.output_width();
        let height = scaled_height(main.width(), main.height(), width);
        if height > self.max_output_height {
            return Err(BuildError::OutputTooLarge {
                width,
                height,
                max_height: self.max_output_height,
            });
        }

        let palette = tiles
            .iter()
            .map(|path| open_rgb(path).map(Tile::new))
            .collect::<Result<Vec<_>, _>>()?;

        let scaled = imageops::resize(&main, width, height, self.filter);

        let cols = params.grid_num().min(width).max(1);
        let rows = params.grid_num().min(height).max(1);
        let intensity = params.intensity().clamp(0.0, 1.0);

        let mut canvas = RgbImage::new(width, height);
        let mut resized: HashMap<(usize, u32, u32), RgbImage> = HashMap::new();

        for row in 0..rows {
            let y0 = edge(row, rows, height);
            let y1 = edge(row + 1, rows, height);
            for col in 0..cols {
                let x0 = edge(col, cols, width);
                let x1 = edge(col + 1, cols, width);
                let (cell_w, cell_h) = (x1 - x0, y1 - y0);
                if cell_w == 0 || cell_h == 0 {
                    continue;
                }

                let target = region_average(&scaled, x0, y0, cell_w, cell_h);
                let pick = match params.matching_algorithm() {
                    MatchingAlgorithm::ClosestColor => closest_tile(&palette, target),
                };

                let tile = resized.entry((pick, cell_w, cell_h)).or_insert_with(|| {
                    imageops::resize(&palette[pick].image, cell_w, cell_h, self.filter)
                });

                for (dx, dy, px) in tile.enumerate_pixels() {
                    canvas.put_pixel(x0 + dx, y0 + dy, tint(*px, target, intensity));
                }
            }
        }

        let format = params.output_format();
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut out, format.image_format())
            .map_err(BuildError::Encode)?;

        tracing::debug!(
            width,
            height,
            cols,
            rows,
            tiles = palette.len(),
            bytes = out.get_ref().len(),
            "mosaic composed"
        );

        Ok(MosaicArtifact {
            bytes: out.into_inner(),
            suggested_filename: format!("{}.{}", DEFAULT_ARTIFACT_STEM, format.extension()),
            content_type: format.content_type(),
        })
    }
}

struct Tile {
    image: RgbImage,
    average: Rgb<u8>,
}

impl Tile {
    fn new(image: RgbImage) -> Self {
        let average = if image.width() > PALETTE_SAMPLE_SIZE || image.height() > PALETTE_SAMPLE_SIZE {
            let sample = imageops::thumbnail(&image, PALETTE_SAMPLE_SIZE, PALETTE_SAMPLE_SIZE);
            region_average(&sample, 0, 0, sample.width(), sample.height())
        } else {
            region_average(&image, 0, 0, image.width(), image.height())
        };
        Self { image, average }
    }
}

/// Decode by content sniffing; ingested files may have lost their extension.
fn open_rgb(path: &Path) -> Result<RgbImage, BuildError> {
    let decode = || -> image::ImageResult<RgbImage> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(img.to_rgb8())
    };
    decode().map_err(|source| BuildError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Output height that keeps the source aspect ratio; never zero.
pub fn scaled_height(src_width: u32, src_height: u32, out_width: u32) -> u32 {
    if src_width == 0 {
        return 1;
    }
    let h = (u64::from(src_height) * u64::from(out_width) + u64::from(src_width) / 2)
        / u64::from(src_width);
    h.clamp(1, u64::from(u32::MAX)) as u32
}

/// Pixel offset of grid line `i` when `len` pixels are split into `parts`
fn edge(i: u32, parts: u32, len: u32) -> u32 {
    (u64::from(i) * u64::from(len) / u64::from(parts)) as u32
}

fn region_average(img: &RgbImage, x0: u32, y0: u32, w: u32, h: u32) -> Rgb<u8> {
    let mut sum = [0u64; 3];
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let Rgb(p) = *img.get_pixel(x, y);
            sum[0] += u64::from(p[0]);
            sum[1] += u64::from(p[1]);
            sum[2] += u64::from(p[2]);
        }
    }
    let n = u64::from(w) * u64::from(h);
    if n == 0 {
        return Rgb([0, 0, 0]);
    }
    Rgb(sum.map(|c| ((c + n / 2) / n) as u8))
}

fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| {
            let d = i32::from(*x) - i32::from(*y);
            (d * d) as u32
        })
        .sum()
}

/// Index of the tile nearest `target`; ties go to the earliest tile.
fn closest_tile(palette: &[Tile], target: Rgb<u8>) -> usize {
    palette
        .iter()
        .enumerate()
        .min_by_key(|(i, t)| (color_distance(t.average, target), *i))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn tint(px: Rgb<u8>, target: Rgb<u8>, intensity: f32) -> Rgb<u8> {
    let mut out = [0u8; 3];
    for (o, (p, t)) in out.iter_mut().zip(px.0.iter().zip(target.0.iter())) {
        let v = f32::from(*p) * (1.0 - intensity) + f32::from(*t) * intensity;
        *o = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(color))
    }

    fn save(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn scaled_height_keeps_aspect_ratio() {
        assert_eq!(scaled_height(200, 100, 250), 125);
        assert_eq!(scaled_height(100, 100, 7), 7);
        assert_eq!(scaled_height(10_000, 1, 5), 1);
    }

    #[test]
    fn edges_cover_full_length() {
        assert_eq!(edge(0, 3, 10), 0);
        assert_eq!(edge(3, 3, 10), 10);
        let widths: Vec<u32> = (0..3).map(|i| edge(i + 1, 3, 10) - edge(i, 3, 10)).collect();
        assert_eq!(widths.iter().sum::<u32>(), 10);
    }

    #[test]
    fn closest_tile_prefers_nearest_then_first() {
        let palette = vec![
            Tile::new(solid(2, 2, [255, 0, 0])),
            Tile::new(solid(2, 2, [0, 0, 255])),
            Tile::new(solid(2, 2, [255, 0, 0])),
        ];
        assert_eq!(closest_tile(&palette, Rgb([200, 10, 10])), 0);
        assert_eq!(closest_tile(&palette, Rgb([10, 10, 200])), 1);
    }

    #[test]
    fn tint_blends_toward_target() {
        assert_eq!(tint(Rgb([0, 0, 0]), Rgb([200, 100, 50]), 0.5), Rgb([100, 50, 25]));
        assert_eq!(tint(Rgb([10, 20, 30]), Rgb([0, 0, 0]), 0.0), Rgb([10, 20, 30]));
    }

    #[test]
    fn builds_png_with_matching_tiles() {
        let dir = tempfile::tempdir().unwrap();

        // Left half red, right half blue.
        let mut main = RgbImage::new(20, 10);
        for (x, _, px) in main.enumerate_pixels_mut() {
            *px = if x < 10 { Rgb([250, 0, 0]) } else { Rgb([0, 0, 250]) };
        }
        let main_path = save(dir.path(), "main.png", &main);
        let red = save(dir.path(), "red.png", &solid(8, 8, [255, 0, 0]));
        let blue = save(dir.path(), "blue.png", &solid(8, 8, [0, 0, 255]));

        let params = BuildParameters::new(2, 40);
        let artifact = ImageMosaicBuilder::new()
            .build(&main_path, &[red, blue], &params)
            .unwrap();

        assert_eq!(artifact.suggested_filename, "finalMosaic.png");
        assert_eq!(artifact.content_type, "image/png");

        let out = image::load_from_memory(&artifact.bytes).unwrap().to_rgb8();
        assert_eq!(out.width(), 40);
        assert_eq!(out.height(), 20);

        let left = out.get_pixel(5, 5);
        let right = out.get_pixel(35, 15);
        assert!(left[0] > 200 && left[2] < 50, "left cell {left:?}");
        assert!(right[2] > 200 && right[0] < 50, "right cell {right:?}");
    }

    #[test]
    fn grid_larger_than_output_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let main = save(dir.path(), "main.png", &solid(30, 30, [10, 200, 10]));
        let tile = save(dir.path(), "tile.png", &solid(4, 4, [0, 255, 0]));

        let params = BuildParameters::new(100, 5);
        let artifact = ImageMosaicBuilder::new()
            .build(&main, &[tile], &params)
            .unwrap();
        let out = image::load_from_memory(&artifact.bytes).unwrap();
        assert_eq!((out.width(), out.height()), (5, 5));
    }

    #[test]
    fn undecodable_tile_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let main = save(dir.path(), "main.png", &solid(4, 4, [0, 0, 0]));
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();

        let err = ImageMosaicBuilder::new()
            .build(&main, &[bad.clone()], &BuildParameters::new(2, 4))
            .unwrap_err();
        match err {
            BuildError::Decode { path, .. } => assert_eq!(path, bad),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn missing_main_image_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let tile = save(dir.path(), "tile.png", &solid(4, 4, [0, 0, 0]));
        let err = ImageMosaicBuilder::new()
            .build(&dir.path().join("gone.png"), &[tile], &BuildParameters::new(2, 4))
            .unwrap_err();
        assert!(matches!(err, BuildError::Decode { .. }));
    }

    #[test]
    fn tall_main_image_is_rejected_before_allocating() {
        let dir = tempfile::tempdir().unwrap();
        let main = save(dir.path(), "main.png", &solid(1, 4000, [10, 10, 10]));
        let tile = save(dir.path(), "tile.png", &solid(4, 4, [0, 0, 0]));

        let err = ImageMosaicBuilder::new()
            .build(&main, &[tile], &BuildParameters::new(10, 10_000))
            .unwrap_err();
        match err {
            BuildError::OutputTooLarge {
                width,
                height,
                max_height,
            } => {
                assert_eq!(width, 10_000);
                assert_eq!(height, 40_000_000);
                assert_eq!(max_height, DEFAULT_MAX_OUTPUT_HEIGHT);
            }
            other => panic!("expected OutputTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn height_cap_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let main = save(dir.path(), "main.png", &solid(10, 30, [10, 10, 10]));
        let tile = save(dir.path(), "tile.png", &solid(4, 4, [0, 0, 0]));
        let builder = ImageMosaicBuilder::new().with_max_output_height(30);

        // 10x30 scaled to width 10 is exactly at the cap.
        let ok = builder
            .build(&main, &[tile.clone()], &BuildParameters::new(2, 10))
            .unwrap();
        let out = image::load_from_memory(&ok.bytes).unwrap();
        assert_eq!((out.width(), out.height()), (10, 30));

        let err = builder
            .build(&main, &[tile], &BuildParameters::new(2, 11))
            .unwrap_err();
        assert!(matches!(err, BuildError::OutputTooLarge { height: 33, .. }));
    }

    #[test]
    fn no_tiles_is_an_error() {
        let err = ImageMosaicBuilder::new()
            .build(Path::new("main.png"), &[], &BuildParameters::new(2, 4))
            .unwrap_err();
        assert!(matches!(err, BuildError::NoTiles));
    }
}
