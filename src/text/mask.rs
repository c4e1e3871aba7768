use image::{GrayImage, Luma, Pixel, Rgba, RgbaImage};
use imageproc::distance_transform::euclidean_squared_distance_transform;

use crate::composition::types::Color;

/// Masks above this many pixels are refused
const MAX_PIXELS: u32 = 1 << 28;

/// Coverage from which a pixel counts as part of the glyph when outlining
const SOLID: u8 = 128;

/// Anti-aliased glyph coverage for one rendered line
///
/// Pixel `(0, 0)` of the mask sits at `(origin_x, origin_y)` relative to the
/// line's top-left anchor. Glyph overhang and stroke padding make the origin
/// negative.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    coverage: GrayImage,
    origin_x: i32,
    origin_y: i32,
}

impl CoverageMask {
    /// Create an empty mask, or `None` when the size is out of reach
    pub fn new(width: u32, height: u32, origin_x: i32, origin_y: i32) -> Option<Self> {
        let pixels = width.checked_mul(height)?;
        if pixels > MAX_PIXELS {
            return None;
        }

        Some(Self {
            coverage: GrayImage::new(width, height),
            origin_x,
            origin_y,
        })
    }

    pub fn width(&self) -> u32 {
        self.coverage.width()
    }

    pub fn height(&self) -> u32 {
        self.coverage.height()
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width() as i32 && y < self.height() as i32
    }

    /// Coverage at mask coordinates, 0.0 outside the mask
    pub fn get(&self, x: i32, y: i32) -> f32 {
        if !self.contains(x, y) {
            return 0.0;
        }
        self.coverage.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
    }

    /// Accumulate coverage at line-relative coordinates (overlapping glyphs keep the max)
    pub fn add(&mut self, line_x: i32, line_y: i32, coverage: f32) {
        let x = line_x - self.origin_x;
        let y = line_y - self.origin_y;
        if !self.contains(x, y) {
            return;
        }
        let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let cell = self.coverage.get_pixel_mut(x as u32, y as u32);
        cell[0] = cell[0].max(value);
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.pixels().all(|p| p[0] == 0)
    }

    /// Grow the coverage outward by a disc of `radius` pixels
    ///
    /// Pixels at least half covered seed the disc; everything within
    /// `radius` of one of them becomes fully covered. The mask must already
    /// carry `radius` pixels of padding on every side.
    pub fn dilate(&self, radius: u32) -> CoverageMask {
        if radius == 0 || self.width() == 0 || self.height() == 0 {
            return self.clone();
        }

        let solid = GrayImage::from_fn(self.width(), self.height(), |x, y| {
            let covered = self.coverage.get_pixel(x, y)[0] >= SOLID;
            Luma([if covered { 255 } else { 0 }])
        });
        if solid.pixels().all(|p| p[0] == 0) {
            return self.clone();
        }
        let distances = euclidean_squared_distance_transform(&solid);
        let reach = f64::from(radius) * f64::from(radius);

        let coverage = GrayImage::from_fn(self.width(), self.height(), |x, y| {
            if distances.get_pixel(x, y)[0] <= reach {
                Luma([255])
            } else {
                *self.coverage.get_pixel(x, y)
            }
        });

        CoverageMask {
            coverage,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
        }
    }

    /// Blend this mask onto `layer` with the line anchored at `(x, y)`
    ///
    /// When an outline is given its coverage is painted in the outline color
    /// and the fill is blended over it before the combined pixel touches the
    /// layer, so outline and fill land as one paint operation.
    pub fn paint(&self, layer: &mut RgbaImage, x: i32, y: i32, color: Color, outline: Option<(&CoverageMask, Color)>) {
        let (mut left, mut top) = self.origin();
        let mut right = self.origin_x + self.width() as i32;
        let mut bottom = self.origin_y + self.height() as i32;
        if let Some((stroke, _)) = outline {
            left = left.min(stroke.origin_x);
            top = top.min(stroke.origin_y);
            right = right.max(stroke.origin_x + stroke.width() as i32);
            bottom = bottom.max(stroke.origin_y + stroke.height() as i32);
        }

        // Clip to the layer
        let left = left.max(-x);
        let top = top.max(-y);
        let right = right.min(layer.width() as i32 - x);
        let bottom = bottom.min(layer.height() as i32 - y);

        for line_y in top..bottom {
            for line_x in left..right {
                let fill = self.get(line_x - self.origin_x, line_y - self.origin_y);
                let mut source = Rgba([0, 0, 0, 0]);
                if let Some((stroke, stroke_color)) = outline {
                    let coverage = stroke.get(line_x - stroke.origin_x, line_y - stroke.origin_y);
                    if coverage > 0.0 {
                        source = stroke_color.with_coverage(coverage);
                    }
                }
                if fill > 0.0 {
                    source.blend(&color.with_coverage(fill));
                }
                if source[3] == 0 {
                    continue;
                }

                layer.get_pixel_mut((x + line_x) as u32, (y + line_y) as u32).blend(&source);
            }
        }
    }
}
