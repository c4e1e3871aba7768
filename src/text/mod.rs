//! # Text Rendering
//!
//! Font resolution with a built-in fallback face, per-line rasterization into
//! coverage masks, and painting of outlined, shadowed text blocks onto a
//! transparent layer.

pub mod bitmap;
pub mod fonts;
pub mod mask;

pub use fonts::{FontFace, FontResolver};
pub use mask::CoverageMask;

use image::RgbaImage;
use tracing::debug;

use crate::composition::types::TextOverlaySpec;

/// Paint one text block onto `layer`
///
/// Lines start at the spec's position and advance by the face's reference
/// height plus `line_gap`. For every line the shadow (if active) goes down
/// first, then outline and fill together.
pub fn paint_text_block(layer: &mut RgbaImage, face: &FontFace, spec: &TextOverlaySpec, line_gap: u32) -> Result<(), String> {
    let line_height = i32::try_from(face.reference_height(spec.font_size).saturating_add(line_gap)).unwrap_or(i32::MAX);
    let padding = spec.stroke_width;
    let (x, mut y) = (spec.position.x, spec.position.y);

    for (number, line) in spec.lines().enumerate() {
        if !line.is_empty() {
            let fill = face
                .rasterize_line(line, spec.font_size, padding)
                .ok_or_else(|| format!("line {} is too large to render", number + 1))?;

            if let Some((shadow_color, offset)) = spec.shadow() {
                fill.paint(layer, x + offset.dx, y + offset.dy, shadow_color, None);
            }

            match spec.stroke() {
                Some((width, stroke_color)) => {
                    let outline = fill.dilate(width);
                    fill.paint(layer, x, y, spec.text_color, Some((&outline, stroke_color)));
                }
                None => fill.paint(layer, x, y, spec.text_color, None),
            }
        }

        debug!("Painted line {:?} at ({}, {})", line, x, y);
        y = y.saturating_add(line_height);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::types::Color;
    use std::path::PathBuf;

    fn outline_face() -> FontFace {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fonts").join("Tuffy.ttf");
        FontFace::from_file(&path).unwrap()
    }

    fn painted_rows(layer: &RgbaImage) -> Vec<u32> {
        (0..layer.height())
            .filter(|&y| (0..layer.width()).any(|x| layer.get_pixel(x, y)[3] > 0))
            .collect()
    }

    #[test]
    fn test_second_line_starts_after_reference_height_and_gap() {
        let mut layer = RgbaImage::new(64, 64);
        let spec = TextOverlaySpec::new("A\nB").with_size(16).at(4, 10).with_stroke(0, Color::BLACK);
        paint_text_block(&mut layer, &FontFace::Bitmap, &spec, 5).unwrap();

        let rows = painted_rows(&layer);
        // 'A' covers 7 bitmap rows at scale 2
        assert_eq!(rows.first(), Some(&10));
        assert!(rows.contains(&23));
        assert!(!rows.contains(&24));
        // 'B' starts at y0 + 14 + 5
        let first_b_row = rows.iter().copied().find(|&r| r > 23).unwrap();
        assert_eq!(first_b_row, 10 + 14 + 5);
    }

    #[test]
    fn test_blank_lines_still_advance() {
        let mut layer = RgbaImage::new(64, 64);
        let spec = TextOverlaySpec::new("\nB").with_size(8).at(0, 0).with_stroke(0, Color::BLACK);
        paint_text_block(&mut layer, &FontFace::Bitmap, &spec, 5).unwrap();

        assert_eq!(painted_rows(&layer).first(), Some(&(7 + 5)));
    }

    #[test]
    fn test_stroke_extends_beyond_fill() {
        let mut plain = RgbaImage::new(48, 48);
        let spec = TextOverlaySpec::new("I").with_size(16).at(10, 10).with_stroke(0, Color::BLACK);
        paint_text_block(&mut plain, &FontFace::Bitmap, &spec, 5).unwrap();

        let mut outlined = RgbaImage::new(48, 48);
        let spec = spec.with_stroke(2, Color::BLACK);
        paint_text_block(&mut outlined, &FontFace::Bitmap, &spec, 5).unwrap();

        let count = |layer: &RgbaImage| layer.pixels().filter(|p| p[3] > 0).count();
        assert!(count(&outlined) > count(&plain));

        // Fill pixels keep the text color on top of the outline
        for (x, y, pixel) in plain.enumerate_pixels() {
            if pixel[3] > 0 {
                assert_eq!(outlined.get_pixel(x, y), pixel);
            }
        }
        // Directly above the first row of 'I' is outline only
        assert_eq!(outlined.get_pixel(16, 9).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_outline_second_line_starts_after_reference_height_and_gap() {
        let face = outline_face();
        let advance = face.reference_height(40) + 5;

        let mut single = RgbaImage::new(120, 160);
        let spec = TextOverlaySpec::new("A").with_size(40).at(4, 10).with_stroke(0, Color::BLACK);
        paint_text_block(&mut single, &face, &spec, 5).unwrap();

        let mut double = RgbaImage::new(120, 160);
        let spec = TextOverlaySpec::new("A\nA").with_size(40).at(4, 10).with_stroke(0, Color::BLACK);
        paint_text_block(&mut double, &face, &spec, 5).unwrap();

        // The second line is the first one moved down by exactly one advance
        let mut painted = 0;
        for (x, y, pixel) in single.enumerate_pixels() {
            if pixel[3] > 0 {
                painted += 1;
                assert_eq!(double.get_pixel(x, y + advance), pixel);
            }
        }
        assert!(painted > 0);
        assert_eq!(painted_rows(&double).first(), painted_rows(&single).first());
    }

    #[test]
    fn test_outline_stroke_extends_beyond_fill() {
        let face = outline_face();

        let mut plain = RgbaImage::new(120, 80);
        let spec = TextOverlaySpec::new("A").with_size(40).at(10, 10).with_stroke(0, Color::BLACK);
        paint_text_block(&mut plain, &face, &spec, 5).unwrap();

        let mut outlined = RgbaImage::new(120, 80);
        let spec = spec.with_stroke(3, Color::BLACK);
        paint_text_block(&mut outlined, &face, &spec, 5).unwrap();

        let count = |layer: &RgbaImage| layer.pixels().filter(|p| p[3] > 0).count();
        assert!(count(&outlined) > count(&plain));

        // Solid fill pixels stay white over the outline
        for (x, y, pixel) in plain.enumerate_pixels() {
            if pixel[3] == 255 {
                assert_eq!(outlined.get_pixel(x, y).0, [255, 255, 255, 255]);
            }
        }
        // Outline pixels sit where the plain text left the layer empty
        let outline_only = outlined
            .enumerate_pixels()
            .filter(|(x, y, pixel)| pixel.0 == [0, 0, 0, 255] && plain.get_pixel(*x, *y)[3] == 0)
            .count();
        assert!(outline_only > 0);
    }

    #[test]
    fn test_line_too_large_is_an_error() {
        let mut layer = RgbaImage::new(32, 32);
        let spec = TextOverlaySpec::new("Title").with_stroke(40_000, Color::BLACK);

        let err = paint_text_block(&mut layer, &FontFace::Bitmap, &spec, 5).unwrap_err();
        assert!(err.contains("line 1"));
        assert!(layer.pixels().all(|p| p[3] == 0));
    }
}
