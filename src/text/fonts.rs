use ab_glyph::{point, Font, FontArc, FontVec, PxScale, ScaleFont};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{bitmap, mask::CoverageMask};
use crate::config::CompositorConfig;

/// A usable font face
#[derive(Clone)]
pub enum FontFace {
    /// TrueType / OpenType outlines
    Outline(FontArc),

    /// The built-in 8x8 bitmap face
    Bitmap,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline(_) => f.write_str("FontFace::Outline"),
            Self::Bitmap => f.write_str("FontFace::Bitmap"),
        }
    }
}

impl FontFace {
    /// Parse font file bytes
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self, String> {
        FontVec::try_from_vec_and_index(data, index)
            .map(|font| Self::Outline(FontArc::new(font)))
            .map_err(|e| format!("invalid font data: {}", e))
    }

    /// Load a font file from disk
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let data = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        Self::from_bytes(data, 0)
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self, Self::Bitmap)
    }

    /// Line advance before the gap: the bottom edge of the glyph `A` below
    /// the line top. The same for every line regardless of its content.
    pub fn reference_height(&self, font_size: u32) -> u32 {
        match self {
            Self::Bitmap => bitmap::reference_height(font_size),
            Self::Outline(font) => {
                let scale = PxScale::from(font_size as f32);
                let ascent = font.as_scaled(scale).ascent();
                let glyph = font
                    .glyph_id('A')
                    .with_scale_and_position(scale, point(0.0, ascent));

                match font.outline_glyph(glyph) {
                    Some(outlined) => outlined.px_bounds().max.y.ceil().max(0.0) as u32,
                    None => ascent.ceil().max(0.0) as u32,
                }
            }
        }
    }

    /// Rasterize one line of text anchored at its top-left corner, with
    /// `padding` spare pixels on every side for an outline
    ///
    /// Returns `None` when the line would not fit in a mask.
    pub fn rasterize_line(&self, line: &str, font_size: u32, padding: u32) -> Option<CoverageMask> {
        match self {
            Self::Bitmap => bitmap::rasterize_line(line, font_size, padding),
            Self::Outline(font) => rasterize_outline_line(font, line, font_size, padding),
        }
    }
}

fn rasterize_outline_line(font: &FontArc, line: &str, font_size: u32, padding: u32) -> Option<CoverageMask> {
    let scale = PxScale::from(font_size as f32);
    let scaled = font.as_scaled(scale);
    let ascent = scaled.ascent();

    let mut caret = 0.0f32;
    let mut previous = None;
    let mut outlines = Vec::new();
    for ch in line.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, ascent));
        caret += scaled.h_advance(id);
        previous = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            outlines.push(outlined);
        }
    }

    // Union of the layout box and every glyph's pixel bounds
    let (mut min_x, mut min_y) = (0.0f32, 0.0f32);
    let (mut max_x, mut max_y) = (caret, ascent - scaled.descent());
    for outlined in &outlines {
        let bounds = outlined.px_bounds();
        min_x = min_x.min(bounds.min.x);
        min_y = min_y.min(bounds.min.y);
        max_x = max_x.max(bounds.max.x);
        max_y = max_y.max(bounds.max.y);
    }

    let pad = i64::from(padding);
    let origin_x = min_x.floor() as i64 - pad;
    let origin_y = min_y.floor() as i64 - pad;
    let width = (max_x.ceil() as i64 + pad - origin_x).max(0);
    let height = (max_y.ceil() as i64 + pad - origin_y).max(0);

    let mut mask = CoverageMask::new(
        u32::try_from(width).ok()?,
        u32::try_from(height).ok()?,
        i32::try_from(origin_x).ok()?,
        i32::try_from(origin_y).ok()?,
    )?;
    for outlined in &outlines {
        let bounds = outlined.px_bounds();
        let left = bounds.min.x as i32;
        let top = bounds.min.y as i32;
        outlined.draw(|x, y, coverage| {
            mask.add(left + x as i32, top + y as i32, coverage);
        });
    }
    Some(mask)
}

/// Turns font references from overlay specs into faces
///
/// A reference is tried as a file path, then as a file name inside the
/// configured fonts directory, then as an installed family name.
pub struct FontResolver {
    fonts_dir: PathBuf,
    default_face: FontFace,
    #[cfg(feature = "system-fonts")]
    system: Option<fontdb::Database>,
}

impl FontResolver {
    pub fn new(config: &CompositorConfig) -> Self {
        #[cfg(feature = "system-fonts")]
        let system = config.system_fonts.then(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            debug!("Loaded {} system font faces", db.len());
            db
        });

        let mut resolver = Self {
            fonts_dir: config.fonts_dir.clone(),
            default_face: FontFace::Bitmap,
            #[cfg(feature = "system-fonts")]
            system,
        };
        resolver.default_face = resolver.find_default(config.default_font.as_deref());
        resolver
    }

    fn find_default(&self, configured: Option<&Path>) -> FontFace {
        if let Some(path) = configured {
            match FontFace::from_file(path) {
                Ok(face) => return face,
                Err(reason) => warn!("Default font {:?} unusable: {}", path, reason),
            }
        }

        if let Some(face) = self.system_face(None) {
            return face;
        }

        debug!("No outline default font available, using built-in bitmap face");
        FontFace::Bitmap
    }

    pub fn default_face(&self) -> &FontFace {
        &self.default_face
    }

    /// Resolve a font reference, or explain why it could not be resolved
    pub fn resolve(&self, reference: &str) -> Result<FontFace, String> {
        let direct = Path::new(reference);
        if direct.is_file() {
            return FontFace::from_file(direct);
        }

        let bundled = self.fonts_dir.join(reference);
        if bundled.is_file() {
            return FontFace::from_file(&bundled);
        }

        if let Some(face) = self.system_face(Some(reference)) {
            return Ok(face);
        }

        Err(format!(
            "not a file, not found in {}, and not an installed family",
            self.fonts_dir.display()
        ))
    }

    /// Resolve an optional reference, substituting the default face on failure
    ///
    /// Returns the face and, when a substitution happened, the reason.
    pub fn resolve_or_default(&self, reference: Option<&str>) -> (FontFace, Option<String>) {
        match reference.map(str::trim).filter(|r| !r.is_empty()) {
            None => (self.default_face.clone(), None),
            Some(reference) => match self.resolve(reference) {
                Ok(face) => (face, None),
                Err(reason) => (self.default_face.clone(), Some(reason)),
            },
        }
    }

    /// Look up an installed family by name, or the sans-serif default for `None`
    #[cfg(feature = "system-fonts")]
    fn system_face(&self, family: Option<&str>) -> Option<FontFace> {
        let db = self.system.as_ref()?;
        let families = [family.map_or(fontdb::Family::SansSerif, fontdb::Family::Name)];
        let id = db.query(&fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        })?;

        db.with_face_data(id, |data, index| FontFace::from_bytes(data.to_vec(), index).ok())
            .flatten()
    }

    #[cfg(not(feature = "system-fonts"))]
    fn system_face(&self, _family: Option<&str>) -> Option<FontFace> {
        None
    }
}
