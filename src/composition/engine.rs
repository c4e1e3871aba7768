use image::{imageops, DynamicImage, ImageFormat, ImageOutputFormat, Rgb, RgbImage, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{
    composition::types::{Color, Composition, CompositionRequest, ImageOverlaySpec},
    config::CompositorConfig,
    error::{CompositionError, FontResolutionWarning, Result},
    text::{self, FontResolver},
};

/// Flattens a base image, text overlays and an optional image overlay into
/// one opaque output image
///
/// The compositor follows a fixed pipeline:
/// 1. Load the base image as RGBA
/// 2. Paint every text block, in order, onto a transparent layer
/// 3. Alpha-composite the text layer over the base
/// 4. Resize and paste the image overlay using its own alpha
/// 5. Flatten to RGB and persist atomically
///
/// It holds no mutable state, so one instance can serve any number of
/// sequential compositions.
pub struct Compositor {
    config: CompositorConfig,
    fonts: FontResolver,
}

impl Compositor {
    /// Create a compositor, loading the font database once
    pub fn new(config: CompositorConfig) -> Self {
        let fonts = FontResolver::new(&config);
        Self { config, fonts }
    }

    /// Compose `request` onto the image at `base_path` and write the result
    /// to `output_path`
    ///
    /// The output format follows the destination extension (PNG or JPEG).
    /// Nothing is written unless the whole composition succeeds.
    pub fn compose<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        base_path: P,
        request: &CompositionRequest,
        output_path: Q,
    ) -> Result<Composition> {
        let base_path = base_path.as_ref();
        let output_path = output_path.as_ref();

        info!("🎨 Composing cover");
        info!("   Base: {:?}", base_path);
        info!("   Output: {:?}", output_path);
        info!("   Text blocks: {}, image overlay: {}", request.texts.len(), request.image.is_some());

        let format = self.output_format(output_path)?;
        request.validate()?;

        let base = image::open(base_path)
            .map_err(|e| CompositionError::BaseImageUnreadable {
                path: base_path.display().to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();

        let (flattened, warnings) = self.render(&base, request)?;
        self.persist(&flattened, output_path, format)?;

        info!("   ✅ Cover saved to {:?} ({} font warnings)", output_path, warnings.len());
        Ok(Composition {
            output_path: output_path.to_path_buf(),
            warnings,
        })
    }

    /// In-memory composition: returns the flattened image and any font
    /// warnings. `base` is left untouched.
    pub fn render(
        &self,
        base: &RgbaImage,
        request: &CompositionRequest,
    ) -> Result<(RgbImage, Vec<FontResolutionWarning>)> {
        request.validate()?;

        let (text_layer, warnings) = self.render_text_layer(base.width(), base.height(), request)?;

        let mut merged = base.clone();
        imageops::overlay(&mut merged, &text_layer, 0, 0);

        if let Some(spec) = &request.image {
            let overlay = self.load_overlay(spec)?;
            debug!("Pasting overlay {}x{} at ({}, {})",
                   overlay.width(), overlay.height(), spec.position.x, spec.position.y);
            imageops::overlay(&mut merged, &overlay, spec.position.x as i64, spec.position.y as i64);
        }

        Ok((flatten(&merged, self.config.background), warnings))
    }

    /// Paint all text blocks onto a fresh transparent layer
    pub fn render_text_layer(
        &self,
        width: u32,
        height: u32,
        request: &CompositionRequest,
    ) -> Result<(RgbaImage, Vec<FontResolutionWarning>)> {
        let mut layer = RgbaImage::new(width, height);
        let mut warnings = Vec::new();

        for (index, spec) in request.texts.iter().enumerate() {
            let (face, failure) = self.fonts.resolve_or_default(spec.font.as_deref());
            if let Some(reason) = failure {
                let warning = FontResolutionWarning {
                    spec_index: index,
                    font: spec.font.clone().unwrap_or_default(),
                    reason,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            debug!("Text block #{}: {} line(s), size {}px at ({}, {})",
                   index, spec.lines().count(), spec.font_size, spec.position.x, spec.position.y);
            text::paint_text_block(&mut layer, &face, spec, self.config.line_gap)
                .map_err(|details| CompositionError::InvalidOverlay { index, details })?;
        }

        Ok((layer, warnings))
    }

    /// Decode an overlay image and resize it to exactly the requested size
    pub fn load_overlay(&self, spec: &ImageOverlaySpec) -> Result<RgbaImage> {
        let overlay = image::open(&spec.source)
            .map_err(|e| CompositionError::OverlayImage {
                path: spec.source.display().to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();

        Ok(imageops::resize(&overlay, spec.width, spec.height, imageops::FilterType::CatmullRom))
    }

    fn output_format(&self, output_path: &Path) -> Result<ImageOutputFormat> {
        match ImageFormat::from_path(output_path) {
            Ok(ImageFormat::Png) => Ok(ImageOutputFormat::Png),
            Ok(ImageFormat::Jpeg) => Ok(ImageOutputFormat::Jpeg(self.config.jpeg_quality)),
            _ => Err(CompositionError::UnsupportedFormat {
                path: output_path.display().to_string(),
            }
            .into()),
        }
    }

    /// Encode into a temporary file next to the destination, then rename
    fn persist(&self, image: &RgbImage, output_path: &Path, format: ImageOutputFormat) -> Result<()> {
        let output_failed = |reason: String| CompositionError::OutputFailed {
            path: output_path.display().to_string(),
            reason,
        };

        let directory = match output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(directory).map_err(|e| output_failed(e.to_string()))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            DynamicImage::ImageRgb8(image.clone())
                .write_to(&mut writer, format)
                .map_err(|e| output_failed(e.to_string()))?;
            writer.flush().map_err(|e| output_failed(e.to_string()))?;
        }

        temp.persist(output_path).map_err(|e| output_failed(e.error.to_string()))?;
        debug!("Wrote {}x{} image to {:?}", image.width(), image.height(), output_path);
        Ok(())
    }
}

/// Drop alpha by compositing onto an opaque background
fn flatten(image: &RgbaImage, background: Color) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        if a == 255 {
            return Rgb([r, g, b]);
        }
        let alpha = a as f32 / 255.0;
        let mix = |fg: u8, bg: u8| (fg as f32 * alpha + bg as f32 * (1.0 - alpha)).round() as u8;
        Rgb([mix(r, background.r), mix(g, background.g), mix(b, background.b)])
    })
}
