use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CompositionError, FontResolutionWarning, Result};

/// Largest accepted font size in pixels
pub const MAX_FONT_SIZE: u32 = 1000;

/// Largest accepted outline width in pixels
pub const MAX_STROKE_WIDTH: u32 = 100;

/// Largest accepted image overlay edge in pixels
pub const MAX_OVERLAY_SIZE: u32 = 8192;

/// Largest accepted distance of a position or shadow offset from the origin
pub const MAX_COORDINATE: i32 = 100_000;

/// An RGBA color, written as `#RGB`, `#RRGGBB` or `#RRGGBBAA` in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// The color with its alpha scaled by `coverage` (0.0-1.0)
    pub fn with_coverage(&self, coverage: f32) -> Rgba<u8> {
        let alpha = (self.a as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
        Rgba([self.r, self.g, self.b, alpha])
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid color '{}'", s));
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        match hex.len() {
            3 => {
                let expand = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|e| e.to_string())
                };
                Ok(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(format!("invalid color '{}': expected #RGB, #RRGGBB or #RRGGBBAA", s)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Top-left anchor in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Displacement of a drop shadow relative to its line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// One block of (possibly multi-line) text to draw on the cover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOverlaySpec {
    /// Text to draw; `\n` starts a new line
    pub text: String,

    /// Font file path, file name inside the fonts directory, or family name.
    /// `None` selects the default face.
    pub font: Option<String>,

    /// Font size in pixels
    pub font_size: u32,

    /// Top-left of the first line
    pub position: Position,

    pub text_color: Color,

    /// Outline thickness in pixels, 0 disables the outline
    pub stroke_width: u32,

    pub stroke_color: Color,

    /// Shadow is drawn only when this is set and `shadow_offset` is non-zero
    pub shadow_color: Option<Color>,

    pub shadow_offset: Offset,
}

impl Default for TextOverlaySpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: None,
            font_size: 40,
            position: Position::new(50, 50),
            text_color: Color::WHITE,
            stroke_width: 2,
            stroke_color: Color::BLACK,
            shadow_color: None,
            shadow_offset: Offset::default(),
        }
    }
}

impl TextOverlaySpec {
    /// Create a spec with the default styling for the given text
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_font<S: Into<String>>(mut self, font: S) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    pub fn with_stroke(mut self, width: u32, color: Color) -> Self {
        self.stroke_width = width;
        self.stroke_color = color;
        self
    }

    pub fn with_shadow(mut self, color: Color, dx: i32, dy: i32) -> Self {
        self.shadow_color = Some(color);
        self.shadow_offset = Offset::new(dx, dy);
        self
    }

    /// The active shadow, if any
    pub fn shadow(&self) -> Option<(Color, Offset)> {
        match self.shadow_color {
            Some(color) if !self.shadow_offset.is_zero() => Some((color, self.shadow_offset)),
            _ => None,
        }
    }

    /// The active outline, if any
    pub fn stroke(&self) -> Option<(u32, Color)> {
        (self.stroke_width > 0).then_some((self.stroke_width, self.stroke_color))
    }

    /// Lines in paint order. A trailing `\r` is dropped from each line.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A secondary image pasted onto the cover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOverlaySpec {
    pub source: PathBuf,

    /// Exact target size; the aspect ratio is not preserved
    pub width: u32,
    pub height: u32,

    #[serde(default)]
    pub position: Position,
}

impl ImageOverlaySpec {
    pub fn new<P: Into<PathBuf>>(source: P, width: u32, height: u32, x: i32, y: i32) -> Self {
        Self {
            source: source.into(),
            width,
            height,
            position: Position::new(x, y),
        }
    }
}

/// Everything to paint onto one base image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionRequest {
    /// Text blocks in paint order; later entries end up on top
    pub texts: Vec<TextOverlaySpec>,

    pub image: Option<ImageOverlaySpec>,
}

impl CompositionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, spec: TextOverlaySpec) -> Self {
        self.texts.push(spec);
        self
    }

    pub fn image(mut self, spec: ImageOverlaySpec) -> Self {
        self.image = Some(spec);
        self
    }

    /// True when applying the request would change nothing visible
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.texts.iter().all(TextOverlaySpec::is_blank)
    }

    /// Load a request from a TOML or JSON file (chosen by extension)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| CompositionError::InvalidRequest {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path)?;
        let request = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        };
        Ok(request)
    }

    /// Reject specs that can never render
    pub fn validate(&self) -> Result<()> {
        for (index, spec) in self.texts.iter().enumerate() {
            let invalid = |details: String| CompositionError::InvalidOverlay { index, details };

            if spec.font_size == 0 || spec.font_size > MAX_FONT_SIZE {
                return Err(invalid(format!("font_size {} must be between 1 and {}", spec.font_size, MAX_FONT_SIZE)).into());
            }
            if spec.stroke_width > MAX_STROKE_WIDTH {
                return Err(invalid(format!("stroke_width {} exceeds {}", spec.stroke_width, MAX_STROKE_WIDTH)).into());
            }
            if !within_reach(spec.position.x, spec.position.y) {
                return Err(invalid(format!("position ({}, {}) is out of range", spec.position.x, spec.position.y)).into());
            }
            if !within_reach(spec.shadow_offset.dx, spec.shadow_offset.dy) {
                return Err(invalid(format!(
                    "shadow_offset ({}, {}) is out of range",
                    spec.shadow_offset.dx, spec.shadow_offset.dy
                ))
                .into());
            }
        }

        if let Some(image) = &self.image {
            let invalid = |details: String| CompositionError::InvalidOverlay {
                index: self.texts.len(),
                details,
            };

            if image.width == 0 || image.height == 0 || image.width > MAX_OVERLAY_SIZE || image.height > MAX_OVERLAY_SIZE {
                return Err(invalid(format!(
                    "image size {}x{} must be between 1 and {} on each side",
                    image.width, image.height, MAX_OVERLAY_SIZE
                ))
                .into());
            }
            if !within_reach(image.position.x, image.position.y) {
                return Err(invalid(format!("position ({}, {}) is out of range", image.position.x, image.position.y)).into());
            }
        }

        Ok(())
    }
}

fn within_reach(x: i32, y: i32) -> bool {
    (-MAX_COORDINATE..=MAX_COORDINATE).contains(&x) && (-MAX_COORDINATE..=MAX_COORDINATE).contains(&y)
}

/// Result of a successful composition
#[derive(Debug, Clone)]
pub struct Composition {
    pub output_path: PathBuf,

    /// Fonts that were replaced by the default face
    pub warnings: Vec<FontResolutionWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompositorError;
    use tempfile::tempdir;

    #[test]
    fn test_color_parsing() {
        assert_eq!("#FFFFFF".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("000".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!("#ff000080".parse::<Color>().unwrap(), Color::rgba(255, 0, 0, 128));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#GGHHII".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::rgb(18, 52, 86).to_string(), "#123456");
        assert_eq!(Color::rgba(0, 0, 0, 128).to_string(), "#00000080");
    }

    #[test]
    fn test_shadow_requires_color_and_offset() {
        let spec = TextOverlaySpec::new("Title");
        assert!(spec.shadow().is_none());

        let spec = spec.with_shadow(Color::BLACK, 0, 0);
        assert!(spec.shadow().is_none());

        let spec = spec.with_shadow(Color::BLACK, 2, 3);
        assert_eq!(spec.shadow(), Some((Color::BLACK, Offset::new(2, 3))));

        let mut spec = spec;
        spec.shadow_color = None;
        assert!(spec.shadow().is_none());
    }

    #[test]
    fn test_lines_split_on_newlines() {
        let spec = TextOverlaySpec::new("The\r\nLong Road\n\nHome");
        let lines: Vec<&str> = spec.lines().collect();
        assert_eq!(lines, vec!["The", "Long Road", "", "Home"]);
    }

    #[test]
    fn test_empty_request() {
        let request = CompositionRequest::new()
            .text(TextOverlaySpec::new(""))
            .text(TextOverlaySpec::new("   \n"));
        assert!(request.is_empty());

        let request = request.image(ImageOverlaySpec::new("logo.png", 10, 10, 0, 0));
        assert!(!request.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let request = CompositionRequest::new().text(TextOverlaySpec::new("x").with_size(0));
        assert!(request.validate().is_err());

        let request = CompositionRequest::new().image(ImageOverlaySpec::new("logo.png", 0, 10, 0, 0));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_values() {
        let rejected = |request: CompositionRequest| match request.validate() {
            Err(CompositorError::Composition(CompositionError::InvalidOverlay { index, .. })) => index,
            other => panic!("expected InvalidOverlay, got {:?}", other),
        };

        let stroke = CompositionRequest::new()
            .text(TextOverlaySpec::new("Title"))
            .text(TextOverlaySpec::new("Author").with_stroke(40_000, Color::BLACK));
        assert_eq!(rejected(stroke), 1);

        let size = CompositionRequest::new().text(TextOverlaySpec::new("Title").with_size(MAX_FONT_SIZE + 1));
        assert_eq!(rejected(size), 0);

        let position = CompositionRequest::new().text(TextOverlaySpec::new("Title").at(i32::MIN, 0));
        assert_eq!(rejected(position), 0);

        let shadow = CompositionRequest::new().text(TextOverlaySpec::new("Title").with_shadow(Color::BLACK, 0, i32::MAX));
        assert_eq!(rejected(shadow), 0);

        let image = CompositionRequest::new()
            .text(TextOverlaySpec::new("Title"))
            .image(ImageOverlaySpec::new("logo.png", MAX_OVERLAY_SIZE + 1, 10, 0, 0));
        assert_eq!(rejected(image), 1);
    }

    #[test]
    fn test_validate_accepts_limits() {
        let request = CompositionRequest::new()
            .text(
                TextOverlaySpec::new("Title")
                    .with_size(MAX_FONT_SIZE)
                    .with_stroke(MAX_STROKE_WIDTH, Color::BLACK)
                    .at(-MAX_COORDINATE, MAX_COORDINATE),
            )
            .image(ImageOverlaySpec::new("logo.png", MAX_OVERLAY_SIZE, 1, 0, 0));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlays.toml");
        std::fs::write(
            &path,
            r##"
[[texts]]
text = "The Quiet Harbor"
font = "arial.ttf"
font_size = 64
position = { x = 40, y = 80 }
text_color = "#F5E6C8"
shadow_color = "#00000099"
shadow_offset = { dx = 3, dy = 3 }

[[texts]]
text = "A. N. Author"

[image]
source = "logo.png"
width = 120
height = 60
position = { x = 10, y = 1200 }
"##,
        )
        .unwrap();

        let request = CompositionRequest::from_file(&path).unwrap();
        assert_eq!(request.texts.len(), 2);
        assert_eq!(request.texts[0].font_size, 64);
        assert_eq!(request.texts[0].shadow(), Some((Color::rgba(0, 0, 0, 0x99), Offset::new(3, 3))));
        // Omitted fields take the form defaults
        assert_eq!(request.texts[1].font_size, 40);
        assert_eq!(request.texts[1].stroke_width, 2);
        assert_eq!(request.image.as_ref().unwrap().width, 120);
    }

    #[test]
    fn test_request_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlays.json");
        std::fs::write(&path, r##"{"texts": [{"text": "Hi", "text_color": "#FF0000"}]}"##).unwrap();

        let request = CompositionRequest::from_file(&path).unwrap();
        assert_eq!(request.texts[0].text_color, Color::rgb(255, 0, 0));
        assert!(request.image.is_none());
    }

    #[test]
    fn test_request_with_bad_color_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlays.json");
        std::fs::write(&path, r#"{"texts": [{"text": "Hi", "text_color": "blue-ish"}]}"#).unwrap();

        assert!(CompositionRequest::from_file(&path).is_err());
    }
}
