use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    composition::types::Color,
    error::{ConfigError, Result},
    generation::AspectRatio,
};

/// Main configuration for the Cover-Compositor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text and image compositing settings
    pub compositor: CompositorConfig,

    /// Cover image generation settings
    pub generation: GenerationConfig,

    /// Critique pass settings
    pub critique: CritiqueConfig,

    /// Workflow session settings
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.compositor.validate()?;
        self.generation.validate()?;
        self.critique.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

/// Compositor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Extra pixels between lines of a text block
    pub line_gap: u32,

    /// Directory searched for font file names
    pub fonts_dir: PathBuf,

    /// Font used when a spec names none or its font cannot be found
    pub default_font: Option<PathBuf>,

    /// Look up installed fonts by family name
    pub system_fonts: bool,

    /// Color behind any transparency left when flattening
    pub background: Color,

    /// JPEG output quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            line_gap: 5,
            fonts_dir: PathBuf::from("fonts"),
            default_font: None,
            system_fonts: true,
            background: Color::WHITE,
            jpeg_quality: 90,
        }
    }
}

impl CompositorConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                key: "compositor.jpeg_quality".to_string(),
                value: self.jpeg_quality.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Stability AI image generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Stable Image SD3 endpoint
    pub endpoint: String,

    pub model: String,

    pub negative_prompt: String,

    /// `png` or `jpeg`
    pub output_format: String,

    /// 0 lets the service pick a random seed
    pub seed: u64,

    /// How far a touch-up may move away from the candidate (0.0-1.0)
    pub touch_up_strength: f32,

    /// Candidates per generation
    pub count: u32,

    pub aspect_ratio: AspectRatio,

    /// Where candidate images are written
    pub output_dir: PathBuf,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// HTTP timeout per request (seconds)
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.stability.ai/v2beta/stable-image/generate/sd3".to_string(),
            model: "sd3.5-large".to_string(),
            negative_prompt: "Don't write any text".to_string(),
            output_format: "png".to_string(),
            seed: 0,
            touch_up_strength: 0.40,
            count: 4,
            aspect_ratio: AspectRatio::default(),
            output_dir: PathBuf::from("covers"),
            api_key_env: "STABILITY_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.touch_up_strength) {
            return Err(ConfigError::InvalidValue {
                key: "generation.touch_up_strength".to_string(),
                value: self.touch_up_strength.to_string()
            }.into());
        }

        if self.count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "generation.count".to_string(),
                value: self.count.to_string()
            }.into());
        }

        if !matches!(self.output_format.as_str(), "png" | "jpeg") {
            return Err(ConfigError::InvalidValue {
                key: "generation.output_format".to_string(),
                value: self.output_format.clone()
            }.into());
        }

        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingKey { key: "generation.endpoint".to_string() }.into());
        }

        Ok(())
    }
}

/// Vision-language critique configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CritiqueConfig {
    /// Run the critique pass after generation
    pub enabled: bool,

    /// Generative Language API base URL
    pub endpoint: String,

    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// HTTP timeout per request (seconds)
    pub timeout_secs: u64,
}

impl Default for CritiqueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl CritiqueConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.model.is_empty() {
            return Err(ConfigError::MissingKey { key: "critique.model".to_string() }.into());
        }

        Ok(())
    }
}

/// Workflow session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where composed covers are written
    pub work_dir: PathBuf,

    /// Extension of composed covers (`jpg` or `png`)
    pub output_format: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("covers"),
            output_format: "jpg".to_string(),
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if !matches!(self.output_format.as_str(), "jpg" | "jpeg" | "png") {
            return Err(ConfigError::InvalidValue {
                key: "session.output_format".to_string(),
                value: self.output_format.clone()
            }.into());
        }

        Ok(())
    }
}
