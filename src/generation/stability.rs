use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::{
    config::GenerationConfig,
    error::{GenerationError, Result},
    generation::{traits::CoverImageProvider, types::AspectRatio},
};

const CONTENT_FILTERED: &str = "CONTENT_FILTERED";

/// Stability AI Stable Image (SD3) provider
///
/// Text-to-image requests produce candidates; image-to-image requests at the
/// configured strength produce touch-ups. Each request returns one image, so
/// `count` candidates cost `count` sequential requests.
pub struct StabilityProvider {
    http: reqwest::Client,
    api_key: String,
    config: GenerationConfig,
}

/// One image returned by the service
#[derive(Debug)]
struct GeneratedImage {
    data: Vec<u8>,
    seed: u64,
}

impl StabilityProvider {
    /// Create a provider, reading the API key from the configured environment variable
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingCredentials { key: config.api_key_env.clone() })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key<S: Into<String>>(config: &GenerationConfig, api_key: S) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::RequestFailed {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            config: config.clone(),
        })
    }

    fn base_form(&self, prompt: &str, mode: &str) -> Form {
        Form::new()
            .text("prompt", prompt.to_string())
            .text("negative_prompt", self.config.negative_prompt.clone())
            .text("seed", self.config.seed.to_string())
            .text("output_format", self.config.output_format.clone())
            .text("model", self.config.model.clone())
            .text("mode", mode.to_string())
    }

    async fn send(&self, form: Form) -> Result<GeneratedImage> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "image/*")
            .multipart(form)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                reason: format!("Failed to reach Stability AI: {}", e),
            })?;

        let status = response.status();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let finish_reason = header("finish-reason");
        let seed = header("seed").and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0);

        if finish_reason.as_deref() == Some(CONTENT_FILTERED) {
            return Err(GenerationError::ContentPolicyViolation {
                reason: "Generation failed NSFW classifier".to_string(),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Stability AI returned {}: {}", status, body);
            if status == reqwest::StatusCode::FORBIDDEN && body.contains("moderation") {
                return Err(GenerationError::ContentPolicyViolation { reason: body }.into());
            }
            return Err(GenerationError::Api { status: status.as_u16(), body }.into());
        }

        let data = response.bytes().await.map_err(|e| GenerationError::RequestFailed {
            reason: format!("Failed to read Stability AI response: {}", e),
        })?;
        if data.is_empty() {
            return Err(GenerationError::InvalidResponse { reason: "empty image body".to_string() }.into());
        }

        debug!("Received {} bytes (seed {}, finish reason {:?})", data.len(), seed, finish_reason);
        Ok(GeneratedImage { data: data.to_vec(), seed })
    }

    async fn write_image(&self, image: &GeneratedImage, stem: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let path = self
            .config
            .output_dir
            .join(format!("{}_{}.{}", stem, image.seed, self.config.output_format));
        tokio::fs::write(&path, &image.data).await?;
        Ok(path)
    }
}

#[async_trait]
impl CoverImageProvider for StabilityProvider {
    fn name(&self) -> &str {
        "stability"
    }

    async fn generate(&self, prompt: &str, aspect_ratio: AspectRatio, count: u32) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(count as usize);

        for index in 1..=count {
            debug!("Requesting candidate {}/{} ({})", index, count, aspect_ratio);
            let form = self
                .base_form(prompt, "text-to-image")
                .text("aspect_ratio", aspect_ratio.to_string());
            let image = self.send(form).await?;
            let path = self.write_image(&image, &format!("cover_{}", index)).await?;

            info!("   Candidate {} saved to {:?}", index, path);
            paths.push(path);
        }

        Ok(paths)
    }

    async fn refine(&self, image: &Path, instruction: &str) -> Result<PathBuf> {
        let source = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("candidate.png")
            .to_string();
        let mime = match image.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "image/png",
        };
        let part = Part::bytes(source)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| GenerationError::RequestFailed { reason: e.to_string() })?;

        let form = self
            .base_form(instruction, "image-to-image")
            .part("image", part)
            .text("strength", format!("{:.2}", self.config.touch_up_strength));
        let generated = self.send(form).await?;

        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("cover");
        let path = self.write_image(&generated, &format!("{}_touchup", stem)).await?;
        info!("   Touch-up saved to {:?}", path);
        Ok(path)
    }
}
