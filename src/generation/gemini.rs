use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

use crate::{
    config::CritiqueConfig,
    error::{CritiqueError, Result},
    generation::{prompt, traits::CritiqueProvider, types::Critique},
};

/// Gemini vision critique over the Generative Language `generateContent` API
pub struct GeminiCritic {
    http: reqwest::Client,
    api_key: String,
    config: CritiqueConfig,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Image { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiCritic {
    /// Create a critic, reading the API key from the configured environment variable
    pub fn from_config(config: &CritiqueConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CritiqueError::MissingCredentials { key: config.api_key_env.clone() })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key<S: Into<String>>(config: &CritiqueConfig, api_key: S) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CritiqueError::RequestFailed {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            config: config.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl CritiqueProvider for GeminiCritic {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn evaluate(&self, image: &Path, original_prompt: &str) -> Result<Critique> {
        let bytes = tokio::fs::read(image).await?;
        let mime_type = match image.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "image/png",
        };

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text { text: prompt::critique_prompt(original_prompt) },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CritiqueError::RequestFailed {
                reason: format!("Failed to reach Gemini: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini returned {}: {}", status, body);
            return Err(CritiqueError::Api { status: status.as_u16(), body }.into());
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| CritiqueError::RequestFailed {
            reason: format!("Failed to decode Gemini response: {}", e),
        })?;

        let answer = parsed.text().ok_or(CritiqueError::EmptyResponse)?;
        debug!("Critique answer for {:?}: {}", image, answer.trim());
        Ok(Critique::from_answer(&answer).ok_or(CritiqueError::EmptyResponse)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompositorError;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn critic(server: &MockServer) -> GeminiCritic {
        let config = CritiqueConfig {
            endpoint: format!("{}/v1beta", server.uri()),
            ..CritiqueConfig::default()
        };
        GeminiCritic::with_api_key(&config, "gem-key").unwrap()
    }

    fn answer(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }] })
    }

    async fn candidate_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("cover_1_9.png");
        tokio::fs::write(&path, b"png").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_true_means_approved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "gem-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("True\n")))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let image = candidate_file(&dir).await;
        let critique = critic(&server).evaluate(&image, "a fox").await.unwrap();
        assert_eq!(critique, Critique::Approved);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("Prompt: a fox"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], STANDARD.encode(b"png"));
    }

    #[tokio::test]
    async fn test_other_answers_request_touch_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("Add snow on the rooftops")))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let image = candidate_file(&dir).await;
        let critique = critic(&server).evaluate(&image, "a winter village").await.unwrap();
        assert_eq!(critique, Critique::TouchUp("Add snow on the rooftops".to_string()));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let image = candidate_file(&dir).await;
        let err = critic(&server).evaluate(&image, "x").await.unwrap_err();
        assert!(matches!(err, CompositorError::Critique(CritiqueError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_http_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let image = candidate_file(&dir).await;
        let err = critic(&server).evaluate(&image, "x").await.unwrap_err();
        assert!(matches!(err, CompositorError::Critique(CritiqueError::Api { status: 429, .. })));
    }
}
