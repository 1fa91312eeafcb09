//! Google Gemini generative model client.
//!
//! Uses the `generateContent` REST endpoint directly:
//! - `x-goog-api-key` header authentication (not Bearer)
//! - one user turn carrying the whole composed prompt
//! - the answer is the first part of the first candidate

use async_trait::async_trait;
use dermachat_core::error::ProviderError;
use dermachat_core::provider::Generator;
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client for one fixed model.
pub struct GeminiGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    /// Create a new Gemini generator.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "gemini_api_key is not set".into(),
            ));
        }

        let url = format!("{}:generateContent", self.model_url());
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        });

        debug!(
            provider = %self.name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = crate::error_body(response).await;
            warn!(status, body = %error_body, "Generative model returned error");
            return Err(ProviderError::from_status(status, error_body));
        }

        let api_resp: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse generation response: {e}"),
            })?;

        first_text(api_resp)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// Text of the first part of the first candidate.
fn first_text(response: GenerateResponse) -> Result<String, ProviderError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .map(|r| format!(" (blocked: {r})"))
        .unwrap_or_default();

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| ProviderError::EmptyResponse(format!("generative model{block_reason}")))
}

// --- Gemini API types (internal) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
