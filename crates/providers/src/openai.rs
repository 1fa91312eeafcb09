//! OpenAI-compatible embedding client.
//!
//! Calls `POST {base_url}/embeddings` with one input string and returns the
//! single vector from the response. Works with OpenAI and with any endpoint
//! that mirrors its embeddings API.

use async_trait::async_trait;
use dermachat_core::error::ProviderError;
use dermachat_core::provider::Embedder;
use serde::Deserialize;
use tracing::{debug, warn};

/// Embedding client for an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    /// Create a new embedder.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: "openai".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Create an embedder against api.openai.com (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(
            "https://api.openai.com/v1",
            api_key,
            model,
            crate::http_client(120),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "openai_api_key is not set".into(),
            ));
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "input": text,
            "model": self.model,
        });

        debug!(
            provider = %self.name,
            model = %self.model,
            chars = text.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = crate::error_body(response).await;
            warn!(status, body = %error_body, "Embedding service returned error");
            return Err(ProviderError::from_status(status, error_body));
        }

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::EmptyResponse("embedding service".into()))
    }
}

// --- Embedding API types (internal) ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
