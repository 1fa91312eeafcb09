//! Pinecone vector index client.
//!
//! Queries `POST https://{index_host}/query` with the question vector and a
//! metadata filter, then reads the passage text from each match's metadata.
//!
//! The data-plane host is either configured directly or looked up once
//! through the control plane (`GET {control_plane}/indexes/{name}`).

use async_trait::async_trait;
use dermachat_core::error::ProviderError;
use dermachat_core::provider::{MetadataFilter, PassageRetriever, RetrievalQuery};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const API_VERSION: &str = "2024-07";

/// Vector index client for a single Pinecone index.
pub struct PineconeRetriever {
    name: String,
    api_key: String,
    index_name: String,
    control_plane_url: String,
    /// Resolved data-plane base URL (scheme included).
    host: OnceCell<String>,
    /// Metadata key holding the passage text.
    text_field: String,
    client: reqwest::Client,
}

impl PineconeRetriever {
    /// Create a retriever that resolves the index host through the control plane.
    pub fn new(
        api_key: impl Into<String>,
        index_name: impl Into<String>,
        text_field: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: "pinecone".into(),
            api_key: api_key.into(),
            index_name: index_name.into(),
            control_plane_url: "https://api.pinecone.io".into(),
            host: OnceCell::new(),
            text_field: text_field.into(),
            client,
        }
    }

    /// Use a known data-plane host and skip the control-plane lookup.
    pub fn with_host(mut self, host: impl AsRef<str>) -> Self {
        self.host = OnceCell::from(normalize_host(host.as_ref()));
        self
    }

    /// Override the control-plane URL (e.g., for testing).
    pub fn with_control_plane(mut self, url: impl Into<String>) -> Self {
        self.control_plane_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Data-plane base URL, describing the index on first use.
    async fn host(&self) -> Result<&str, ProviderError> {
        self.host
            .get_or_try_init(|| self.describe_index())
            .await
            .map(String::as_str)
    }

    async fn describe_index(&self) -> Result<String, ProviderError> {
        let url = format!("{}/indexes/{}", self.control_plane_url, self.index_name);
        debug!(index = %self.index_name, "Resolving index host");

        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = crate::error_body(response).await;
            warn!(status, body = %error_body, "Index lookup failed");
            return Err(ProviderError::from_status(status, error_body));
        }

        let description: IndexDescription =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse index description: {e}"),
            })?;

        Ok(normalize_host(&description.host))
    }

    /// Extract passage texts in ranked order, skipping matches without text.
    fn passages(&self, matches: Vec<QueryMatch>) -> Vec<String> {
        matches
            .into_iter()
            .filter_map(|m| {
                let text = m
                    .metadata
                    .as_ref()
                    .and_then(|meta| meta.get(&self.text_field))
                    .and_then(|v| v.as_str())
                    .map(String::from);
                if text.is_none() {
                    debug!(id = %m.id, "Match has no passage text, skipping");
                }
                text
            })
            .collect()
    }
}

#[async_trait]
impl PassageRetriever for PineconeRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<String>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "pinecone_api_key is not set".into(),
            ));
        }

        let url = format!("{}/query", self.host().await?);
        let mut body = serde_json::json!({
            "vector": query.vector,
            "topK": query.top_k,
            "includeValues": true,
            "includeMetadata": true,
        });
        if !query.filter.is_empty() {
            body["filter"] = filter_to_json(&query.filter);
        }

        debug!(
            index = %self.index_name,
            top_k = query.top_k,
            dims = query.vector.len(),
            "Sending index query"
        );

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = crate::error_body(response).await;
            warn!(status, body = %error_body, "Vector index returned error");
            return Err(ProviderError::from_status(status, error_body));
        }

        let api_resp: QueryResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse query response: {e}"),
            })?;

        Ok(self.passages(api_resp.matches))
    }
}

/// Render a filter in Pinecone's metadata query language.
///
/// `{"$and": [{field: {"$exists": true}}, ..., {field: {"$exists": false}}]}`
pub fn filter_to_json(filter: &MetadataFilter) -> serde_json::Value {
    let exists = filter.must_exist.iter().map(|f| exists_clause(f, true));
    let absent = filter.must_not_exist.iter().map(|f| exists_clause(f, false));
    serde_json::json!({ "$and": exists.chain(absent).collect::<Vec<_>>() })
}

fn exists_clause(field: &str, exists: bool) -> serde_json::Value {
    let mut clause = serde_json::Map::new();
    clause.insert(field.to_string(), serde_json::json!({ "$exists": exists }));
    serde_json::Value::Object(clause)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

// --- Pinecone API types (internal) ---

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    id: String,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}
