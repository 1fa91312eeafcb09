//! Service traits: the abstraction over the three hosted backends.
//!
//! - [`Embedder`] turns a question into a dense vector
//! - [`PassageRetriever`] finds the stored passages closest to that vector
//! - [`Generator`] turns a composed prompt into an answer
//!
//! The pipeline calls these without knowing which vendor sits behind them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Metadata predicate applied by the vector index.
///
/// All listed conditions must hold (logical AND).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Fields that must be present on a stored item.
    #[serde(default)]
    pub must_exist: Vec<String>,
    /// Fields that must be absent on a stored item.
    #[serde(default)]
    pub must_not_exist: Vec<String>,
}

impl MetadataFilter {
    /// Only passages from the primary content set: the item carries a text
    /// field and is not a source-document record.
    pub fn primary_passages(text_field: &str, source_field: &str) -> Self {
        Self {
            must_exist: vec![text_field.to_string()],
            must_not_exist: vec![source_field.to_string()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must_exist.is_empty() && self.must_not_exist.is_empty()
    }
}

/// A nearest-neighbour query against the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// The query embedding
    pub vector: Vec<f32>,

    /// How many passages to return
    pub top_k: usize,

    /// Metadata restriction
    #[serde(default)]
    pub filter: MetadataFilter,
}

/// Embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai").
    fn name(&self) -> &str;

    /// Embed a single text into one vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Vector index backend.
#[async_trait]
pub trait PassageRetriever: Send + Sync {
    fn name(&self) -> &str;

    /// Return passage texts ranked by similarity, most similar first.
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<String>, ProviderError>;
}

/// Generative text backend.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Generate the answer text for a fully composed prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
