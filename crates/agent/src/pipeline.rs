//! The retrieval-augmented generation pipeline.
//!
//! # Flow
//!
//! 1. Embed the question
//! 2. Query the vector index with the primary-passage filter
//! 3. Join the passages into one retrieval context
//! 4. Compose the prompt with the patient context
//! 5. Generate the answer
//!
//! Every step is awaited in order and any failure aborts the turn.

use std::sync::Arc;

use dermachat_config::AppConfig;
use dermachat_core::context::PatientContext;
use dermachat_core::provider::{Embedder, Generator, MetadataFilter, PassageRetriever, RetrievalQuery};
use dermachat_providers::Services;
use tracing::{debug, info};

use crate::prompt;

/// Sequences the three hosted services for one question.
///
/// Shared by every session; holds no per-session state.
#[derive(Clone)]
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn PassageRetriever>,
    generator: Arc<dyn Generator>,
    top_k: usize,
    filter: MetadataFilter,
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    /// The generated answer.
    pub answer: String,
    /// Passages that were retrieved, in rank order.
    pub passages: Vec<String>,
    /// The prompt sent to the generator.
    pub prompt: String,
}

impl RagPipeline {
    /// Create a pipeline with the default retrieval settings
    /// (`top_k = 5`, `texto` must exist, `fuente` must not).
    pub fn new(services: Services) -> Self {
        Self {
            embedder: services.embedder,
            retriever: services.retriever,
            generator: services.generator,
            top_k: 5,
            filter: MetadataFilter::primary_passages("texto", "fuente"),
        }
    }

    /// Build the hosted clients and retrieval settings from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(dermachat_providers::build_from_config(config))
            .with_top_k(config.retrieval.top_k)
            .with_filter(MetadataFilter::primary_passages(
                &config.retrieval.text_field,
                &config.retrieval.source_field,
            ))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    /// Answer one question for the given patient.
    pub async fn run(
        &self,
        patient: &PatientContext,
        query: &str,
    ) -> Result<RagAnswer, dermachat_core::Error> {
        info!(
            embedder = self.embedder.name(),
            retriever = self.retriever.name(),
            generator = self.generator.name(),
            "RAG: starting turn"
        );

        // ── Step 1: Embed ──
        let vector = self.embedder.embed(query).await?;
        debug!(dimensions = vector.len(), "RAG: query embedded");

        // ── Step 2: Retrieve ──
        let passages = self
            .retriever
            .retrieve(&RetrievalQuery {
                vector,
                top_k: self.top_k,
                filter: self.filter.clone(),
            })
            .await?;
        debug!(passages = passages.len(), "RAG: passages retrieved");

        // ── Step 3: Compose ──
        let retrieval_context = join_passages(&passages);
        let prompt = prompt::compose(patient, &retrieval_context, query);

        // ── Step 4: Generate ──
        let answer = self.generator.generate(&prompt).await?;
        info!(answer_chars = answer.len(), "RAG: answer generated");

        Ok(RagAnswer {
            answer,
            passages,
            prompt,
        })
    }
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("embedder", &self.embedder.name())
            .field("retriever", &self.retriever.name())
            .field("generator", &self.generator.name())
            .field("top_k", &self.top_k)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Concatenate passages with single spaces, in rank order.
pub fn join_passages(passages: &[String]) -> String {
    passages.join(" ")
}
