//! Hosted service clients for DermaChat.
//!
//! Each client implements one `dermachat_core` service trait:
//! - [`OpenAiEmbedder`] → `Embedder`
//! - [`PineconeRetriever`] → `PassageRetriever`
//! - [`GeminiGenerator`] → `Generator`
//!
//! [`services::build_from_config`] wires all three from configuration.

pub mod gemini;
pub mod openai;
pub mod pinecone;
pub mod services;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiEmbedder;
pub use pinecone::PineconeRetriever;
pub use services::{Services, build_from_config};

/// Build the shared HTTP client used by every outbound call.
pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Read an error body for reporting; an unreadable body becomes empty.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}
