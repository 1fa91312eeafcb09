//! Service wiring: builds the three hosted-service clients from configuration.

use std::sync::Arc;

use dermachat_config::AppConfig;
use dermachat_core::provider::{Embedder, Generator, PassageRetriever};

use crate::gemini::GeminiGenerator;
use crate::openai::OpenAiEmbedder;
use crate::pinecone::PineconeRetriever;

/// The three backends one pipeline needs.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    pub retriever: Arc<dyn PassageRetriever>,
    pub generator: Arc<dyn Generator>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("embedder", &self.embedder.name())
            .field("retriever", &self.retriever.name())
            .field("generator", &self.generator.name())
            .finish()
    }
}

/// Build the service clients from configuration.
///
/// Missing keys do not fail here: the affected client reports
/// `NotConfigured` on its first call, so the shell can still start.
pub fn build_from_config(config: &AppConfig) -> Services {
    let client = crate::http_client(config.request_timeout_secs);

    let embedder = OpenAiEmbedder::new(
        &config.embedding.base_url,
        config.openai_api_key.clone().unwrap_or_default(),
        &config.embedding.model,
        client.clone(),
    );

    let mut retriever = PineconeRetriever::new(
        config.pinecone_api_key.clone().unwrap_or_default(),
        &config.retrieval.index_name,
        &config.retrieval.text_field,
        client.clone(),
    )
    .with_control_plane(&config.retrieval.control_plane_url);
    if let Some(host) = &config.retrieval.index_host {
        retriever = retriever.with_host(host);
    }

    let generator = GeminiGenerator::new(
        config.gemini_api_key.clone().unwrap_or_default(),
        &config.generation.model,
        client,
    )
    .with_base_url(&config.generation.base_url);

    Services {
        embedder: Arc::new(embedder),
        retriever: Arc::new(retriever),
        generator: Arc::new(generator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dermachat_core::error::ProviderError;
    use dermachat_core::provider::{MetadataFilter, RetrievalQuery};

    #[test]
    fn builds_all_three_services() {
        let services = build_from_config(&AppConfig::default());
        assert_eq!(services.embedder.name(), "openai");
        assert_eq!(services.retriever.name(), "pinecone");
        assert_eq!(services.generator.name(), "gemini");
        assert!(format!("{services:?}").contains("pinecone"));
    }

    #[tokio::test]
    async fn unconfigured_keys_fail_on_first_call() {
        let services = build_from_config(&AppConfig::default());

        assert!(matches!(
            services.embedder.embed("hola").await,
            Err(ProviderError::NotConfigured(_))
        ));
        let query = RetrievalQuery {
            vector: vec![0.0],
            top_k: 5,
            filter: MetadataFilter::default(),
        };
        assert!(matches!(
            services.retriever.retrieve(&query).await,
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(matches!(
            services.generator.generate("hola").await,
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
