//! Scripted service mocks shared by the pipeline and session tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dermachat_core::error::ProviderError;
use dermachat_core::provider::{Embedder, Generator, PassageRetriever, RetrievalQuery};
use dermachat_providers::Services;

use crate::pipeline::RagPipeline;

/// Returns the same vector (or error) on every call and records inputs.
pub struct MockEmbedder {
    result: Result<Vec<f32>, ProviderError>,
    inputs: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn ok(vector: Vec<f32>) -> Self {
        Self {
            result: Ok(vector),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Embedder for MockEmbedder {
    fn name(&self) -> &str {
        "mock_embedder"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.inputs.lock().unwrap().push(text.to_string());
        self.result.clone()
    }
}

/// Returns the same passages (or error) on every call and records queries.
pub struct MockRetriever {
    result: Result<Vec<String>, ProviderError>,
    queries: Mutex<Vec<RetrievalQuery>>,
}

impl MockRetriever {
    pub fn ok(passages: Vec<&str>) -> Self {
        Self {
            result: Ok(passages.into_iter().map(String::from).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<RetrievalQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PassageRetriever for MockRetriever {
    fn name(&self) -> &str {
        "mock_retriever"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<String>, ProviderError> {
        self.queries.lock().unwrap().push(query.clone());
        self.result.clone()
    }
}

/// Returns a sequence of scripted answers, one per call.
///
/// Panics if more calls are made than answers provided.
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn sequence(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock_generator"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let prompt_count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("MockGenerator: no more responses (call #{prompt_count})"))
    }
}

/// Build a pipeline over the given mocks with default retrieval settings.
pub fn pipeline_with(
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn PassageRetriever>,
    generator: Arc<dyn Generator>,
) -> RagPipeline {
    RagPipeline::new(Services {
        embedder,
        retriever,
        generator,
    })
}

/// A pipeline whose generator answers with each string in turn.
pub fn answering(answers: Vec<&str>) -> RagPipeline {
    pipeline_with(
        Arc::new(MockEmbedder::ok(vec![0.5, 0.5])),
        Arc::new(MockRetriever::ok(vec!["pasaje"])),
        Arc::new(MockGenerator::sequence(
            answers.into_iter().map(|a| Ok(a.to_string())).collect(),
        )),
    )
}
