//! Embedder backed by a provider's `/embeddings` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use hybridrag_core::embedding::Embedder;
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

/// Maximum texts sent in one `/embeddings` request.
const BATCH_SIZE: usize = 64;

pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: usize,
    label: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimensions: usize) -> Self {
        let model = model.into();
        let label = format!("{}:{model}", provider.name());
        Self {
            provider,
            model,
            dimensions,
            label,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            debug!(embedder = %self.label, count = batch.len(), "Embedding batch");
            let response = self
                .provider
                .embed(EmbeddingRequest {
                    model: self.model.clone(),
                    inputs: batch.to_vec(),
                })
                .await
                .map_err(|e| KnowledgeError::EmbeddingFailed(e.to_string()))?;

            if response.embeddings.len() != batch.len() {
                return Err(KnowledgeError::EmbeddingFailed(format!(
                    "requested {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            for vector in response.embeddings {
                if vector.len() != self.dimensions {
                    return Err(KnowledgeError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: vector.len(),
                    });
                }
                vectors.push(vector);
            }
        }

        Ok(vectors)
    }
}
