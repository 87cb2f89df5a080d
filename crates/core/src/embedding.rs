//! Embedder trait. Turns text into vectors for the knowledge base.

use async_trait::async_trait;
use crate::error::KnowledgeError;

/// Generates embedding vectors.
///
/// Implementations: provider-backed (`/embeddings` endpoint) and a
/// deterministic feature-hashing embedder for offline use.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The embedder name (e.g., "hash", "openai:text-embedding-3-small").
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, KnowledgeError>;

    /// Relevance of stored `content` to `query`, given the cosine
    /// `similarity` of their vectors. Search filters and ranks on this.
    fn relevance(&self, _query: &str, _content: &str, similarity: f32) -> f32 {
        similarity
    }

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> std::result::Result<Vec<f32>, KnowledgeError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| KnowledgeError::EmbeddingFailed("embedder returned no vectors".into()))
    }
}
