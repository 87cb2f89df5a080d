//! KnowledgeStore trait: the vector store behind the knowledge base.

use async_trait::async_trait;

use crate::document::{Document, ScoredDocument};
use crate::error::KnowledgeError;

/// A store of embedded documents searchable by cosine similarity.
///
/// Implementations: in-memory, JSONL file, PostgreSQL + pgvector.
/// Documents passed to `insert`/`upsert` must already carry an embedding.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The backend name (e.g., "file", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// Create the underlying table/file if it does not exist.
    async fn create(&self) -> std::result::Result<(), KnowledgeError>;

    /// True if a document with the same content is already stored.
    async fn doc_exists(&self, document: &Document) -> std::result::Result<bool, KnowledgeError>;

    /// Content hash of the document stored under `id`, if any.
    async fn stored_hash(&self, id: &str) -> std::result::Result<Option<String>, KnowledgeError>;

    /// Remove every chunk of the named document; returns how many were removed.
    async fn delete_by_name(&self, name: &str) -> std::result::Result<usize, KnowledgeError>;

    /// Insert documents. Existing IDs are left untouched.
    async fn insert(&self, documents: Vec<Document>) -> std::result::Result<usize, KnowledgeError>;

    /// Insert documents, replacing any with the same ID.
    async fn upsert(&self, documents: Vec<Document>) -> std::result::Result<usize, KnowledgeError>;

    /// The `limit` documents most similar to `embedding` scoring at least
    /// `min_score`, best first.
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> std::result::Result<Vec<ScoredDocument>, KnowledgeError>;

    /// Number of stored documents.
    async fn count(&self) -> std::result::Result<usize, KnowledgeError>;

    /// Remove every document.
    async fn clear(&self) -> std::result::Result<(), KnowledgeError>;
}

/// Cosine similarity of two vectors.
///
/// Returns a value in [-1, 1]; 0.0 if either vector is empty or zero, or
/// the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}
