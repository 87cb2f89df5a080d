//! In-memory knowledge store for tests and throwaway sessions.

use async_trait::async_trait;
use hybridrag_core::document::{Document, ScoredDocument};
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::knowledge::KnowledgeStore;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vector;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create(&self) -> Result<(), KnowledgeError> {
        Ok(())
    }

    async fn doc_exists(&self, document: &Document) -> Result<bool, KnowledgeError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .any(|d| d.content_hash == document.content_hash))
    }

    async fn stored_hash(&self, id: &str) -> Result<Option<String>, KnowledgeError> {
        Ok(vector::stored_hash(&self.documents.read().await, id))
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize, KnowledgeError> {
        Ok(vector::remove_named(&mut *self.documents.write().await, name))
    }

    async fn insert(&self, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
        let mut stored = self.documents.write().await;
        vector::insert_new(&mut stored, documents)
    }

    async fn upsert(&self, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
        let mut stored = self.documents.write().await;
        vector::upsert(&mut stored, documents)
    }

    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        let stored = self.documents.read().await;
        Ok(vector::vector_search(&stored, embedding, limit, min_score))
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.documents.read().await.len())
    }

    async fn clear(&self) -> Result<(), KnowledgeError> {
        self.documents.write().await.clear();
        Ok(())
    }
}
