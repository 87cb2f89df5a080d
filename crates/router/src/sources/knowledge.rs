//! Answers from ingested documents, by embedding similarity.

use std::sync::Arc;

use async_trait::async_trait;
use hybridrag_core::source::{Provenance, SearchResult, Source, SourceHit, SourceRequest};
use hybridrag_knowledge::KnowledgeBase;
use tracing::debug;

pub struct KnowledgeSource {
    knowledge: Arc<KnowledgeBase>,
    threshold: f32,
}

impl KnowledgeSource {
    /// Returns up to the knowledge base's `num_documents` documents scoring
    /// at least `threshold`.
    pub fn new(knowledge: Arc<KnowledgeBase>, threshold: f32) -> Self {
        Self { knowledge, threshold }
    }
}

#[async_trait]
impl Source for KnowledgeSource {
    fn provenance(&self) -> Provenance {
        Provenance::KnowledgeBase
    }

    async fn search(&self, request: &SourceRequest<'_>) -> hybridrag_core::Result<Option<SourceHit>> {
        let documents = self.knowledge.search(request.query, None, self.threshold).await?;
        debug!(
            store = self.knowledge.store().name(),
            documents = documents.len(),
            "Knowledge base searched"
        );

        let results = documents
            .into_iter()
            .map(|scored| {
                let reference = scored.document.reference().to_string();
                SearchResult::new(scored.document.content, Provenance::KnowledgeBase, scored.score)
                    .with_reference(reference)
            })
            .collect();
        Ok(SourceHit::from_results(Provenance::KnowledgeBase, results))
    }
}
