//! Answers from earlier exchanges of the same session.

use std::sync::Arc;

use async_trait::async_trait;
use hybridrag_core::memory::{ConversationMemory, MemoryQuery};
use hybridrag_core::source::{Provenance, SearchResult, Source, SourceHit, SourceRequest};
use tracing::debug;

pub struct MemorySource {
    memory: Arc<dyn ConversationMemory>,
    threshold: f32,
    limit: usize,
}

impl MemorySource {
    pub fn new(memory: Arc<dyn ConversationMemory>, threshold: f32, limit: usize) -> Self {
        Self {
            memory,
            threshold,
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl Source for MemorySource {
    fn provenance(&self) -> Provenance {
        Provenance::Memory
    }

    async fn search(&self, request: &SourceRequest<'_>) -> hybridrag_core::Result<Option<SourceHit>> {
        let matches = self
            .memory
            .search(MemoryQuery {
                session_id: request.session_id.to_string(),
                text: request.query.to_string(),
                limit: self.limit,
                min_score: self.threshold,
            })
            .await?;

        debug!(backend = self.memory.name(), matches = matches.len(), "Memory searched");

        let results = matches
            .into_iter()
            .map(|i| SearchResult::new(i.response, Provenance::Memory, i.score).with_reference(i.query))
            .collect();
        Ok(SourceHit::from_results(Provenance::Memory, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::memory::{Interaction, SessionId};
    use hybridrag_core::source::SessionContext;
    use hybridrag_memory::InMemoryBackend;

    async fn memory_with(session: &str, query: &str, response: &str) -> Arc<InMemoryBackend> {
        let memory = Arc::new(InMemoryBackend::new());
        memory
            .append(Interaction::new(&SessionId::from(session), query, response, None))
            .await
            .unwrap();
        memory
    }

    fn request<'a>(query: &'a str, session_id: &'a str, context: &'a SessionContext) -> SourceRequest<'a> {
        SourceRequest {
            query,
            session_id,
            context,
        }
    }

    #[tokio::test]
    async fn identical_question_hits() {
        let memory = memory_with("s1", "What is the refund policy?", "30 days.").await;
        let source = MemorySource::new(memory, 0.8, 5);
        let ctx = SessionContext::new();

        let hit = source
            .search(&request("what is the REFUND policy", "s1", &ctx))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.provenance, Provenance::Memory);
        assert_eq!(hit.results[0].snippet, "30 days.");
        assert_eq!(hit.results[0].reference.as_deref(), Some("What is the refund policy?"));
        assert!((hit.results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn other_sessions_are_invisible() {
        let memory = memory_with("s1", "What is the refund policy?", "30 days.").await;
        let source = MemorySource::new(memory, 0.8, 5);
        let ctx = SessionContext::new();

        let hit = source
            .search(&request("What is the refund policy?", "s2", &ctx))
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn dissimilar_question_misses() {
        let memory = memory_with("s1", "What is the refund policy?", "30 days.").await;
        let source = MemorySource::new(memory, 0.8, 5);
        let ctx = SessionContext::new();

        let hit = source
            .search(&request("How long does shipping take?", "s1", &ctx))
            .await
            .unwrap();
        assert!(hit.is_none());
    }
}
