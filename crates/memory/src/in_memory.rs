//! In-memory backend for tests and ephemeral sessions.

use async_trait::async_trait;
use hybridrag_core::error::MemoryError;
use hybridrag_core::memory::{ConversationMemory, Interaction, MemoryQuery, rank_interactions};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An in-memory backend that keeps interactions in insertion order.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone)]
pub struct InMemoryBackend {
    interactions: Arc<RwLock<Vec<Interaction>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            interactions: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationMemory for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, mut interaction: Interaction) -> Result<String, MemoryError> {
        if interaction.id.is_empty() {
            interaction.id = Uuid::new_v4().to_string();
        }
        let id = interaction.id.clone();
        self.interactions.write().await.push(interaction);
        Ok(id)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<Interaction>, MemoryError> {
        let candidates: Vec<Interaction> = self
            .interactions
            .read()
            .await
            .iter()
            .filter(|i| i.session_id == query.session_id)
            .cloned()
            .collect();

        Ok(rank_interactions(candidates, &query))
    }

    async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Interaction>, MemoryError> {
        let interactions = self.interactions.read().await;
        let session: Vec<&Interaction> = interactions
            .iter()
            .filter(|i| i.session_id == session_id)
            .collect();
        let skip = limit.map_or(0, |n| session.len().saturating_sub(n));
        Ok(session.into_iter().skip(skip).cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let mut interactions = self.interactions.write().await;
        let len_before = interactions.len();
        interactions.retain(|i| i.id != id);
        Ok(interactions.len() < len_before)
    }

    async fn count(&self, session_id: Option<&str>) -> Result<usize, MemoryError> {
        let interactions = self.interactions.read().await;
        Ok(match session_id {
            Some(s) => interactions.iter().filter(|i| i.session_id == s).count(),
            None => interactions.len(),
        })
    }

    async fn clear(&self, session_id: Option<&str>) -> Result<(), MemoryError> {
        let mut interactions = self.interactions.write().await;
        match session_id {
            Some(s) => interactions.retain(|i| i.session_id != s),
            None => interactions.clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::memory::SessionId;
    use hybridrag_core::source::Provenance;

    fn interaction(session: &str, query: &str, response: &str) -> Interaction {
        Interaction::new(&SessionId::from(session), query, response, Some(Provenance::KnowledgeBase))
    }

    fn query(session: &str, text: &str) -> MemoryQuery {
        MemoryQuery {
            session_id: session.into(),
            text: text.into(),
            limit: 5,
            min_score: 0.0,
        }
    }

    #[tokio::test]
    async fn append_and_search() {
        let mem = InMemoryBackend::new();
        let id = mem
            .append(interaction("s1", "What is the refund policy?", "30 days."))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let results = mem.search(query("s1", "what is the refund policy")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].response, "30 days.");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_is_scoped_to_session() {
        let mem = InMemoryBackend::new();
        mem.append(interaction("alice", "refund policy", "30 days."))
            .await
            .unwrap();

        let results = mem.search(query("bob", "refund policy")).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_id_is_generated() {
        let mem = InMemoryBackend::new();
        let mut i = interaction("s1", "q", "a");
        i.id = String::new();
        let id = mem.append(i).await.unwrap();
        assert_eq!(id.len(), 36);
    }

    #[tokio::test]
    async fn history_returns_most_recent_oldest_first() {
        let mem = InMemoryBackend::new();
        for n in 1..=5 {
            mem.append(interaction("s1", &format!("question {n}"), &format!("answer {n}")))
                .await
                .unwrap();
        }
        mem.append(interaction("s2", "other", "other")).await.unwrap();

        let last_two = mem.history("s1", Some(2)).await.unwrap();
        let queries: Vec<_> = last_two.iter().map(|i| i.query.as_str()).collect();
        assert_eq!(queries, vec!["question 4", "question 5"]);

        assert_eq!(mem.history("s1", None).await.unwrap().len(), 5);
        assert_eq!(mem.history("s1", Some(50)).await.unwrap().len(), 5);
        assert!(mem.history("nobody", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_interaction() {
        let mem = InMemoryBackend::new();
        let id = mem.append(interaction("s1", "q", "a")).await.unwrap();
        assert_eq!(mem.count(None).await.unwrap(), 1);

        assert!(mem.delete(&id).await.unwrap());
        assert!(!mem.delete(&id).await.unwrap());
        assert_eq!(mem.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_one_session_or_all() {
        let mem = InMemoryBackend::new();
        mem.append(interaction("s1", "q1", "a")).await.unwrap();
        mem.append(interaction("s1", "q2", "a")).await.unwrap();
        mem.append(interaction("s2", "q3", "a")).await.unwrap();
        assert_eq!(mem.count(Some("s1")).await.unwrap(), 2);

        mem.clear(Some("s1")).await.unwrap();
        assert_eq!(mem.count(Some("s1")).await.unwrap(), 0);
        assert_eq!(mem.count(None).await.unwrap(), 1);

        mem.clear(None).await.unwrap();
        assert_eq!(mem.count(None).await.unwrap(), 0);
    }
}
