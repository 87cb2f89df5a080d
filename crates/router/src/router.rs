//! The query router.
//!
//! # Flow
//!
//! 1. Reject empty queries
//! 2. Ask each source in priority order; stop at the first hit
//! 3. No hit: return the fallback answer (no LLM call, nothing stored)
//! 4. Synthesize an answer from the hit and the session's recent history
//! 5. Append the exchange to conversation memory

use std::sync::Arc;

use hybridrag_core::error::Error;
use hybridrag_core::memory::{ConversationMemory, Interaction, SessionId};
use hybridrag_core::provider::Usage;
use hybridrag_core::source::{Provenance, SearchResult, SessionContext, Source, SourceHit, SourceRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::synthesizer::Synthesizer;

/// Router behavior that is not tied to a single source.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Returned when every source misses
    pub fallback_answer: String,
    /// Append answered exchanges to memory
    pub auto_save: bool,
    /// Past exchanges sent to the LLM with each question
    pub history_turns: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            fallback_answer: "I don't know the answer to that.".into(),
            auto_save: true,
            history_turns: 3,
        }
    }
}

/// The router's answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub answer: String,

    /// Source the answer is grounded in; `None` for the fallback answer.
    pub source: Option<Provenance>,

    /// The retrieved material handed to the LLM.
    pub results: Vec<SearchResult>,

    pub session_id: String,

    /// Sources consulted, in order.
    pub sources_tried: Vec<Provenance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Response {
    /// True when no source had anything and the fallback answer was given.
    pub fn is_unknown(&self) -> bool {
        self.source.is_none()
    }
}

pub struct QueryRouter {
    sources: Vec<Arc<dyn Source>>,
    synthesizer: Synthesizer,
    memory: Option<Arc<dyn ConversationMemory>>,
    settings: RouterSettings,
}

impl QueryRouter {
    /// Sources are consulted in provenance priority (memory, knowledge base,
    /// context, web) whatever order they are given in.
    pub fn new(mut sources: Vec<Arc<dyn Source>>, synthesizer: Synthesizer) -> Self {
        sources.sort_by_key(|s| priority(s.provenance()));
        Self {
            sources,
            synthesizer,
            memory: None,
            settings: RouterSettings::default(),
        }
    }

    /// Memory used for history and for storing answered exchanges.
    pub fn with_memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn memory(&self) -> Option<&Arc<dyn ConversationMemory>> {
        self.memory.as_ref()
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Provenance of each configured source, in consultation order.
    pub fn source_order(&self) -> Vec<Provenance> {
        self.sources.iter().map(|s| s.provenance()).collect()
    }

    /// Answer a query for a session.
    pub async fn answer(
        &self,
        query: &str,
        session_id: &SessionId,
        context: &SessionContext,
    ) -> hybridrag_core::Result<Response> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery("query is empty".into()));
        }

        let request = SourceRequest {
            query,
            session_id: session_id.as_str(),
            context,
        };

        let mut sources_tried = Vec::with_capacity(self.sources.len());
        let mut found: Option<SourceHit> = None;
        for source in &self.sources {
            sources_tried.push(source.provenance());
            if let Some(hit) = source.search(&request).await? {
                found = Some(hit);
                break;
            }
            debug!(source = %source.provenance(), "Source missed");
        }

        let Some(hit) = found else {
            info!(session = %session_id, tried = sources_tried.len(), "No information found");
            return Ok(Response {
                answer: self.settings.fallback_answer.clone(),
                source: None,
                results: Vec::new(),
                session_id: session_id.to_string(),
                sources_tried,
                usage: None,
            });
        };

        info!(
            session = %session_id,
            source = %hit.provenance,
            results = hit.results.len(),
            "Source hit"
        );

        let history = match &self.memory {
            Some(memory) if self.settings.history_turns > 0 => {
                memory
                    .history(session_id.as_str(), Some(self.settings.history_turns))
                    .await?
            }
            _ => Vec::new(),
        };

        let response = self.synthesizer.synthesize(query, &hit, &history).await?;
        let answer = response.message.content;

        if self.settings.auto_save {
            if let Some(memory) = &self.memory {
                let id = memory
                    .append(Interaction::new(session_id, query, &answer, Some(hit.provenance)))
                    .await?;
                debug!(id = %id, "Interaction stored");
            }
        }

        Ok(Response {
            answer,
            source: Some(hit.provenance),
            results: hit.results,
            session_id: session_id.to_string(),
            sources_tried,
            usage: response.usage,
        })
    }
}

fn priority(provenance: Provenance) -> usize {
    Provenance::ORDER
        .iter()
        .position(|p| *p == provenance)
        .unwrap_or(Provenance::ORDER.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ContextSource, KnowledgeSource, MemorySource, WebSource};
    use crate::test_helpers::{CountingWebSearch, ScriptedProvider};
    use hybridrag_core::document::Document;
    use hybridrag_knowledge::{HashEmbedder, InMemoryStore, KnowledgeBase, LoadOptions, TextReader};
    use hybridrag_memory::InMemoryBackend;

    struct Fixture {
        router: QueryRouter,
        provider: Arc<ScriptedProvider>,
        web: Arc<CountingWebSearch>,
        memory: Arc<InMemoryBackend>,
    }

    async fn fixture(documents: Vec<Document>, web: CountingWebSearch, provider: ScriptedProvider) -> Fixture {
        let memory = Arc::new(InMemoryBackend::new());
        let kb = KnowledgeBase::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(HashEmbedder::default()),
            TextReader::new(3000, vec![".txt".into()]),
            3000,
            2,
        );
        kb.load_documents(documents, LoadOptions::default()).await.unwrap();

        let provider = Arc::new(provider);
        let web = Arc::new(web);
        let sources: Vec<Arc<dyn Source>> = vec![
            Arc::new(WebSource::new(web.clone(), 5)),
            Arc::new(ContextSource::new(0.5)),
            Arc::new(KnowledgeSource::new(Arc::new(kb), 0.35)),
            Arc::new(MemorySource::new(memory.clone(), 0.8, 5)),
        ];
        let router = QueryRouter::new(sources, Synthesizer::new(provider.clone(), "test-model"))
            .with_memory(memory.clone());

        Fixture {
            router,
            provider,
            web,
            memory,
        }
    }

    fn refund_doc() -> Document {
        Document::new("Refund policy: purchases may be returned within 30 days for a full refund.")
            .with_id("refunds_1")
            .with_name("refunds")
    }

    #[tokio::test]
    async fn sources_are_sorted_by_priority() {
        let f = fixture(vec![], CountingWebSearch::new(vec![]), ScriptedProvider::new("x")).await;
        assert_eq!(f.router.source_order(), Provenance::ORDER.to_vec());
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_source() {
        let f = fixture(vec![], CountingWebSearch::with_snippet("x"), ScriptedProvider::new("x")).await;
        let err = f
            .router
            .answer("   ", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert_eq!(f.web.calls(), 0);
        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test]
    async fn knowledge_hit_skips_web() {
        let f = fixture(
            vec![refund_doc()],
            CountingWebSearch::with_snippet("web says 14 days"),
            ScriptedProvider::new("Within 30 days."),
        )
        .await;

        let response = f
            .router
            .answer("What is the refund policy?", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap();

        assert_eq!(response.source, Some(Provenance::KnowledgeBase));
        assert_eq!(response.answer, "Within 30 days.");
        assert_eq!(response.sources_tried, vec![Provenance::Memory, Provenance::KnowledgeBase]);
        assert_eq!(response.results[0].reference.as_deref(), Some("refunds"));
        assert_eq!(f.web.calls(), 0);
        assert_eq!(response.usage.as_ref().map(|u| u.total_tokens), Some(15));
    }

    #[tokio::test]
    async fn everything_empty_calls_web_once_and_stores() {
        let f = fixture(
            vec![],
            CountingWebSearch::with_snippet("Refunds are accepted for 14 days."),
            ScriptedProvider::new("14 days."),
        )
        .await;
        let session = SessionId::from("s1");

        let response = f
            .router
            .answer("What is the refund policy?", &session, &SessionContext::new())
            .await
            .unwrap();

        assert_eq!(response.source, Some(Provenance::Web));
        assert_eq!(response.sources_tried, Provenance::ORDER.to_vec());
        assert_eq!(f.web.calls(), 1);
        assert_eq!(f.memory.count(Some("s1")).await.unwrap(), 1);

        let history = f.memory.history("s1", None).await.unwrap();
        assert_eq!(history[0].query, "What is the refund policy?");
        assert_eq!(history[0].response, "14 days.");
        assert_eq!(history[0].source, Some(Provenance::Web));
    }

    #[tokio::test]
    async fn repeated_query_answers_from_memory() {
        let f = fixture(
            vec![refund_doc()],
            CountingWebSearch::with_snippet("x"),
            ScriptedProvider::new("Within 30 days."),
        )
        .await;
        let session = SessionId::from("s1");
        let ctx = SessionContext::new();

        let first = f.router.answer("What is the refund policy?", &session, &ctx).await.unwrap();
        assert_eq!(first.source, Some(Provenance::KnowledgeBase));

        let second = f.router.answer("What is the refund policy?", &session, &ctx).await.unwrap();
        assert_eq!(second.source, Some(Provenance::Memory));
        assert_eq!(second.sources_tried, vec![Provenance::Memory]);
        assert_eq!(second.results[0].snippet, "Within 30 days.");
        assert_eq!(f.web.calls(), 0);

        // The second call also sees the first exchange as history.
        let request = f.provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 4);
    }

    #[tokio::test]
    async fn memory_is_per_session() {
        let f = fixture(
            vec![],
            CountingWebSearch::with_snippet("Refunds for 14 days."),
            ScriptedProvider::new("14 days."),
        )
        .await;
        let ctx = SessionContext::new();

        f.router
            .answer("What is the refund policy?", &SessionId::from("alice"), &ctx)
            .await
            .unwrap();
        let other = f
            .router
            .answer("What is the refund policy?", &SessionId::from("bob"), &ctx)
            .await
            .unwrap();

        assert_eq!(other.source, Some(Provenance::Web));
        assert_eq!(f.web.calls(), 2);
    }

    #[tokio::test]
    async fn context_hit_before_web() {
        let f = fixture(
            vec![],
            CountingWebSearch::with_snippet("x"),
            ScriptedProvider::new("Five days."),
        )
        .await;
        let ctx = SessionContext::new().with_block("faq", "Shipping time is five business days.");

        let response = f
            .router
            .answer("What is the shipping time?", &SessionId::from("s1"), &ctx)
            .await
            .unwrap();

        assert_eq!(response.source, Some(Provenance::Context));
        assert_eq!(f.web.calls(), 0);
        let prompt = &f.provider.last_request().unwrap().messages[1].content;
        assert!(prompt.starts_with("<references source=\"context\">"));
    }

    #[tokio::test]
    async fn no_information_returns_fallback_without_llm_or_store() {
        let f = fixture(vec![], CountingWebSearch::new(vec![]), ScriptedProvider::new("x")).await;

        let response = f
            .router
            .answer("What is the refund policy?", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap();

        assert!(response.is_unknown());
        assert_eq!(response.answer, "I don't know the answer to that.");
        assert!(response.results.is_empty());
        assert_eq!(response.sources_tried.len(), 4);
        assert_eq!(f.provider.calls(), 0);
        assert_eq!(f.memory.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let f = fixture(vec![], CountingWebSearch::failing(), ScriptedProvider::new("x")).await;
        let err = f
            .router
            .answer("What is the refund policy?", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Search(_)));
        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_errors_propagate_and_nothing_is_stored() {
        let f = fixture(vec![], CountingWebSearch::with_snippet("x"), ScriptedProvider::failing()).await;
        let err = f
            .router
            .answer("What is the refund policy?", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(f.memory.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn auto_save_off_stores_nothing() {
        let f = fixture(vec![], CountingWebSearch::with_snippet("x"), ScriptedProvider::new("y")).await;
        let router = f.router.with_settings(RouterSettings {
            auto_save: false,
            ..RouterSettings::default()
        });

        router
            .answer("What is the refund policy?", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap();
        assert_eq!(f.memory.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn custom_fallback_answer() {
        let f = fixture(vec![], CountingWebSearch::new(vec![]), ScriptedProvider::new("x")).await;
        let router = f.router.with_settings(RouterSettings {
            fallback_answer: "No idea.".into(),
            ..RouterSettings::default()
        });
        let response = router
            .answer("anything", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap();
        assert_eq!(response.answer, "No idea.");
    }
}
