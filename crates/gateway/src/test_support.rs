//! Mocks and state builders for gateway tests.

use std::sync::Arc;

use async_trait::async_trait;
use hybridrag_config::{AppConfig, KnowledgeBackend, MemoryBackend};
use hybridrag_core::error::{ProviderError, SearchError};
use hybridrag_core::message::Message;
use hybridrag_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use hybridrag_core::web::{WebResult, WebSearch};
use hybridrag_router::builder::{build_embedder, build_knowledge, build_memory, build_router};

use crate::api_v1::{ApiV1State, SharedApiState};

pub struct MockProvider {
    answer: Option<String>,
}

impl MockProvider {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let Some(answer) = &self.answer else {
            return Err(ProviderError::Network("mock provider unreachable".into()));
        };
        Ok(ProviderResponse {
            message: Message::assistant(answer),
            usage: Some(Usage {
                prompt_tokens: 20,
                completion_tokens: 4,
                total_tokens: 24,
            }),
            model: request.model,
        })
    }
}

/// Returns the same single snippet for every query, or nothing.
pub struct StaticWebSearch {
    snippet: Option<String>,
}

impl StaticWebSearch {
    pub fn new(snippet: &str) -> Self {
        Self {
            snippet: Some(snippet.to_string()),
        }
    }

    pub fn empty() -> Self {
        Self { snippet: None }
    }
}

#[async_trait]
impl WebSearch for StaticWebSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebResult>, SearchError> {
        Ok(self
            .snippet
            .iter()
            .map(|s| WebResult {
                title: "Static result".into(),
                url: "https://example.com/static".into(),
                snippet: s.clone(),
            })
            .collect())
    }
}

/// API state over in-memory backends and the hash embedder.
pub async fn test_api_state(provider: MockProvider, web: StaticWebSearch) -> SharedApiState {
    let mut config = AppConfig::default();
    config.memory.backend = MemoryBackend::InMemory;
    config.knowledge.backend = KnowledgeBackend::InMemory;

    let memory = build_memory(&config).await.unwrap();
    let embedder = build_embedder(&config, None).unwrap();
    let knowledge = build_knowledge(&config, embedder).await.unwrap();

    let web: Arc<dyn WebSearch> = Arc::new(web);
    let router = build_router(&config, Arc::new(provider), memory.clone(), knowledge.clone(), Some(web));

    Arc::new(ApiV1State {
        router: Arc::new(router),
        memory,
        knowledge,
        start_time: chrono::Utc::now(),
    })
}
