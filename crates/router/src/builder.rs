//! Assemble a [`QueryRouter`] and its backends from [`AppConfig`].

use std::sync::Arc;

use hybridrag_config::{AppConfig, EmbedderKind, KnowledgeBackend, MemoryBackend};
use hybridrag_core::embedding::Embedder;
use hybridrag_core::error::{Error, MemoryError};
use hybridrag_core::knowledge::KnowledgeStore;
use hybridrag_core::memory::ConversationMemory;
use hybridrag_core::provider::Provider;
use hybridrag_core::source::Source;
use hybridrag_knowledge::{FileStore, HashEmbedder, InMemoryStore, KnowledgeBase, TextReader};
use hybridrag_memory::{InMemoryBackend, SqliteBackend};
use hybridrag_providers::{ProviderEmbedder, build_from_config, resolve_model};
use tracing::info;

use crate::router::{QueryRouter, RouterSettings};
use crate::sources::{ContextSource, KnowledgeSource, MemorySource, WebSource};
use crate::synthesizer::Synthesizer;

/// Everything a front end needs: the router plus direct handles on the
/// stores it reads from.
pub struct Components {
    pub router: Arc<QueryRouter>,
    pub memory: Arc<dyn ConversationMemory>,
    pub knowledge: Arc<KnowledgeBase>,
}

/// The configured default provider.
pub fn build_provider(config: &AppConfig) -> hybridrag_core::Result<Arc<dyn Provider>> {
    build_from_config(config).default().ok_or_else(|| Error::Config {
        message: format!("provider '{}' is not configured", config.default_provider),
    })
}

pub async fn build_memory(config: &AppConfig) -> hybridrag_core::Result<Arc<dyn ConversationMemory>> {
    let memory: Arc<dyn ConversationMemory> = match config.memory.backend {
        MemoryBackend::InMemory => Arc::new(InMemoryBackend::new()),
        MemoryBackend::Sqlite => {
            let path = config.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MemoryError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            Arc::new(SqliteBackend::new(&path.to_string_lossy()).await?)
        }
        MemoryBackend::Postgres => postgres_memory(config).await?,
    };
    info!(backend = memory.name(), "Memory ready");
    Ok(memory)
}

#[cfg(feature = "postgres")]
async fn postgres_memory(config: &AppConfig) -> hybridrag_core::Result<Arc<dyn ConversationMemory>> {
    let url = database_url(config)?;
    let backend =
        hybridrag_memory::PostgresBackend::connect(url, config.database.max_connections).await?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_memory(_config: &AppConfig) -> hybridrag_core::Result<Arc<dyn ConversationMemory>> {
    Err(postgres_disabled())
}

/// The embedder named by `[knowledge].embedder`. The provider embedder
/// needs `provider`.
pub fn build_embedder(
    config: &AppConfig,
    provider: Option<Arc<dyn Provider>>,
) -> hybridrag_core::Result<Arc<dyn Embedder>> {
    let dimensions = config.knowledge.dimensions();
    match config.knowledge.embedder {
        EmbedderKind::Hash => Ok(Arc::new(HashEmbedder::new(dimensions))),
        EmbedderKind::Provider => {
            let provider = provider.ok_or_else(|| Error::Config {
                message: "the provider embedder needs an LLM provider".into(),
            })?;
            Ok(Arc::new(ProviderEmbedder::new(
                provider,
                &config.knowledge.embedding_model,
                dimensions,
            )))
        }
    }
}

pub async fn build_knowledge(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
) -> hybridrag_core::Result<Arc<KnowledgeBase>> {
    let knowledge = &config.knowledge;
    let store: Arc<dyn KnowledgeStore> = match knowledge.backend {
        KnowledgeBackend::InMemory => Arc::new(InMemoryStore::new()),
        KnowledgeBackend::File => Arc::new(FileStore::new(config.knowledge_path())),
        KnowledgeBackend::Postgres => postgres_store(config, embedder.dimensions()).await?,
    };
    store.create().await?;
    info!(store = store.name(), embedder = embedder.name(), "Knowledge base ready");

    Ok(Arc::new(KnowledgeBase::new(
        store,
        embedder,
        TextReader::new(knowledge.chunk_size, knowledge.formats.clone()),
        knowledge.chunk_size,
        knowledge.num_documents,
    )))
}

#[cfg(feature = "postgres")]
async fn postgres_store(config: &AppConfig, dimensions: usize) -> hybridrag_core::Result<Arc<dyn KnowledgeStore>> {
    let url = database_url(config)?;
    let store = hybridrag_knowledge::PgVectorStore::connect(
        url,
        config.database.max_connections,
        &config.knowledge.table,
        dimensions,
    )
    .await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_config: &AppConfig, _dimensions: usize) -> hybridrag_core::Result<Arc<dyn KnowledgeStore>> {
    Err(Error::Knowledge(hybridrag_core::error::KnowledgeError::Storage(
        "PostgreSQL support is not compiled in (enable the `postgres` feature)".into(),
    )))
}

#[cfg(feature = "postgres")]
fn database_url(config: &AppConfig) -> hybridrag_core::Result<&str> {
    config.database.url.as_deref().ok_or_else(|| Error::Config {
        message: "database.url is required for PostgreSQL backends".into(),
    })
}

#[cfg(not(feature = "postgres"))]
fn postgres_disabled() -> Error {
    Error::Memory(MemoryError::Storage(
        "PostgreSQL support is not compiled in (enable the `postgres` feature)".into(),
    ))
}

/// Wire the sources and synthesizer around existing stores.
pub fn build_router(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    memory: Arc<dyn ConversationMemory>,
    knowledge: Arc<KnowledgeBase>,
    web: Option<Arc<dyn hybridrag_core::WebSearch>>,
) -> QueryRouter {
    let routing = &config.router;
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();

    if routing.use_memory {
        sources.push(Arc::new(MemorySource::new(
            memory.clone(),
            routing.memory_threshold,
            config.memory.search_limit,
        )));
    }
    if routing.use_knowledge {
        sources.push(Arc::new(KnowledgeSource::new(knowledge, routing.knowledge_threshold)));
    }
    if routing.use_context {
        sources.push(Arc::new(ContextSource::new(routing.context_threshold)));
    }
    if let Some(web) = web {
        sources.push(Arc::new(WebSource::new(web, config.web_search.max_results)));
    }

    let mut synthesizer = Synthesizer::new(provider, resolve_model(config))
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);
    if let Some(prompt) = &routing.system_prompt {
        synthesizer = synthesizer.with_system_prompt(prompt);
    }

    QueryRouter::new(sources, synthesizer)
        .with_memory(memory)
        .with_settings(RouterSettings {
            fallback_answer: routing.fallback_answer.clone(),
            auto_save: config.memory.auto_save,
            history_turns: config.memory.history_turns,
        })
}

/// Build every backend named in the configuration and the router on top.
pub async fn build(config: &AppConfig) -> hybridrag_core::Result<Components> {
    let provider = build_provider(config)?;
    let memory = build_memory(config).await?;
    let embedder = build_embedder(config, Some(provider.clone()))?;
    let knowledge = build_knowledge(config, embedder).await?;
    let web = config
        .web_search
        .enabled
        .then(|| hybridrag_search::from_config(&config.web_search));

    let router = build_router(config, provider, memory.clone(), knowledge.clone(), web);
    info!(sources = ?router.source_order(), "Query router ready");

    Ok(Components {
        router: Arc::new(router),
        memory,
        knowledge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CountingWebSearch, ScriptedProvider};
    use hybridrag_core::memory::SessionId;
    use hybridrag_core::source::{Provenance, SessionContext};

    fn in_memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.memory.backend = MemoryBackend::InMemory;
        config.knowledge.backend = KnowledgeBackend::InMemory;
        config
    }

    #[tokio::test]
    async fn toggles_drop_sources() {
        let mut config = in_memory_config();
        config.router.use_context = false;
        let embedder = build_embedder(&config, None).unwrap();
        let router = build_router(
            &config,
            Arc::new(ScriptedProvider::new("x")),
            build_memory(&config).await.unwrap(),
            build_knowledge(&config, embedder).await.unwrap(),
            None,
        );
        assert_eq!(router.source_order(), vec![Provenance::Memory, Provenance::KnowledgeBase]);
    }

    #[tokio::test]
    async fn settings_come_from_config() {
        let mut config = in_memory_config();
        config.router.fallback_answer = "Unknown.".into();
        config.memory.auto_save = false;
        config.memory.history_turns = 7;
        let embedder = build_embedder(&config, None).unwrap();
        let router = build_router(
            &config,
            Arc::new(ScriptedProvider::new("x")),
            build_memory(&config).await.unwrap(),
            build_knowledge(&config, embedder).await.unwrap(),
            Some(Arc::new(CountingWebSearch::new(vec![]))),
        );

        assert_eq!(router.settings().fallback_answer, "Unknown.");
        assert!(!router.settings().auto_save);
        assert_eq!(router.settings().history_turns, 7);
        assert_eq!(router.synthesizer().model(), "gpt-4o-mini");

        let response = router
            .answer("anything at all", &SessionId::from("s1"), &SessionContext::new())
            .await
            .unwrap();
        assert_eq!(response.answer, "Unknown.");
    }

    #[test]
    fn provider_embedder_requires_provider() {
        let mut config = in_memory_config();
        config.knowledge.embedder = EmbedderKind::Provider;
        assert!(matches!(build_embedder(&config, None), Err(Error::Config { .. })));

        let embedder = build_embedder(&config, Some(Arc::new(ScriptedProvider::new("x")))).unwrap();
        assert_eq!(embedder.dimensions(), 1536);
    }

    #[test]
    fn hash_embedder_by_default() {
        let embedder = build_embedder(&in_memory_config(), None).unwrap();
        assert_eq!(embedder.name(), "hash");
        assert_eq!(embedder.dimensions(), 512);
    }

    #[tokio::test]
    async fn build_with_in_memory_backends() {
        let components = build(&in_memory_config()).await.unwrap();
        assert_eq!(components.memory.name(), "in_memory");
        assert_eq!(components.knowledge.store().name(), "in_memory");
        assert_eq!(components.router.source_order(), Provenance::ORDER.to_vec());
    }

    #[tokio::test]
    async fn sqlite_and_file_backends_use_configured_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.memory.sqlite_path = Some(dir.path().join("data").join("memory.db"));
        config.knowledge.path = Some(dir.path().join("data").join("knowledge.jsonl"));

        let components = build(&config).await.unwrap();
        assert_eq!(components.memory.name(), "sqlite");
        assert_eq!(components.knowledge.store().name(), "file");
        assert!(dir.path().join("data").join("memory.db").exists());
        assert!(dir.path().join("data").join("knowledge.jsonl").exists());
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn postgres_without_feature_is_an_error() {
        let mut config = in_memory_config();
        config.memory.backend = MemoryBackend::Postgres;
        assert!(build_memory(&config).await.is_err());
    }
}
