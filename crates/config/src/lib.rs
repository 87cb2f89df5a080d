//! Configuration loading, validation, and management for HybridRAG.
//!
//! Loads configuration from `~/.hybridrag/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! [`AppConfig`] is passed explicitly to whatever builds the router; nothing
//! reads it from global state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.hybridrag/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Relational database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Conversation memory
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Knowledge base
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Web search fallback
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Query routing policy
    #[serde(default)]
    pub router: RouterConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("database", &self.database)
            .field("memory", &self.memory)
            .field("knowledge", &self.knowledge)
            .field("web_search", &self.web_search)
            .field("router", &self.router)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

// --- Database ---

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL (required by the `postgres` backends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Connection URLs usually embed a password.
        f.debug_struct("DatabaseConfig")
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

// --- Memory ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    Sqlite,
    Postgres,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: MemoryBackend,

    /// SQLite database file (default `~/.hybridrag/memory.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,

    /// Append answered interactions to memory
    #[serde(default = "default_true")]
    pub auto_save: bool,

    /// Past interactions sent to the LLM with each question
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Maximum memory matches considered per query
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_memory_backend() -> MemoryBackend {
    MemoryBackend::Sqlite
}
fn default_history_turns() -> usize {
    3
}
fn default_search_limit() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            sqlite_path: None,
            auto_save: true,
            history_turns: default_history_turns(),
            search_limit: default_search_limit(),
        }
    }
}

// --- Knowledge base ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBackend {
    File,
    Postgres,
    InMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Deterministic feature hashing, no network
    Hash,
    /// The configured provider's `/embeddings` endpoint
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_backend")]
    pub backend: KnowledgeBackend,

    /// JSONL file for the `file` backend (default `~/.hybridrag/knowledge.jsonl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Table for the `postgres` backend
    #[serde(default = "default_knowledge_table")]
    pub table: String,

    #[serde(default = "default_embedder")]
    pub embedder: EmbedderKind,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Vector length; defaults to 512 for `hash` and 1536 for `provider`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_dimensions: Option<usize>,

    /// Documents retrieved per query
    #[serde(default = "default_num_documents")]
    pub num_documents: usize,

    /// Maximum characters per chunk at ingestion
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// File extensions picked up when ingesting a directory
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_knowledge_backend() -> KnowledgeBackend {
    KnowledgeBackend::File
}
fn default_knowledge_table() -> String {
    "knowledge_documents".into()
}
fn default_embedder() -> EmbedderKind {
    EmbedderKind::Hash
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_num_documents() -> usize {
    2
}
fn default_chunk_size() -> usize {
    3000
}
fn default_formats() -> Vec<String> {
    vec![".txt".into(), ".md".into()]
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            backend: default_knowledge_backend(),
            path: None,
            table: default_knowledge_table(),
            embedder: default_embedder(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: None,
            num_documents: default_num_documents(),
            chunk_size: default_chunk_size(),
            formats: default_formats(),
        }
    }
}

impl KnowledgeConfig {
    /// The embedding vector length in effect.
    pub fn dimensions(&self) -> usize {
        self.embedding_dimensions.unwrap_or(match self.embedder {
            EmbedderKind::Hash => 512,
            EmbedderKind::Provider => 1536,
        })
    }
}

// --- Web search ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    /// Full web results scraped from `html.duckduckgo.com`
    Html,
    /// The Instant Answer JSON API; answers encyclopedic topics only
    InstantAnswer,
}

impl SearchBackend {
    pub fn default_url(self) -> &'static str {
        match self {
            SearchBackend::Html => "https://html.duckduckgo.com",
            SearchBackend::InstantAnswer => "https://api.duckduckgo.com",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_search_backend")]
    pub backend: SearchBackend,

    /// Overrides the backend's default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl WebSearchConfig {
    /// The endpoint requests go to.
    pub fn endpoint(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.backend.default_url())
    }
}

fn default_search_backend() -> SearchBackend {
    SearchBackend::Html
}
fn default_max_results() -> usize {
    5
}
fn default_search_timeout() -> u64 {
    10
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_search_backend(),
            base_url: None,
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

// --- Router ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Minimum similarity between a new and a stored question
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold: f32,

    /// Minimum cosine similarity of a knowledge base document
    #[serde(default = "default_knowledge_threshold")]
    pub knowledge_threshold: f32,

    /// Minimum fraction of query terms a context paragraph must contain
    #[serde(default = "default_context_threshold")]
    pub context_threshold: f32,

    /// Returned verbatim when no source has anything relevant
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,

    /// Replace the built-in synthesis instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default = "default_true")]
    pub use_memory: bool,

    #[serde(default = "default_true")]
    pub use_knowledge: bool,

    #[serde(default = "default_true")]
    pub use_context: bool,
}

fn default_memory_threshold() -> f32 {
    0.8
}
fn default_knowledge_threshold() -> f32 {
    0.35
}
fn default_context_threshold() -> f32 {
    0.5
}
fn default_fallback_answer() -> String {
    "I don't know the answer to that.".into()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            memory_threshold: default_memory_threshold(),
            knowledge_threshold: default_knowledge_threshold(),
            context_threshold: default_context_threshold(),
            fallback_answer: default_fallback_answer(),
            system_prompt: None,
            use_memory: true,
            use_knowledge: true,
            use_context: true,
        }
    }
}

// --- Gateway ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    42718
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.hybridrag/config.toml).
    ///
    /// Environment variables override the file:
    /// - `HYBRIDRAG_API_KEY`, then `OPENAI_API_KEY` (only if no key is configured)
    /// - `HYBRIDRAG_PROVIDER`, `HYBRIDRAG_MODEL`
    /// - `HYBRIDRAG_DATABASE_URL`, then `DATABASE_URL` (only if no URL is configured)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load a specific file, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without consulting
    /// the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("HYBRIDRAG_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("HYBRIDRAG_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("HYBRIDRAG_MODEL") {
            self.default_model = model;
        }

        if self.database.url.is_none() {
            self.database.url = lookup("HYBRIDRAG_DATABASE_URL").or_else(|| lookup("DATABASE_URL"));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".hybridrag")
    }

    /// The SQLite memory file in effect.
    pub fn sqlite_path(&self) -> PathBuf {
        self.memory
            .sqlite_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("memory.db"))
    }

    /// The JSONL knowledge file in effect.
    pub fn knowledge_path(&self) -> PathBuf {
        self.knowledge
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("knowledge.jsonl"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        for (name, value) in [
            ("router.memory_threshold", self.router.memory_threshold),
            ("router.knowledge_threshold", self.router.knowledge_threshold),
            ("router.context_threshold", self.router.context_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        let needs_database = self.memory.backend == MemoryBackend::Postgres
            || self.knowledge.backend == KnowledgeBackend::Postgres;
        if needs_database && self.database.url.is_none() {
            return Err(ConfigError::ValidationError(
                "postgres backends require database.url (or HYBRIDRAG_DATABASE_URL)".into(),
            ));
        }

        if self.memory.history_turns > 50 {
            return Err(ConfigError::ValidationError(
                "memory.history_turns must be at most 50".into(),
            ));
        }

        if self.knowledge.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.chunk_size must be > 0".into(),
            ));
        }

        if self.knowledge.num_documents == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.num_documents must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            database: DatabaseConfig::default(),
            memory: MemoryConfig::default(),
            knowledge: KnowledgeConfig::default(),
            web_search: WebSearchConfig::default(),
            router: RouterConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for hybridrag_core::Error {
    fn from(e: ConfigError) -> Self {
        hybridrag_core::Error::Config {
            message: e.to_string(),
        }
    }
}
