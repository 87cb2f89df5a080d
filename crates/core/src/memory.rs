//! Conversation memory: past (query, response) pairs keyed by session.
//!
//! The memory is the first stage of the router's fallback chain: when a
//! question closely matches one already answered in the same session, the
//! stored response is reused as the retrieved material. Every answered
//! interaction is appended afterwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MemoryError;
use crate::source::Provenance;
use crate::text;

/// Identifier of a conversation session (or user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One answered exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique ID (generated on append when empty)
    pub id: String,

    /// The session this exchange belongs to
    pub session_id: String,

    /// The user's question
    pub query: String,

    /// The assistant's answer
    pub response: String,

    /// Which source the answer was grounded in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Provenance>,

    /// When the exchange happened
    pub created_at: DateTime<Utc>,

    /// Relevance score (set by search operations)
    #[serde(default)]
    pub score: f32,
}

impl Interaction {
    /// Create a new interaction timestamped now.
    pub fn new(
        session_id: &SessionId,
        query: impl Into<String>,
        response: impl Into<String>,
        source: Option<Provenance>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.0.clone(),
            query: query.into(),
            response: response.into(),
            source,
            created_at: Utc::now(),
            score: 0.0,
        }
    }
}

/// A query for searching one session's memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Session whose memory is searched
    pub session_id: String,

    /// The search text (compared against stored queries)
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum relevance score threshold
    #[serde(default)]
    pub min_score: f32,
}

fn default_limit() -> usize {
    5
}

/// The core ConversationMemory trait.
///
/// Implementations: SQLite, PostgreSQL, in-memory (for testing and
/// ephemeral sessions).
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// Append an interaction; returns its ID.
    async fn append(&self, interaction: Interaction) -> std::result::Result<String, MemoryError>;

    /// Find stored interactions whose query resembles `query.text`.
    ///
    /// Results are sorted by descending score and all meet `min_score`.
    async fn search(&self, query: MemoryQuery) -> std::result::Result<Vec<Interaction>, MemoryError>;

    /// The most recent `limit` interactions of a session, oldest first.
    /// `None` returns the whole history.
    async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<Interaction>, MemoryError>;

    /// Delete one interaction by ID.
    async fn delete(&self, id: &str) -> std::result::Result<bool, MemoryError>;

    /// Count interactions, optionally within one session.
    async fn count(&self, session_id: Option<&str>) -> std::result::Result<usize, MemoryError>;

    /// Clear interactions, optionally only one session's.
    async fn clear(&self, session_id: Option<&str>) -> std::result::Result<(), MemoryError>;
}

/// Score candidate interactions against a query and keep the best.
///
/// Shared by every backend so relevance is identical regardless of where
/// the rows come from. Ties keep the most recent interaction first.
pub fn rank_interactions(candidates: Vec<Interaction>, query: &MemoryQuery) -> Vec<Interaction> {
    let mut scored: Vec<Interaction> = candidates
        .into_iter()
        .map(|mut i| {
            i.score = text::similarity(&query.text, &i.query);
            i
        })
        .filter(|i| i.score > 0.0 && i.score >= query.min_score)
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    scored.truncate(query.limit);
    scored
}
