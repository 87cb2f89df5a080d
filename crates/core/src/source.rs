//! Source trait: one stage of the router's fallback chain.
//!
//! The router holds an ordered list of `Box<dyn Source>` and asks each in
//! turn. A source either hits (at least one result at or above its
//! relevance threshold) or misses; the first hit wins and nothing from
//! later sources is consulted or merged.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Memory,
    KnowledgeBase,
    Context,
    Web,
}

impl Provenance {
    /// Priority order of the fallback chain.
    pub const ORDER: [Provenance; 4] = [
        Provenance::Memory,
        Provenance::KnowledgeBase,
        Provenance::Context,
        Provenance::Web,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Memory => "memory",
            Provenance::KnowledgeBase => "knowledge_base",
            Provenance::Context => "context",
            Provenance::Web => "web",
        }
    }

    /// Parse a provenance tag as stored in the database.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|p| p.as_str() == tag)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrieved snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved text
    pub snippet: String,

    /// Which source produced it
    pub provenance: Provenance,

    /// Relevance score in the source's own scale (higher is better)
    pub score: f32,

    /// Stored query, document name, context block name, or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SearchResult {
    pub fn new(snippet: impl Into<String>, provenance: Provenance, score: f32) -> Self {
        Self {
            snippet: snippet.into(),
            provenance,
            score,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// The results one source returned for a query. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHit {
    pub provenance: Provenance,
    pub results: Vec<SearchResult>,
}

impl SourceHit {
    /// Wrap results into a hit; `None` when there are none.
    pub fn from_results(provenance: Provenance, results: Vec<SearchResult>) -> Option<Self> {
        if results.is_empty() {
            None
        } else {
            Some(Self { provenance, results })
        }
    }
}

/// Caller-supplied named text blocks, valid for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionContext(BTreeMap<String, String>);

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.0.insert(name.into(), text.into());
    }

    pub fn with_block(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// The blocks as (name, text) pairs, ordered by name.
    pub fn blocks(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when no block carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }
}

impl From<BTreeMap<String, String>> for SessionContext {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Everything a source may look at for one query.
#[derive(Debug, Clone, Copy)]
pub struct SourceRequest<'a> {
    pub query: &'a str,
    pub session_id: &'a str,
    pub context: &'a SessionContext,
}

/// One stage of the fallback chain.
#[async_trait]
pub trait Source: Send + Sync {
    /// The provenance tag of every result this source produces.
    fn provenance(&self) -> Provenance;

    /// Search for material relevant to the request.
    ///
    /// Returns `Ok(None)` on a miss. Backend failures are errors, not
    /// misses.
    async fn search(&self, request: &SourceRequest<'_>) -> crate::Result<Option<SourceHit>>;
}
