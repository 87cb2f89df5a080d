//! Knowledge base documents.
//!
//! A document is one chunk of ingested text plus its embedding. Documents
//! are created at ingestion time and never modified afterwards; an upsert
//! replaces the whole document.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A chunk of text stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID (e.g., "refunds.md_1")
    pub id: String,

    /// Name of the document this chunk came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The text content
    pub content: String,

    /// Free-form metadata (source path, chunk number, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// SHA-256 of the content, used to skip re-ingesting identical text
    pub content_hash: String,

    /// Embedding vector (set before the document is stored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create a document; the ID defaults to the content hash.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = content_hash(&content);
        Self {
            id: content_hash.clone(),
            name: None,
            content,
            metadata: serde_json::Map::new(),
            content_hash,
            embedding: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// A short human-readable reference: the name, else the ID.
    pub fn reference(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A document returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity to the query embedding
    pub score: f32,
}

/// Hex SHA-256 of a text.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
