//! # HybridRAG Core
//!
//! Domain types, traits, and error definitions for the HybridRAG assistant.
//! This crate has **no service dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here: the LLM ([`Provider`]),
//! the embedding model ([`Embedder`]), conversation storage
//! ([`ConversationMemory`]), the vector store ([`KnowledgeStore`]) and the
//! web search API ([`WebSearch`]). The query router only ever talks to
//! [`Source`] trait objects, so each stage of the fallback chain can be
//! swapped for a mock in tests.

pub mod document;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod memory;
pub mod message;
pub mod provider;
pub mod source;
pub mod text;
pub mod web;

// Re-export key types at crate root for ergonomics
pub use document::{Document, ScoredDocument};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use knowledge::KnowledgeStore;
pub use memory::{ConversationMemory, Interaction, MemoryQuery, SessionId};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use source::{Provenance, SearchResult, SessionContext, Source, SourceHit, SourceRequest};
pub use web::{WebResult, WebSearch};
