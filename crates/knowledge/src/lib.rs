//! Knowledge base for HybridRAG.
//!
//! Text files are read and chunked by [`TextReader`], embedded by an
//! [`hybridrag_core::Embedder`] and stored in a
//! [`hybridrag_core::KnowledgeStore`]. [`KnowledgeBase`] ties the three
//! together.

pub mod file_store;
pub mod hash_embedder;
pub mod in_memory;
pub mod knowledge_base;
pub mod reader;
pub mod vector;

#[cfg(feature = "postgres")]
pub mod pgvector;

pub use file_store::FileStore;
pub use hash_embedder::HashEmbedder;
pub use in_memory::InMemoryStore;
pub use knowledge_base::{KnowledgeBase, LoadOptions, LoadSummary};
pub use reader::TextReader;

#[cfg(feature = "postgres")]
pub use pgvector::PgVectorStore;
