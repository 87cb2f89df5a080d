//! Conversation memory backends for HybridRAG.
//!
//! Every backend implements [`hybridrag_core::ConversationMemory`] and
//! scores matches with [`hybridrag_core::memory::rank_interactions`], so a
//! question hits memory the same way regardless of where it is stored.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
