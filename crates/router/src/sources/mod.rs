//! The four retrieval sources, in the order the router consults them.
//!
//! | Source | Hits when |
//! |---|---|
//! | [`MemorySource`] | a stored question of the same session is similar enough |
//! | [`KnowledgeSource`] | a document embedding is close enough to the query |
//! | [`ContextSource`] | a caller-supplied paragraph covers enough query terms |
//! | [`WebSource`] | the web search returns any non-empty snippet |

pub mod context;
pub mod knowledge;
pub mod memory;
pub mod web;

pub use context::ContextSource;
pub use knowledge::KnowledgeSource;
pub use memory::MemorySource;
pub use web::WebSource;
