//! Query routing for HybridRAG.
//!
//! A [`QueryRouter`] asks its sources in fixed priority order (memory,
//! knowledge base, caller context, web search), hands the first hit to the
//! LLM for synthesis and records the exchange in conversation memory. When
//! every source misses it answers with a fixed "I don't know".

pub mod builder;
pub mod router;
pub mod sources;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use builder::{Components, build};
pub use router::{QueryRouter, Response, RouterSettings};
pub use synthesizer::Synthesizer;
