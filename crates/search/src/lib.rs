//! Web search clients for HybridRAG.
//!
//! [`DuckDuckGoHtml`] returns ordinary web results and is the default.
//! [`DuckDuckGoInstant`] uses the Instant Answer API.

pub mod html;
pub mod instant_answer;

use std::sync::Arc;

use hybridrag_config::{SearchBackend, WebSearchConfig};
use hybridrag_core::web::WebSearch;

pub use html::DuckDuckGoHtml;
pub use instant_answer::DuckDuckGoInstant;

/// The client for the configured backend.
pub fn from_config(config: &WebSearchConfig) -> Arc<dyn WebSearch> {
    match config.backend {
        SearchBackend::Html => Arc::new(DuckDuckGoHtml::from_config(config)),
        SearchBackend::InstantAnswer => Arc::new(DuckDuckGoInstant::from_config(config)),
    }
}
