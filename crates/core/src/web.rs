//! WebSearch trait, the last-resort source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// One web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// The search backend name (e.g., "duckduckgo").
    fn name(&self) -> &str;

    /// Run one search, returning at most `max_results` results.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<WebResult>, SearchError>;
}
