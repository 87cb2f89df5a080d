//! Last resort: a web search.

use std::sync::Arc;

use async_trait::async_trait;
use hybridrag_core::source::{Provenance, SearchResult, Source, SourceHit, SourceRequest};
use hybridrag_core::web::WebSearch;
use tracing::debug;

pub struct WebSource {
    search: Arc<dyn WebSearch>,
    max_results: usize,
}

impl WebSource {
    pub fn new(search: Arc<dyn WebSearch>, max_results: usize) -> Self {
        Self { search, max_results }
    }
}

#[async_trait]
impl Source for WebSource {
    fn provenance(&self) -> Provenance {
        Provenance::Web
    }

    async fn search(&self, request: &SourceRequest<'_>) -> hybridrag_core::Result<Option<SourceHit>> {
        let found = self.search.search(request.query, self.max_results).await?;
        debug!(backend = self.search.name(), results = found.len(), "Web searched");

        // Results arrive ranked; score them by position.
        let results = found
            .into_iter()
            .filter(|r| !r.snippet.trim().is_empty())
            .enumerate()
            .map(|(rank, r)| {
                let reference = if r.url.is_empty() { r.title } else { r.url };
                SearchResult::new(r.snippet, Provenance::Web, 1.0 / (rank + 1) as f32)
                    .with_reference(reference)
            })
            .collect();
        Ok(SourceHit::from_results(Provenance::Web, results))
    }
}
