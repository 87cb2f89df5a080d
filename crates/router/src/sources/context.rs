//! Answers from text the caller sent along with the question.
//!
//! Each context block is split into paragraphs (blank-line separated). A
//! paragraph scores the fraction of the query's terms it contains.

use async_trait::async_trait;
use hybridrag_core::source::{Provenance, SearchResult, Source, SourceHit, SourceRequest};
use hybridrag_core::text;
use tracing::debug;

/// Most paragraphs forwarded from the context.
pub const MAX_PARAGRAPHS: usize = 3;

pub struct ContextSource {
    threshold: f32,
}

impl ContextSource {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

/// Split text into trimmed, non-empty paragraphs.
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs
}

#[async_trait]
impl Source for ContextSource {
    fn provenance(&self) -> Provenance {
        Provenance::Context
    }

    async fn search(&self, request: &SourceRequest<'_>) -> hybridrag_core::Result<Option<SourceHit>> {
        if request.context.is_empty() {
            return Ok(None);
        }

        let mut results: Vec<SearchResult> = request
            .context
            .blocks()
            .flat_map(|(name, block)| {
                paragraphs(block).into_iter().filter_map(move |paragraph| {
                    let score = text::coverage(request.query, &paragraph);
                    (score > 0.0 && score >= self.threshold).then(|| {
                        SearchResult::new(paragraph, Provenance::Context, score).with_reference(name)
                    })
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(MAX_PARAGRAPHS);
        debug!(paragraphs = results.len(), "Context searched");

        Ok(SourceHit::from_results(Provenance::Context, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::source::SessionContext;

    fn request<'a>(query: &'a str, context: &'a SessionContext) -> SourceRequest<'a> {
        SourceRequest {
            query,
            session_id: "s1",
            context,
        }
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let text = "First line\ncontinues here.\n\n  \nSecond paragraph.\n";
        assert_eq!(
            paragraphs(text),
            vec!["First line continues here.".to_string(), "Second paragraph.".to_string()]
        );
        assert!(paragraphs("  \n\n").is_empty());
    }

    #[tokio::test]
    async fn covering_paragraph_hits() {
        let ctx = SessionContext::new().with_block(
            "faq",
            "Shipping takes five business days.\n\nRefund policy: returns accepted within 30 days.",
        );
        let hit = ContextSource::new(0.5)
            .search(&request("What is the refund policy?", &ctx))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.provenance, Provenance::Context);
        assert_eq!(hit.results.len(), 1);
        assert_eq!(hit.results[0].snippet, "Refund policy: returns accepted within 30 days.");
        assert_eq!(hit.results[0].reference.as_deref(), Some("faq"));
        assert!((hit.results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn partial_coverage_below_threshold_misses() {
        // One of three query terms is present.
        let ctx = SessionContext::new().with_block("notes", "Our policy changes yearly.");
        let hit = ContextSource::new(0.5)
            .search(&request("refund policy exceptions", &ctx))
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn empty_context_misses() {
        let ctx = SessionContext::new();
        assert!(ContextSource::new(0.5).search(&request("refund", &ctx)).await.unwrap().is_none());

        let blank = SessionContext::new().with_block("notes", "   ");
        assert!(ContextSource::new(0.0).search(&request("refund", &blank)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keeps_best_paragraphs_only() {
        let block = (1..=5)
            .map(|n| format!("Refund rule {n} applies."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let ctx = SessionContext::new()
            .with_block("rules", block)
            .with_block("policy", "The refund policy is generous.");

        let hit = ContextSource::new(0.5)
            .search(&request("refund policy", &ctx))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.results.len(), MAX_PARAGRAPHS);
        assert_eq!(hit.results[0].snippet, "The refund policy is generous.");
        assert!((hit.results[1].score - 0.5).abs() < 1e-6);
    }
}
