//! DuckDuckGo Instant Answer client.
//!
//! Only encyclopedic topics get an answer; everyday questions come back
//! empty. Select it with `web_search.backend = "instant_answer"`.
//!
//! Calls `GET /?q=<query>&format=json&no_html=1&skip_disambig=1` and turns
//! the abstract, direct answer, results and related topics (including
//! grouped topics) into [`WebResult`]s, in that order.

use std::time::Duration;

use async_trait::async_trait;
use hybridrag_config::WebSearchConfig;
use hybridrag_core::error::SearchError;
use hybridrag_core::web::{WebResult, WebSearch};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

pub struct DuckDuckGoInstant {
    base_url: String,
    client: reqwest::Client,
}

impl DuckDuckGoInstant {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hybridrag/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn from_config(config: &WebSearchConfig) -> Self {
        Self::new(config.endpoint(), Duration::from_secs(config.timeout_secs))
    }

    fn request_url(&self, query: &str) -> Result<Url, SearchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SearchError::RequestFailed(format!("invalid base URL '{}': {e}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("no_html", "1")
            .append_pair("skip_disambig", "1");
        Ok(url)
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoInstant {
    fn name(&self) -> &str {
        "duckduckgo_instant"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, SearchError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let url = self.request_url(query)?;
        debug!(%url, "DuckDuckGo Instant Answer request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "DuckDuckGo returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: body,
            });
        }

        // The API answers with `application/x-javascript`, so parse the text.
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let mut results = answer.into_results();
        results.truncate(max_results);
        debug!(results = results.len(), "DuckDuckGo results");
        Ok(results)
    }
}

// --- DuckDuckGo API types ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    abstract_source: String,
    /// A string for most queries, an object for calculator-style answers.
    answer: serde_json::Value,
    results: Vec<Topic>,
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Topic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<Topic>,
    },
    Single(Topic),
}

impl InstantAnswer {
    fn into_results(self) -> Vec<WebResult> {
        let mut results = Vec::new();

        if !self.abstract_text.trim().is_empty() {
            let title = if self.heading.is_empty() {
                self.abstract_source.clone()
            } else {
                self.heading.clone()
            };
            results.push(WebResult {
                title,
                url: self.abstract_url.clone(),
                snippet: self.abstract_text.clone(),
            });
        }

        if let Some(answer) = self.answer.as_str().filter(|a| !a.trim().is_empty()) {
            results.push(WebResult {
                title: self.heading.clone(),
                url: String::new(),
                snippet: answer.to_string(),
            });
        }

        let topics = self.results.into_iter().chain(
            self.related_topics
                .into_iter()
                .flat_map(|related| match related {
                    RelatedTopic::Group { topics } => topics,
                    RelatedTopic::Single(topic) => vec![topic],
                }),
        );

        for topic in topics {
            if topic.text.trim().is_empty() {
                continue;
            }
            results.push(WebResult {
                title: title_from_url(&topic.first_url).unwrap_or_else(|| topic.text.clone()),
                url: topic.first_url,
                snippet: topic.text,
            });
        }

        results
    }
}

/// `https://duckduckgo.com/Rust_(programming_language)` becomes
/// `Rust (programming language)`.
fn title_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    // Topic paths never contain `=` or `&`, so the segment parses as one key.
    let (decoded, _) = url::form_urlencoded::parse(segment.as_bytes()).next()?;
    let title = decoded.replace('_', " ");
    (!title.trim().is_empty()).then_some(title)
}
