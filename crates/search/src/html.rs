//! DuckDuckGo HTML search client, the default web backend.
//!
//! Posts the query to `/html/` and scrapes the organic results from the
//! returned page: each `.result__body` block carries a title link and a
//! snippet. Result links go through DuckDuckGo's `/l/?uddg=` redirect and
//! are unwrapped to the target URL. Ads and repeated links are dropped.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use hybridrag_config::WebSearchConfig;
use hybridrag_core::error::SearchError;
use hybridrag_core::web::{WebResult, WebSearch};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Region sent with every query (worldwide).
const REGION: &str = "wt-wt";

const NO_RESULTS_MARKER: &str = "No  results.";

pub struct DuckDuckGoHtml {
    base_url: String,
    client: reqwest::Client,
}

impl DuckDuckGoHtml {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Mozilla/5.0 (compatible; hybridrag/", env!("CARGO_PKG_VERSION"), ")"))
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

    fn search_url(&self) -> Result<Url, SearchError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| SearchError::RequestFailed(format!("invalid base URL '{}': {e}", self.base_url)))?;
        base.join("/html/")
            .map_err(|e| SearchError::RequestFailed(format!("invalid search URL: {e}")))
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoHtml {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, SearchError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let url = self.search_url()?;
        debug!(%url, "DuckDuckGo HTML request");

        let response = self
            .client
            .post(url)
            .form(&[("q", query), ("kl", REGION), ("b", "")])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        // DuckDuckGo answers 202 with a challenge page when rate limiting.
        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "DuckDuckGo returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: body.chars().take(200).collect(),
            });
        }

        let page = response
            .text()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let mut results = parse_results(&page)?;
        results.truncate(max_results);
        debug!(results = results.len(), "DuckDuckGo results");
        Ok(results)
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::InvalidResponse(format!("selector '{css}': {e}")))
}

/// Organic results of a DuckDuckGo HTML page, in page order.
fn parse_results(page: &str) -> Result<Vec<WebResult>, SearchError> {
    if page.contains(NO_RESULTS_MARKER) {
        return Ok(Vec::new());
    }

    let block = selector(".result__body")?;
    let title_link = selector("h2 a")?;
    let snippet = selector(".result__snippet")?;

    let document = Html::parse_document(page);
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for body in document.select(&block) {
        let Some(link) = body.select(&title_link).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href").and_then(target_url) else {
            continue;
        };
        if is_ad(&href) || !seen.insert(href.clone()) {
            continue;
        }

        results.push(WebResult {
            title: normalize(link),
            url: href,
            snippet: body.select(&snippet).next().map(normalize).unwrap_or_default(),
        });
    }

    Ok(results)
}

/// The destination of a result link, unwrapping `/l/?uddg=` redirects.
fn target_url(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    let url = Url::parse(&absolute).ok()?;
    let redirect = url
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, target)| target.into_owned());
    Some(redirect.unwrap_or(absolute))
}

fn is_ad(href: &str) -> bool {
    href.starts_with("https://duckduckgo.com/y.js") || href.contains("ad_domain=")
}

/// Element text with whitespace collapsed.
fn normalize(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
