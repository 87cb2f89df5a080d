//! Shared mocks for router tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use hybridrag_core::error::{ProviderError, SearchError};
use hybridrag_core::message::Message;
use hybridrag_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use hybridrag_core::web::{WebResult, WebSearch};

/// A provider that answers every request with the same text and records
/// what it was asked.
pub struct ScriptedProvider {
    answer: String,
    fail: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: "scripted failure".into(),
            });
        }
        Ok(ProviderResponse {
            message: Message::assistant(&self.answer),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// A web search returning canned results and counting its calls.
pub struct CountingWebSearch {
    results: Vec<WebResult>,
    fail: bool,
    calls: AtomicUsize,
    last_max_results: Mutex<Option<usize>>,
}

impl CountingWebSearch {
    pub fn new(results: Vec<WebResult>) -> Self {
        Self {
            results,
            fail: false,
            calls: AtomicUsize::new(0),
            last_max_results: Mutex::new(None),
        }
    }

    /// One result with the given snippet.
    pub fn with_snippet(snippet: &str) -> Self {
        Self::new(vec![WebResult {
            title: "Result".into(),
            url: "https://example.com/result".into(),
            snippet: snippet.into(),
        }])
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_max_results(&self) -> Option<usize> {
        *self.last_max_results.lock().unwrap()
    }
}

#[async_trait]
impl WebSearch for CountingWebSearch {
    fn name(&self) -> &str {
        "counting"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_max_results.lock().unwrap() = Some(max_results);
        if self.fail {
            return Err(SearchError::RequestFailed("connection refused".into()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}
