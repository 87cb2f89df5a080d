//! Turns retrieved material into an answer with one LLM call.
//!
//! The request is laid out as:
//!
//! 1. a system message with the answering instructions
//! 2. the session's recent exchanges as user/assistant pairs
//! 3. a user message holding the references and the question

use std::sync::Arc;

use hybridrag_core::error::ProviderError;
use hybridrag_core::memory::Interaction;
use hybridrag_core::message::Message;
use hybridrag_core::provider::{Provider, ProviderRequest, ProviderResponse};
use hybridrag_core::source::SourceHit;
use tracing::debug;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions \
using the references provided with each question. Base your answer on the references. \
If they do not contain the answer, say that you don't know. Keep answers short and \
do not mention the references themselves.";

pub struct Synthesizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the provider request without sending it.
    pub fn build_request(&self, query: &str, hit: &SourceHit, history: &[Interaction]) -> ProviderRequest {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message::system(&self.system_prompt));
        for interaction in history {
            messages.push(Message::user(&interaction.query));
            messages.push(Message::assistant(&interaction.response));
        }
        messages.push(Message::user(format_prompt(query, hit)));

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        hit: &SourceHit,
        history: &[Interaction],
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(query, hit, history);
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            source = %hit.provenance,
            "Synthesizing answer"
        );
        self.provider.complete(request).await
    }
}

/// The final user message: numbered references, then the question.
pub fn format_prompt(query: &str, hit: &SourceHit) -> String {
    let mut prompt = format!("<references source=\"{}\">\n", hit.provenance);
    for (n, result) in hit.results.iter().enumerate() {
        let line = match &result.reference {
            Some(reference) => format!("[{}] ({reference}) {}\n", n + 1, result.snippet.trim()),
            None => format!("[{}] {}\n", n + 1, result.snippet.trim()),
        };
        prompt.push_str(&line);
    }
    prompt.push_str("</references>\n\n");
    prompt.push_str(&format!("Question: {}", query.trim()));
    prompt
}
