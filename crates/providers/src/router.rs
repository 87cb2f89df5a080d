//! Provider selection from configuration.
//!
//! Every configured provider speaks the OpenAI wire format, so choosing
//! one comes down to resolving its endpoint, key and model.

use std::collections::BTreeMap;
use std::sync::Arc;

use hybridrag_config::AppConfig;
use hybridrag_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Where and how to reach one named provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .finish()
    }
}

impl Endpoint {
    /// Resolve `name` against the config. A `[providers.<name>]` table
    /// overrides the well-known URL, the global key and the global model.
    pub fn resolve(config: &AppConfig, name: &str) -> Self {
        let table = config.providers.get(name);
        Self {
            name: name.to_string(),
            base_url: table
                .and_then(|t| t.api_url.clone())
                .unwrap_or_else(|| well_known_url(name)),
            api_key: table
                .and_then(|t| t.api_key.clone())
                .or_else(|| config.api_key.clone())
                .unwrap_or_default(),
            model: table
                .and_then(|t| t.default_model.clone())
                .unwrap_or_else(|| config.default_model.clone()),
        }
    }

    pub fn connect(&self) -> Arc<dyn Provider> {
        Arc::new(OpenAiCompatProvider::new(&self.name, &self.base_url, &self.api_key))
    }
}

/// Named providers plus the one answers are synthesized with.
pub struct ProviderRouter {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_provider)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

/// Register every `[providers.*]` table and the default provider, which
/// needs no table of its own.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);
    let names = config
        .providers
        .keys()
        .map(String::as_str)
        .chain(std::iter::once(config.default_provider.as_str()));
    for name in names {
        router.register(name, Endpoint::resolve(config, name).connect());
    }
    router
}

/// The model the default provider answers with.
pub fn resolve_model(config: &AppConfig) -> String {
    Endpoint::resolve(config, &config.default_provider).model
}

fn well_known_url(name: &str) -> String {
    let url = match name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        other => return format!("https://{other}.api.example.com/v1"),
    };
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_config::ProviderConfig;

    #[test]
    fn endpoint_uses_well_known_url_and_global_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-global".into());
        let endpoint = Endpoint::resolve(&config, "openrouter");
        assert_eq!(endpoint.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(endpoint.api_key, "sk-global");
        assert_eq!(endpoint.model, "gpt-4o-mini");
    }

    #[test]
    fn provider_table_overrides_everything() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-global".into());
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: Some("local".into()),
                api_url: Some("http://gpu-box:11434/v1".into()),
                default_model: Some("llama3.1".into()),
            },
        );
        assert_eq!(
            Endpoint::resolve(&config, "ollama"),
            Endpoint {
                name: "ollama".into(),
                base_url: "http://gpu-box:11434/v1".into(),
                api_key: "local".into(),
                model: "llama3.1".into(),
            }
        );
    }

    #[test]
    fn default_config_registers_openai() {
        let router = build_from_config(&AppConfig::default());
        assert_eq!(router.list(), vec!["openai"]);
        assert_eq!(router.default().unwrap().name(), "openai");
        assert!(router.get("ollama").is_none());
    }

    #[test]
    fn tables_and_default_are_both_registered() {
        let mut config = AppConfig::default();
        config.default_provider = "ollama".into();
        config.providers.insert("groq".into(), ProviderConfig::default());
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["groq", "ollama"]);
        assert_eq!(router.default().unwrap().name(), "ollama");
    }

    #[test]
    fn resolve_model_prefers_provider_default() {
        assert_eq!(resolve_model(&AppConfig::default()), "gpt-4o-mini");

        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                default_model: Some("gpt-4o".into()),
                ..ProviderConfig::default()
            },
        );
        assert_eq!(resolve_model(&config), "gpt-4o");
    }

    #[test]
    fn unknown_provider_gets_placeholder_url() {
        assert_eq!(well_known_url("acme"), "https://acme.api.example.com/v1");
    }
}
