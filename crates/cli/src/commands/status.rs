//! `hybridrag status`: show the effective configuration.

use std::path::Path;

use hybridrag_config::{EmbedderKind, KnowledgeBackend, MemoryBackend};

use super::{config_path, load_config};

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let router = &config.router;

    println!("HybridRAG Status");
    println!("================");
    println!("  Config:       {}", config_path(path).display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    let memory = match config.memory.backend {
        MemoryBackend::Sqlite => format!("sqlite ({})", config.sqlite_path().display()),
        MemoryBackend::Postgres => "postgres".to_string(),
        MemoryBackend::InMemory => "in_memory".to_string(),
    };
    println!("  Memory:       {memory}");
    let knowledge = match config.knowledge.backend {
        KnowledgeBackend::File => format!("file ({})", config.knowledge_path().display()),
        KnowledgeBackend::Postgres => format!("postgres (table {})", config.knowledge.table),
        KnowledgeBackend::InMemory => "in_memory".to_string(),
    };
    println!("  Knowledge:    {knowledge}");
    let embedder = match config.knowledge.embedder {
        EmbedderKind::Hash => "hash".to_string(),
        EmbedderKind::Provider => config.knowledge.embedding_model.clone(),
    };
    println!("  Embedder:     {embedder} ({} dims)", config.knowledge.dimensions());
    println!(
        "  Web search:   {}",
        if config.web_search.enabled { config.web_search.endpoint() } else { "disabled" }
    );
    println!(
        "  Thresholds:   memory={:.2}, knowledge={:.2}, context={:.2}",
        router.memory_threshold, router.knowledge_threshold, router.context_threshold
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);

    if config_path(path).exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file: run `hybridrag onboard` first");
    }

    Ok(())
}
