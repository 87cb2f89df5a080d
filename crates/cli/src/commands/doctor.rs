//! `hybridrag doctor`: diagnose setup problems.

use std::path::Path;

use hybridrag_config::{AppConfig, KnowledgeBackend, MemoryBackend};
use hybridrag_router::builder::{build_embedder, build_knowledge, build_memory};

use super::config_path;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("HybridRAG Doctor: System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;
    let config_path = config_path(path);

    let config = if config_path.exists() {
        match AppConfig::load_with_env(&config_path) {
            Ok(config) => {
                println!("  [ok]   Config file valid");
                config
            }
            Err(e) => {
                println!("  [fail] Config file invalid: {e}");
                println!("\n  1 issue found. Fix the config and re-run.");
                return Ok(());
            }
        }
    } else {
        println!("  [warn] No config file: run `hybridrag onboard` (using defaults)");
        issues += 1;
        AppConfig::default()
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured");
    } else {
        println!("  [warn] No API key: set HYBRIDRAG_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    let needs_database = config.memory.backend == MemoryBackend::Postgres
        || config.knowledge.backend == KnowledgeBackend::Postgres;
    if needs_database && config.database.url.is_none() {
        println!("  [fail] PostgreSQL backend selected but database.url is not set");
        issues += 1;
    }

    match build_memory(&config).await {
        Ok(memory) => match memory.count(None).await {
            Ok(n) => println!("  [ok]   Memory ({}) reachable, {n} exchange(s)", memory.name()),
            Err(e) => {
                println!("  [fail] Memory ({}) query failed: {e}", memory.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  [fail] Memory unavailable: {e}");
            issues += 1;
        }
    }

    // The provider embedder would need a live API call; only the hash embedder is probed.
    match build_embedder(&config, None) {
        Ok(embedder) => match build_knowledge(&config, embedder).await {
            Ok(knowledge) => match knowledge.count().await {
                Ok(0) => {
                    println!("  [warn] Knowledge base is empty: run `hybridrag ingest <path>`");
                    issues += 1;
                }
                Ok(n) => println!("  [ok]   Knowledge base ({}) has {n} chunk(s)", knowledge.store().name()),
                Err(e) => {
                    println!("  [fail] Knowledge base query failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  [fail] Knowledge base unavailable: {e}");
                issues += 1;
            }
        },
        Err(_) => println!("  [skip] Knowledge base uses the provider embedder"),
    }

    if !config.web_search.enabled {
        println!("  [info] Web search disabled");
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
