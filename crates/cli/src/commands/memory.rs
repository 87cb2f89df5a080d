//! `hybridrag memory`: conversation memory commands.

use std::path::Path;

use hybridrag_core::memory::MemoryQuery;
use hybridrag_router::builder::build_memory;

use super::load_config;

pub async fn history(config_path: Option<&Path>, session: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let memory = build_memory(&config).await?;

    let interactions = memory.history(session, Some(limit)).await?;
    if interactions.is_empty() {
        println!("No stored exchanges for session '{session}'.");
        return Ok(());
    }

    println!("Session '{session}' ({} of {} exchanges)", interactions.len(), memory.count(Some(session)).await?);
    for interaction in &interactions {
        let source = interaction.source.map(|p| p.as_str()).unwrap_or("-");
        println!();
        println!("  [{}] ({source})", interaction.created_at.format("%Y-%m-%d %H:%M:%S"));
        println!("  Q: {}", interaction.query);
        println!("  A: {}", interaction.response);
    }

    Ok(())
}

pub async fn search(
    config_path: Option<&Path>,
    session: &str,
    query: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let memory = build_memory(&config).await?;

    let results = memory
        .search(MemoryQuery {
            session_id: session.to_string(),
            text: query.to_string(),
            limit,
            min_score: 0.0,
        })
        .await?;

    if results.is_empty() {
        println!("No similar questions in session '{session}'.");
    } else {
        let threshold = config.router.memory_threshold;
        for (i, interaction) in results.iter().enumerate() {
            let marker = if interaction.score >= threshold { "*" } else { " " };
            println!("  {:>2}. {marker}[score: {:.2}] {}", i + 1, interaction.score, interaction.query);
        }
        println!();
        println!("  * would be answered from memory (threshold {threshold:.2})");
    }

    Ok(())
}

pub async fn clear(config_path: Option<&Path>, session: Option<&str>, confirm: bool) -> Result<(), Box<dyn std::error::Error>> {
    let scope = session.map_or_else(|| "ALL sessions".to_string(), |s| format!("session '{s}'"));
    if !confirm {
        println!("This will delete stored exchanges for {scope} permanently.");
        println!("   Run with --confirm to proceed.");
        return Ok(());
    }

    let config = load_config(config_path)?;
    let memory = build_memory(&config).await?;
    let before = memory.count(session).await?;
    memory.clear(session).await?;
    println!("Deleted {before} exchange(s) for {scope}.");

    Ok(())
}
