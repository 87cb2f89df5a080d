//! `hybridrag ingest`: load files into the knowledge base.

use std::path::Path;

use hybridrag_config::EmbedderKind;
use hybridrag_knowledge::LoadOptions;
use hybridrag_router::builder::{build_embedder, build_knowledge, build_provider};
use tracing::info;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    path: &Path,
    recreate: bool,
    upsert: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    if !path.exists() {
        return Err(format!("{} does not exist", path.display()).into());
    }

    // Only the provider embedder needs credentials.
    let provider = match config.knowledge.embedder {
        EmbedderKind::Provider => Some(build_provider(&config)?),
        EmbedderKind::Hash => None,
    };
    let embedder = build_embedder(&config, provider)?;
    let knowledge = build_knowledge(&config, embedder).await?;

    let options = LoadOptions {
        recreate,
        upsert,
        skip_existing: !upsert,
    };
    info!(path = %path.display(), recreate, upsert, "Ingesting");
    let summary = knowledge.load_path(path, options).await?;
    let total = knowledge.count().await?;

    println!("Ingested {}", path.display());
    println!("  Chunks read:     {}", summary.read);
    println!("  Already stored:  {}", summary.skipped);
    println!("  Written:         {}", summary.written);
    println!("  Total in store:  {total}");

    Ok(())
}
