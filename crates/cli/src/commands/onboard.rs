//! `hybridrag onboard`: first-time setup.

use std::path::Path;

use hybridrag_config::AppConfig;

use super::config_path;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path(path);

    println!("HybridRAG: First-Time Setup");
    println!("===========================\n");

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("Created config directory: {}", dir.display());
        } else {
            println!("  Config directory exists: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set HYBRIDRAG_API_KEY or add api_key to {}", config_path.display());
    println!("   2. Run: hybridrag ingest <docs-dir>");
    println!("   3. Run: hybridrag ask \"your question\"\n");

    Ok(())
}
