//! `hybridrag serve`: start the HTTP API server.

use std::path::Path;

use super::load_config;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("HybridRAG Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);

    hybridrag_gateway::start(config).await?;

    Ok(())
}
