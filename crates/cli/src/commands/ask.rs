//! `hybridrag ask`: answer one question.

use std::path::{Path, PathBuf};

use hybridrag_core::memory::SessionId;
use hybridrag_router::Response;

use super::{load_config, read_context};

pub async fn run(
    config_path: Option<&Path>,
    query: &str,
    session: Option<String>,
    context: Vec<(String, PathBuf)>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    if !config.has_api_key() {
        return Err("No API key configured. Set HYBRIDRAG_API_KEY or add api_key to config.toml.".into());
    }

    let context = read_context(&context)?;
    let session = session.map(|s| SessionId::from(&s)).unwrap_or_default();
    let components = hybridrag_router::build(&config).await?;

    let response = components.router.answer(query, &session, &context).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }

    Ok(())
}

/// The answer followed by where it came from.
pub fn print_response(response: &Response) {
    println!("{}", response.answer);
    match response.source {
        Some(source) => {
            println!();
            println!("  [source: {source}]");
            for result in &response.results {
                if let Some(reference) = &result.reference {
                    println!("    - {reference} ({:.2})", result.score);
                }
            }
        }
        None => {
            let tried: Vec<_> = response.sources_tried.iter().map(|p| p.as_str()).collect();
            println!();
            println!("  [no source had an answer; tried: {}]", tried.join(", "));
        }
    }
}
