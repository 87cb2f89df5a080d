//! `hybridrag chat`: interactive session over stdin.

use std::io::Write;
use std::path::Path;

use hybridrag_core::memory::SessionId;
use hybridrag_core::source::SessionContext;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ask::print_response;
use super::load_config;

pub async fn run(config_path: Option<&Path>, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    if !config.has_api_key() {
        return Err("No API key configured. Set HYBRIDRAG_API_KEY or add api_key to config.toml.".into());
    }

    let components = hybridrag_router::build(&config).await?;
    let session = session.map(|s| SessionId::from(&s)).unwrap_or_default();
    let context = SessionContext::new();

    let order: Vec<_> = components
        .router
        .source_order()
        .into_iter()
        .map(|p| p.as_str())
        .collect();
    println!();
    println!("  HybridRAG interactive session");
    println!("  Session:  {session}");
    println!("  Model:    {}", components.router.synthesizer().model());
    println!("  Sources:  {}", order.join(" -> "));
    println!();
    println!("  Type a question and press Enter. Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        match components.router.answer(query, &session, &context).await {
            Ok(response) => {
                println!();
                print_response(&response);
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
