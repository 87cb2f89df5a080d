//! HybridRAG CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: write a default config
//! - `ask`: answer one question
//! - `chat`: interactive session
//! - `ingest`: load files into the knowledge base
//! - `memory`: inspect or clear conversation memory
//! - `serve`: start the HTTP gateway
//! - `status`: show the effective configuration
//! - `doctor`: diagnose setup problems

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hybridrag",
    about = "HybridRAG: answers from memory, knowledge base, context or the web",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default ~/.hybridrag/config.toml)
    #[arg(short, long, global = true, env = "HYBRIDRAG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Answer a single question
    Ask {
        /// The question
        query: String,

        /// Session ID (a new one is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Context block from a file, as NAME=PATH (repeatable)
        #[arg(long = "context", value_parser = commands::parse_context_arg)]
        context: Vec<(String, PathBuf)>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive question-answer session
    Chat {
        /// Session ID (a new one is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Load a file or directory into the knowledge base
    Ingest {
        path: PathBuf,

        /// Clear the knowledge base first
        #[arg(long)]
        recreate: bool,

        /// Replace documents with the same ID
        #[arg(long)]
        upsert: bool,
    },

    /// Conversation memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show system status
    Status,

    /// Diagnose system health
    Doctor,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show a session's recent exchanges
    History {
        session: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Find stored questions similar to QUERY
    Search {
        session: String,
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Delete stored exchanges
    Clear {
        /// Only this session
        #[arg(short, long)]
        session: Option<String>,

        /// Required to actually delete
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Onboard => commands::onboard::run(config).await?,
        Commands::Ask {
            query,
            session,
            context,
            json,
        } => commands::ask::run(config, &query, session, context, json).await?,
        Commands::Chat { session } => commands::chat::run(config, session).await?,
        Commands::Ingest {
            path,
            recreate,
            upsert,
        } => commands::ingest::run(config, &path, recreate, upsert).await?,
        Commands::Memory { action } => match action {
            MemoryAction::History { session, limit } => {
                commands::memory::history(config, &session, limit).await?
            }
            MemoryAction::Search {
                session,
                query,
                limit,
            } => commands::memory::search(config, &session, &query, limit).await?,
            MemoryAction::Clear { session, confirm } => {
                commands::memory::clear(config, session.as_deref(), confirm).await?
            }
        },
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Status => commands::status::run(config).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}
