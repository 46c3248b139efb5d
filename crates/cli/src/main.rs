//! gitsage CLI: the main entry point.
//!
//! Commands:
//! - `init`     Write a default config file
//! - `ask`      Ask the agent a question, once or interactively
//! - `gateway`  Start the HTTP server
//! - `doctor`   Check config, credentials and external tools

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "gitsage",
    about = "gitsage: a code review assistant for GitHub repositories",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// Ask the agent about a repository
    Ask {
        /// The question; omit to start an interactive session
        question: Vec<String>,

        /// GitHub repository the question is about
        #[arg(short, long)]
        repo_url: Option<String>,

        /// Local checkout for the file tools
        #[arg(short, long)]
        local: Option<PathBuf>,

        /// Session id for conversation memory
        #[arg(short, long, default_value = gitsage_core::DEFAULT_SESSION_ID)]
        session: String,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Local checkout for the file tools
        #[arg(short, long)]
        local: Option<PathBuf>,
    },

    /// Diagnose configuration and external tools
    Doctor,
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

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Ask {
            question,
            repo_url,
            local,
            session,
        } => {
            let question = (!question.is_empty()).then(|| question.join(" "));
            commands::ask::run(question, repo_url, local, session).await?
        }
        Commands::Gateway { port, host, local } => {
            commands::gateway::run(port, host, local).await?
        }
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
