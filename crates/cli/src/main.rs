//! Conductor CLI: the main entry point.
//!
//! Commands:
//! - `list`: Show the pattern catalogue
//! - `run`: Run one pattern and stream its progress
//! - `validate`: Run every pattern and check its progress stream
//! - `onboard`: Initialize config & session directory
//! - `doctor`: Diagnose configuration and backend health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "conductor",
    about = "Conductor — multi-agent orchestration for CIO advisory patterns",
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
    /// List the patterns in the catalogue
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one pattern against a query
    Run {
        /// Pattern number ("18") or key ("guardrails")
        pattern: String,

        /// The query handed to the pattern
        query: String,

        /// Session key for memory recall (overrides the pattern's own)
        #[arg(short, long)]
        session: Option<String>,

        /// Use canned offline answers instead of a backend
        #[arg(long)]
        offline: bool,

        /// Print each progress event as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Run every pattern and check its progress stream
    Validate {
        /// Call the configured backends instead of the offline invoker
        #[arg(long)]
        live: bool,

        /// Query used for every pattern
        #[arg(short, long)]
        query: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize configuration and session directory
    Onboard,

    /// Diagnose configuration and backend health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries progress events only
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
        Commands::List { json } => commands::list::run(json).await?,
        Commands::Run {
            pattern,
            query,
            session,
            offline,
            json,
        } => commands::run::run(&pattern, &query, session, offline, json).await?,
        Commands::Validate { live, query, json } => {
            commands::validate::run(live, query, json).await?
        }
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
