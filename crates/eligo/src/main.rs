//! Eligo - scheme eligibility lookup service
//!
//! Main entry point for the Eligo CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod bootstrap;
mod client;
mod commands;

use commands::{check, config, start, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Eligo - scheme eligibility lookup service
#[derive(Parser)]
#[command(name = "eligo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file applied on top of discovered config
    #[arg(long, global = true, env = "ELIGO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server URL for client commands (default: from [server] config)
    #[arg(long, global = true, env = "ELIGO_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Eligo server
    Start(start::StartArgs),

    /// Look up one scheme ID directly, without a server
    Check(check::CheckArgs),

    /// Show a running server's pool and cache counters
    Status(status::StatusArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "eligo=debug,eligo_engine=debug,eligo_cache=debug,eligo_server=debug,eligo_store=debug,eligo_config=debug,info"
    } else {
        "eligo=info,eligo_engine=info,eligo_cache=info,eligo_server=info,eligo_store=info,warn"
    };

    let log_dir = eligo_config::logs_dir();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "eligo.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "eligo=trace,eligo_engine=trace,eligo_cache=trace,eligo_server=trace,eligo_store=trace,eligo_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        server_url: cli.server,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
