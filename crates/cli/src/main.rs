//! TicketWise CLI — the main entry point.
//!
//! Commands:
//! - `route`  — Route one ticket or a JSON batch through the full pipeline
//! - `config` — Validate or print the layered configuration
//! - `rules`  — List rules or dry-run a text against them

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ticketwise",
    about = "TicketWise — multi-stage support ticket routing engine",
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
    /// Route a ticket (or a JSON file of tickets) to a department
    Route(commands::route::RouteArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config_cmd::ConfigAction,
    },

    /// Routing rule management
    Rules {
        #[command(subcommand)]
        action: commands::rules_cmd::RulesAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Route(args) => commands::route::run(args).await?,
        Commands::Config { action } => commands::config_cmd::run(action)?,
        Commands::Rules { action } => commands::rules_cmd::run(action)?,
    }

    Ok(())
}
