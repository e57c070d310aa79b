//! `ticketwise config` — configuration management commands.

use anyhow::Context;
use clap::Subcommand;
use std::path::PathBuf;
use ticketwise_config::{ConfigManager, LayeredPaths};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Merge and validate the layered documents without installing them
    Validate(LayerArgs),

    /// Print the effective merged configuration as JSON
    Show(LayerArgs),
}

#[derive(clap::Args)]
pub struct LayerArgs {
    /// Directory holding base.toml and the overlay documents
    #[arg(short, long, default_value = "config")]
    pub config_dir: PathBuf,

    /// Environment overlay name (loads <dir>/<name>.toml)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Region overlay name (loads <dir>/<name>.toml)
    #[arg(short, long)]
    pub region: Option<String>,
}

impl LayerArgs {
    pub fn paths(&self) -> LayeredPaths {
        LayeredPaths::from_dir(
            &self.config_dir,
            self.environment.as_deref(),
            self.region.as_deref(),
        )
    }
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate(args) => {
            match ConfigManager::try_load(args.paths()) {
                Ok(manager) => {
                    let snapshot = manager.snapshot();
                    println!("Configuration is valid.");
                    println!("  environment:   {}", display_or_dash(&snapshot.environment));
                    println!("  region:        {}", display_or_dash(&snapshot.region));
                    println!("  config-driven: {}", snapshot.config_driven());
                    println!("  similarity:    {}", snapshot.thresholds.similarity);
                    println!("  accuracy:      {}", snapshot.thresholds.accuracy);
                }
                Err(e) => {
                    // Non-zero exit so CI can gate on it.
                    anyhow::bail!("configuration rejected: {e}");
                }
            }
        }
        ConfigAction::Show(args) => {
            let manager = ConfigManager::try_load(args.paths())
                .context("configuration rejected")?;
            let snapshot = manager.snapshot();
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        }
    }
    Ok(())
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
