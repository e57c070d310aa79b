//! `ticketwise route` — run tickets through the full decision pipeline.

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use ticketwise_config::ConfigManager;
use ticketwise_core::{CompletionProvider, Ticket};
use ticketwise_engine::DecisionOrchestrator;
use ticketwise_rag::{ChatCompletionsClient, LlmStage};
use ticketwise_rules::{RuleSet, RulesEngine};
use ticketwise_similarity::{InMemoryIndex, SimilarityRouter};
use ticketwise_telemetry::{AccuracyTracker, DecisionLogger, TracingSink};

use super::config_cmd::LayerArgs;

#[derive(Args)]
pub struct RouteArgs {
    /// Ticket text to route (mutually exclusive with --file)
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// JSON file with an array of tickets
    #[arg(short = 'F', long)]
    pub file: Option<PathBuf>,

    /// Path to the rules TOML file
    #[arg(short = 'f', long, default_value = "rules.toml")]
    pub rules: PathBuf,

    /// JSON file with historical records backing the similarity index
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// OpenAI-compatible endpoint for the LLM stage
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub provider_url: String,

    /// API key for the LLM endpoint
    #[arg(long, env = "TICKETWISE_API_KEY", default_value = "")]
    pub api_key: String,

    /// Worker pool size for batch routing
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    #[command(flatten)]
    pub layers: LayerArgs,
}

pub async fn run(args: RouteArgs) -> anyhow::Result<()> {
    let tickets = load_tickets(&args)?;

    let config = Arc::new(ConfigManager::load(args.layers.paths()));
    let rules = Arc::new(RulesEngine::new(RuleSet::from_path(&args.rules)?)?);

    let index = match &args.history {
        Some(path) => InMemoryIndex::from_json_path(path)
            .with_context(|| format!("loading history from {}", path.display()))?,
        None => InMemoryIndex::default(),
    };
    let tracker = Arc::new(AccuracyTracker::new());
    let cache = Arc::new(SimilarityRouter::new(Arc::new(index), tracker));

    let provider: Arc<dyn CompletionProvider> = Arc::new(ChatCompletionsClient::new(
        "chat-completions",
        &args.provider_url,
        &args.api_key,
    )?);
    let llm = Arc::new(LlmStage::new(provider));

    let logger = Arc::new(DecisionLogger::with_sinks(vec![Box::new(TracingSink)]));
    let orchestrator = DecisionOrchestrator::new(rules, cache, llm, config, logger);

    let results = orchestrator.route_batch(&tickets, args.concurrency).await;

    let mut failures = 0usize;
    for result in results {
        match result {
            Ok(decision) => println!("{}", serde_json::to_string_pretty(&decision)?),
            Err(e) => {
                failures += 1;
                eprintln!("rejected: {e}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} ticket(s) rejected before routing");
    }
    Ok(())
}

fn load_tickets(args: &RouteArgs) -> anyhow::Result<Vec<Ticket>> {
    match (&args.text, &args.file) {
        (Some(text), None) => Ok(vec![Ticket::new("cli", text)]),
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading tickets from {}", path.display()))?;
            let tickets: Vec<Ticket> =
                serde_json::from_str(&content).context("tickets file must be a JSON array")?;
            Ok(tickets)
        }
        _ => anyhow::bail!("provide exactly one of: a ticket text, or --file"),
    }
}
