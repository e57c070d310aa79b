//! `ticketwise rules` — rule set inspection commands.

use clap::Subcommand;
use std::path::PathBuf;
use ticketwise_config::ConfigSnapshot;
use ticketwise_core::Ticket;
use ticketwise_rules::{RuleSet, RulesEngine};

#[derive(Subcommand)]
pub enum RulesAction {
    /// List the rules in evaluation order
    List {
        /// Path to the rules TOML file
        #[arg(short = 'f', long, default_value = "rules.toml")]
        rules: PathBuf,
    },

    /// Dry-run a ticket text against the rule set
    Check {
        /// Path to the rules TOML file
        #[arg(short = 'f', long, default_value = "rules.toml")]
        rules: PathBuf,

        /// The ticket text to test
        text: String,
    },
}

pub fn run(action: RulesAction) -> anyhow::Result<()> {
    match action {
        RulesAction::List { rules } => {
            let engine = RulesEngine::new(RuleSet::from_path(&rules)?)?;
            println!(
                "{} rules ({} enabled), in evaluation order:",
                engine.rules().count(),
                engine.active_count()
            );
            for rule in engine.rules() {
                println!(
                    "  [{:>5}] {}  -> {} (confidence {:.2}, sla {}h){}",
                    rule.priority,
                    rule.id,
                    rule.department,
                    rule.confidence,
                    rule.sla_hours,
                    if rule.enabled { "" } else { "  [disabled]" },
                );
            }
        }
        RulesAction::Check { rules, text } => {
            let engine = RulesEngine::new(RuleSet::from_path(&rules)?)?;
            let ticket = Ticket::new("dry-run", text);
            match engine.evaluate(&ticket, &ConfigSnapshot::default()) {
                Some(matched) => {
                    println!("Matched {}", matched.rule_id);
                    println!("  department: {}", matched.department);
                    println!("  confidence: {:.2}", matched.confidence);
                    println!("  sla:        {}h", matched.sla_hours);
                }
                None => println!("No rule matched; the ticket would continue to the cache stage."),
            }
        }
    }
    Ok(())
}
