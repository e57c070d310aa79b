//! The rules evaluation engine.
//!
//! Conditions are compiled once at load; evaluation is read-only and
//! allocation-light, so a single engine is shared across the worker pool.

use crate::model::{RoutingRule, RuleSet};
use crate::RuleError;
use regex_lite::Regex;
use ticketwise_config::ConfigSnapshot;
use ticketwise_core::Ticket;
use tracing::{debug, trace};

/// The outcome of a rule hit.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule_id: String,
    pub department: String,
    pub confidence: f32,
    pub sla_hours: u32,
}

/// A rule with its condition compiled.
struct CompiledRule {
    rule: RoutingRule,
    /// Keywords pre-lowered for case-insensitive substring checks.
    keywords: Vec<String>,
    regex: Option<Regex>,
}

impl CompiledRule {
    fn matches(&self, text: &str, lowered: &str) -> bool {
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return true;
        }
        if let Some(regex) = &self.regex {
            return regex.is_match(text);
        }
        false
    }
}

/// Evaluates routing rules in strict ascending priority order.
pub struct RulesEngine {
    /// Sorted ascending by priority at construction.
    rules: Vec<CompiledRule>,
}

impl RulesEngine {
    /// Compile a validated rule set.
    pub fn new(set: RuleSet) -> Result<Self, RuleError> {
        set.validate()?;

        let mut rules = Vec::with_capacity(set.rules.len());
        for rule in set.rules {
            let regex = match &rule.regex {
                Some(pattern) => Some(Regex::new(pattern).map_err(|e| RuleError::InvalidRegex {
                    rule_id: rule.id.clone(),
                    reason: e.to_string(),
                })?),
                None => None,
            };
            let keywords = rule
                .keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .map(|k| k.to_lowercase())
                .collect();
            rules.push(CompiledRule {
                rule,
                keywords,
                regex,
            });
        }

        rules.sort_by_key(|c| c.rule.priority);
        Ok(Self { rules })
    }

    /// An engine with no rules; every ticket falls through.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Number of enabled rules.
    pub fn active_count(&self) -> usize {
        self.rules.iter().filter(|c| c.rule.enabled).count()
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &RoutingRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Evaluate the ticket against the rules in ascending priority.
    ///
    /// Side-effect-free. The first enabled rule that matches wins and
    /// evaluation stops there; `None` hands the ticket to the next stage.
    /// Confidence and SLA come from the config snapshot when the
    /// config-driven flag is on, else from the rule itself.
    pub fn evaluate(&self, ticket: &Ticket, config: &ConfigSnapshot) -> Option<RuleMatch> {
        let lowered = ticket.text.to_lowercase();

        for compiled in &self.rules {
            if !compiled.rule.enabled {
                continue;
            }
            trace!(rule = %compiled.rule.id, ticket = %ticket.id, "Evaluating rule");

            if compiled.matches(&ticket.text, &lowered) {
                let rule = &compiled.rule;
                let matched = RuleMatch {
                    rule_id: rule.id.clone(),
                    department: rule.department.clone(),
                    confidence: config.rule_confidence(&rule.id, rule.confidence),
                    sla_hours: config.rule_sla_hours(&rule.id, rule.sla_hours),
                };
                debug!(
                    rule = %rule.id,
                    ticket = %ticket.id,
                    department = %matched.department,
                    confidence = matched.confidence,
                    "Rule matched"
                );
                return Some(matched);
            }
        }

        None
    }
}
