//! Deterministic routing rules for TicketWise.
//!
//! Rules are the fastest and cheapest routing stage: an ordered list of
//! keyword/regex conditions mapped to departments. The engine evaluates
//! them in strict ascending priority and stops at the first match —
//! later rules are never looked at once one fires.

pub mod engine;
pub mod model;

pub use engine::{RuleMatch, RulesEngine};
pub use model::{RoutingRule, RuleSet};

/// Errors raised while loading or compiling a rule set.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Failed to read rules file at {path}: {reason}")]
    ReadError { path: std::path::PathBuf, reason: String },

    #[error("Failed to parse rules: {0}")]
    ParseError(String),

    #[error("Duplicate rule id: {0}")]
    DuplicateId(String),

    #[error("Rules {first} and {second} share priority {priority}; evaluation order must be total")]
    DuplicatePriority {
        first: String,
        second: String,
        priority: i64,
    },

    #[error("Rule {rule_id}: {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("Rule {rule_id}: regex failed to compile: {reason}")]
    InvalidRegex { rule_id: String, reason: String },
}
