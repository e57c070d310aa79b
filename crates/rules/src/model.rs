//! The routing rule schema.
//!
//! Rules are declared in TOML, loaded once, and immutable afterwards.
//! Load-time validation enforces everything evaluation relies on: unique
//! ids, a strict total priority order, confidence within [0, 1], and a
//! condition that can actually match something.

use crate::RuleError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A single deterministic routing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Unique rule id (e.g. "R001").
    pub id: String,

    /// Evaluation position: lower priority is evaluated first.
    pub priority: i64,

    /// Case-insensitive keywords; any substring hit matches.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Optional regex condition (matched against the raw ticket text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Compiled-in confidence for decisions made by this rule.
    pub confidence: f32,

    /// Target department.
    pub department: String,

    /// Compiled-in SLA target for tickets routed by this rule.
    pub sla_hours: u32,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Disabled rules stay in the file but never match.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// An ordered collection of routing rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl RuleSet {
    /// Parse a rule set from TOML and validate it.
    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        let set: Self =
            toml::from_str(content).map_err(|e| RuleError::ParseError(e.to_string()))?;
        set.validate()?;
        Ok(set)
    }

    /// Load a rule set from a file.
    pub fn from_path(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path).map_err(|e| RuleError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Number of enabled rules.
    pub fn active_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }

    /// Validate the whole set.
    pub fn validate(&self) -> Result<(), RuleError> {
        let mut ids = HashSet::new();
        let mut priorities: Vec<(i64, &str)> = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            if !ids.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateId(rule.id.clone()));
            }
            if let Some((_, first)) = priorities.iter().find(|(p, _)| *p == rule.priority) {
                return Err(RuleError::DuplicatePriority {
                    first: (*first).to_string(),
                    second: rule.id.clone(),
                    priority: rule.priority,
                });
            }
            priorities.push((rule.priority, rule.id.as_str()));
            rule.validate()?;
        }
        Ok(())
    }
}

impl RoutingRule {
    fn validate(&self) -> Result<(), RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::InvalidRule {
                rule_id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if self.department.trim().is_empty() {
            return Err(RuleError::InvalidRule {
                rule_id: self.id.clone(),
                reason: "department must not be empty".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(RuleError::InvalidRule {
                rule_id: self.id.clone(),
                reason: format!("confidence {} outside [0, 1]", self.confidence),
            });
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) && self.regex.is_none() {
            return Err(RuleError::InvalidRule {
                rule_id: self.id.clone(),
                reason: "rule needs at least one keyword or a regex".into(),
            });
        }
        Ok(())
    }
}
