//! The typed configuration schema and its validation bounds.
//!
//! `deny_unknown_fields` on every section makes the base document itself
//! the schema: a key that deserializes is a key overlays may override.

use crate::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An immutable configuration snapshot.
///
/// Built once per successful (re)load and swapped in atomically; readers
/// hold an `Arc` and never observe a partially updated snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSnapshot {
    /// Which environment overlay produced this snapshot (e.g. "production").
    #[serde(default)]
    pub environment: String,

    /// Which region overlay produced this snapshot (e.g. "eu-west").
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub sla: SlaConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub routing: RoutingDefaults,

    #[serde(default)]
    pub feature_flags: FeatureFlags,

    /// Monotonically increasing snapshot version, stamped by the manager.
    #[serde(skip)]
    pub version: u64,

    /// When this snapshot was installed.
    #[serde(skip, default = "Utc::now")]
    pub loaded_at: DateTime<Utc>,
}

/// Decision thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    /// Minimum similarity for cache reuse.
    #[serde(default = "default_similarity")]
    pub similarity: f32,

    /// Minimum department accuracy for cache reuse.
    #[serde(default = "default_accuracy")]
    pub accuracy: f32,

    /// Confidence stamped on fallback decisions. Always the floor of
    /// every configured confidence value.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f32,

    /// Per-rule confidence overrides, keyed by rule id. Open table:
    /// overlays may add entries for rules the base does not mention.
    #[serde(default)]
    pub rule_confidence: BTreeMap<String, f32>,
}

fn default_similarity() -> f32 {
    0.88
}
fn default_accuracy() -> f32 {
    0.82
}
fn default_fallback_confidence() -> f32 {
    0.30
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            similarity: default_similarity(),
            accuracy: default_accuracy(),
            fallback_confidence: default_fallback_confidence(),
            rule_confidence: BTreeMap::new(),
        }
    }
}

/// SLA targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlaConfig {
    /// Default SLA when no rule-specific target applies.
    #[serde(default = "default_sla_hours")]
    pub default_hours: u32,

    /// Per-rule SLA overrides, keyed by rule id. Open table.
    #[serde(default)]
    pub rule_hours: BTreeMap<String, u32>,
}

fn default_sla_hours() -> u32 {
    24
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            default_hours: default_sla_hours(),
            rule_hours: BTreeMap::new(),
        }
    }
}

/// LLM stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Model requested from the provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff before a retry; doubles per attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// How many historical records the RAG prompt embeds.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    1
}
fn default_backoff_ms() -> u64 {
    250
}
fn default_top_k() -> usize {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            top_k: default_top_k(),
        }
    }
}

/// Routing defaults and the known department set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingDefaults {
    /// Where fallback decisions land.
    #[serde(default = "default_department")]
    pub default_department: String,

    /// Departments the LLM is allowed to answer with. Empty = accept any.
    #[serde(default)]
    pub departments: Vec<String>,
}

fn default_department() -> String {
    "general_support".into()
}

impl Default for RoutingDefaults {
    fn default() -> Self {
        Self {
            default_department: default_department(),
            departments: Vec::new(),
        }
    }
}

/// Feature flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureFlags {
    /// When false, the rules engine, similarity router, and orchestrator
    /// ignore configured thresholds and use their compiled-in defaults.
    /// This is the rollback lever: flipping it off requires no redeploy.
    #[serde(default)]
    pub use_config_driven_thresholds: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_config_driven_thresholds: false,
        }
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            environment: String::new(),
            region: String::new(),
            thresholds: Thresholds::default(),
            sla: SlaConfig::default(),
            llm: LlmConfig::default(),
            routing: RoutingDefaults::default(),
            feature_flags: FeatureFlags::default(),
            version: 0,
            loaded_at: Utc::now(),
        }
    }
}

impl ConfigSnapshot {
    /// Whether components should pull thresholds from this snapshot.
    pub fn config_driven(&self) -> bool {
        self.feature_flags.use_config_driven_thresholds
    }

    /// Effective confidence for a rule: the configured override when the
    /// flag is on and one exists, else the rule's compiled-in value.
    pub fn rule_confidence(&self, rule_id: &str, compiled: f32) -> f32 {
        if self.config_driven() {
            self.thresholds
                .rule_confidence
                .get(rule_id)
                .copied()
                .unwrap_or(compiled)
        } else {
            compiled
        }
    }

    /// Effective SLA hours for a rule.
    pub fn rule_sla_hours(&self, rule_id: &str, compiled: u32) -> u32 {
        if self.config_driven() {
            self.sla.rule_hours.get(rule_id).copied().unwrap_or(compiled)
        } else {
            compiled
        }
    }

    /// Validate every numeric threshold against its declared bounds.
    ///
    /// Bounds are part of the engine, not the document: a config file
    /// cannot widen its own limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bounds("thresholds.similarity", self.thresholds.similarity as f64, 0.0, 1.0)?;
        check_bounds("thresholds.accuracy", self.thresholds.accuracy as f64, 0.0, 1.0)?;
        check_bounds(
            "thresholds.fallback_confidence",
            self.thresholds.fallback_confidence as f64,
            0.0,
            0.5,
        )?;
        for (rule_id, confidence) in &self.thresholds.rule_confidence {
            check_bounds(
                &format!("thresholds.rule_confidence.{rule_id}"),
                *confidence as f64,
                0.5,
                1.0,
            )?;
        }

        check_bounds("sla.default_hours", self.sla.default_hours as f64, 1.0, 168.0)?;
        for (rule_id, hours) in &self.sla.rule_hours {
            check_bounds(&format!("sla.rule_hours.{rule_id}"), *hours as f64, 1.0, 168.0)?;
        }

        check_bounds("llm.timeout_secs", self.llm.timeout_secs as f64, 1.0, 120.0)?;
        check_bounds("llm.max_retries", self.llm.max_retries as f64, 0.0, 5.0)?;
        check_bounds("llm.backoff_ms", self.llm.backoff_ms as f64, 10.0, 10_000.0)?;
        check_bounds("llm.top_k", self.llm.top_k as f64, 1.0, 20.0)?;

        if self.routing.default_department.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "routing.default_department must not be empty".into(),
            ));
        }

        Ok(())
    }
}

fn check_bounds(key: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfBounds {
            key: key.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_valid() {
        let snapshot = ConfigSnapshot::default();
        assert!(snapshot.validate().is_ok());
        assert!(!snapshot.config_driven());
        assert_eq!(snapshot.thresholds.similarity, 0.88);
        assert_eq!(snapshot.sla.default_hours, 24);
    }

    #[test]
    fn snapshot_roundtrips_toml() {
        let snapshot = ConfigSnapshot::default();
        let toml_str = toml::to_string_pretty(&snapshot).unwrap();
        let parsed: ConfigSnapshot = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.thresholds.similarity, snapshot.thresholds.similarity);
        assert_eq!(parsed.llm.model, snapshot.llm.model);
    }

    #[test]
    fn out_of_bounds_rule_confidence_rejected() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot
            .thresholds
            .rule_confidence
            .insert("R001".into(), 0.45);

        match snapshot.validate() {
            Err(ConfigError::OutOfBounds { key, min, .. }) => {
                assert_eq!(key, "thresholds.rule_confidence.R001");
                assert_eq!(min, 0.5);
            }
            other => panic!("Expected OutOfBounds, got: {other:?}"),
        }
    }

    #[test]
    fn out_of_bounds_sla_rejected() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.sla.rule_hours.insert("R002".into(), 500);
        assert!(matches!(
            snapshot.validate(),
            Err(ConfigError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn flag_off_ignores_overrides() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot
            .thresholds
            .rule_confidence
            .insert("R001".into(), 0.90);
        assert_eq!(snapshot.rule_confidence("R001", 0.75), 0.75);

        snapshot.feature_flags.use_config_driven_thresholds = true;
        assert_eq!(snapshot.rule_confidence("R001", 0.75), 0.90);
        // No override configured for this rule: compiled value wins.
        assert_eq!(snapshot.rule_confidence("R999", 0.75), 0.75);
    }

    #[test]
    fn unknown_section_key_rejected() {
        let result: Result<ConfigSnapshot, _> =
            toml::from_str("[thresholds]\nsimilariti = 0.9\n");
        assert!(result.is_err());
    }
}
