//! The RoutingDecision record and its provenance types.
//!
//! A decision is append-only: once the orchestrator emits it, nothing
//! mutates it. Exactly one decision per ticket, exactly one method.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the department was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMethod {
    /// A deterministic rule matched.
    Rule,
    /// A similar historical outcome was reused.
    Cache,
    /// The LLM classified the ticket.
    Llm,
    /// Every other stage failed; default department, human review required.
    Fallback,
}

impl std::fmt::Display for DecisionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DecisionMethod::Rule => "rule",
            DecisionMethod::Cache => "cache",
            DecisionMethod::Llm => "llm",
            DecisionMethod::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// Provenance for a decision — exactly one variant per method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    /// Which rule fired.
    RuleMatch { rule_id: String },
    /// Which historical record was reused, and how close it was.
    CacheHit { record_id: String, similarity: f32 },
    /// The prompt/response pair behind an LLM decision.
    LlmCompletion {
        prompt_id: String,
        response_id: String,
    },
    /// Why the pipeline fell through to the default department.
    Fallback { reason: String },
}

/// A pipeline stage, as recorded in latency entries and audit lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Rules,
    Cache,
    Llm,
    Fallback,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Rules => "rules",
            Stage::Cache => "cache",
            Stage::Llm => "llm",
            Stage::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// Elapsed wall-clock time for one stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageLatency {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

/// The terminal output of the routing pipeline for one ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Unique id for this decision record.
    pub decision_id: String,

    /// The ticket this decision routes.
    pub ticket_id: String,

    /// Target department/queue.
    pub department: String,

    /// Confidence in [0, 1].
    pub confidence: f32,

    /// Which stage produced the decision.
    pub method: DecisionMethod,

    /// Provenance matching the method.
    pub evidence: Evidence,

    /// Whether a human must review before the ticket is worked.
    #[serde(default)]
    pub needs_human_review: bool,

    /// Per-stage elapsed times, in pipeline order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stage_latencies: Vec<StageLatency>,

    /// When the decision was rendered.
    pub timestamp: DateTime<Utc>,
}

impl RoutingDecision {
    /// Build a decision, clamping confidence into [0, 1] and stamping
    /// a fresh decision id and timestamp.
    pub fn new(
        ticket_id: impl Into<String>,
        department: impl Into<String>,
        confidence: f32,
        method: DecisionMethod,
        evidence: Evidence,
    ) -> Self {
        Self {
            decision_id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.into(),
            department: department.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method,
            evidence,
            needs_human_review: false,
            stage_latencies: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Mark the decision for mandatory human review.
    pub fn with_human_review(mut self) -> Self {
        self.needs_human_review = true;
        self
    }

    /// Attach the recorded stage latencies.
    pub fn with_latencies(mut self, latencies: Vec<StageLatency>) -> Self {
        self.stage_latencies = latencies;
        self
    }

    /// Total elapsed time across all recorded stages.
    pub fn total_elapsed_ms(&self) -> u64 {
        self.stage_latencies.iter().map(|l| l.elapsed_ms).sum()
    }
}
