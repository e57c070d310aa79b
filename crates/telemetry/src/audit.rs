//! Structured decision audit logging.
//!
//! One immutable audit record per routing decision. Logging is strictly
//! best-effort: `log()` cannot fail, cannot block on I/O, and isolates
//! sink panics — a broken observability pipeline must never cost a
//! routing decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use ticketwise_core::{DecisionMethod, Evidence, RoutingDecision, StageLatency};

/// A single audit record, derived from a decision at log time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionAuditRecord {
    pub decision_id: String,
    pub ticket_id: String,
    pub department: String,
    pub confidence: f32,
    pub method: DecisionMethod,
    pub evidence: Evidence,
    pub needs_human_review: bool,
    pub stage_latencies: Vec<StageLatency>,
    pub timestamp: DateTime<Utc>,
}

impl From<&RoutingDecision> for DecisionAuditRecord {
    fn from(decision: &RoutingDecision) -> Self {
        Self {
            decision_id: decision.decision_id.clone(),
            ticket_id: decision.ticket_id.clone(),
            department: decision.department.clone(),
            confidence: decision.confidence,
            method: decision.method,
            evidence: decision.evidence.clone(),
            needs_human_review: decision.needs_human_review,
            stage_latencies: decision.stage_latencies.clone(),
            timestamp: decision.timestamp,
        }
    }
}

/// Where audit records are delivered (observability pipelines).
pub trait DecisionSink: Send + Sync {
    fn record(&self, entry: &DecisionAuditRecord);
}

/// Maximum buffered audit records kept in memory.
const MAX_AUDIT_BUFFER: usize = 5_000;

/// Best-effort decision logger with a bounded local buffer.
pub struct DecisionLogger {
    entries: Mutex<Vec<DecisionAuditRecord>>,
    sinks: Vec<Box<dyn DecisionSink>>,
}

impl std::fmt::Debug for DecisionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("DecisionLogger")
            .field("entry_count", &count)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for DecisionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionLogger {
    /// A logger with no sinks (buffer only).
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks: Vec::new(),
        }
    }

    /// A logger delivering to the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn DecisionSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks,
        }
    }

    /// Record a decision. Infallible: buffer overflow drops the oldest
    /// decile, a poisoned buffer lock is recovered, and sink panics are
    /// contained.
    pub fn log(&self, decision: &RoutingDecision) {
        let entry = DecisionAuditRecord::from(decision);

        {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if entries.len() >= MAX_AUDIT_BUFFER {
                entries.drain(..MAX_AUDIT_BUFFER / 10);
            }
            entries.push(entry.clone());
        }

        for sink in &self.sinks {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| sink.record(&entry)));
            if outcome.is_err() {
                tracing::warn!(
                    decision = %entry.decision_id,
                    "Decision sink panicked; record kept in local buffer"
                );
            }
        }
    }

    /// The most recent `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<DecisionAuditRecord> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = entries.len().saturating_sub(n);
        entries[start..].to_vec()
    }

    /// Number of buffered records.
    pub fn count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Delivers audit records as structured `tracing` events.
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn record(&self, entry: &DecisionAuditRecord) {
        tracing::info!(
            decision = %entry.decision_id,
            ticket = %entry.ticket_id,
            department = %entry.department,
            confidence = entry.confidence,
            method = %entry.method,
            evidence = ?entry.evidence,
            needs_human_review = entry.needs_human_review,
            total_ms = entry.stage_latencies.iter().map(|l| l.elapsed_ms).sum::<u64>(),
            "DECISION"
        );
    }
}
