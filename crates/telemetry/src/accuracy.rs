//! Per-department prediction accuracy, driven by ground-truth outcomes.
//!
//! Counters are updated by a single aggregating writer (the ingest task)
//! so concurrent outcome delivery cannot lose updates. Routing stages
//! only ever read; the cache gate is the sole consumer of the rates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use ticketwise_core::OutcomeEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Accuracy counters for one department, as exposed to consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccuracyRecord {
    pub department: String,
    pub total_predictions: u64,
    pub correct_predictions: u64,
    /// correct / total; 0.0 when no predictions have been resolved yet.
    pub accuracy_rate: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    total: u64,
    correct: u64,
}

impl Counters {
    fn rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }
}

/// Tracks `(total, correct)` per department.
///
/// `total` is monotonically non-decreasing; there is no reset short of
/// dropping the tracker.
#[derive(Debug, Default)]
pub struct AccuracyTracker {
    counters: RwLock<HashMap<String, Counters>>,
}

impl AccuracyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed counters from a warehouse export (startup bootstrap).
    pub fn seed(&self, department: impl Into<String>, total: u64, correct: u64) {
        let mut counters = self.counters.write().unwrap();
        let entry = counters.entry(department.into()).or_default();
        entry.total += total;
        entry.correct += correct.min(total);
    }

    /// Apply one ground-truth outcome.
    ///
    /// The counter bumped is the *predicted* department's: accuracy means
    /// "when we route to X, how often is X right".
    pub fn record_outcome(&self, event: &OutcomeEvent) {
        let correct = event.was_correct();
        let mut counters = self.counters.write().unwrap();
        let entry = counters
            .entry(event.predicted_department.clone())
            .or_default();
        entry.total += 1;
        if correct {
            entry.correct += 1;
        }
        debug!(
            ticket = %event.ticket_id,
            department = %event.predicted_department,
            correct,
            total = entry.total,
            "Outcome recorded"
        );
    }

    /// Accuracy rate for a department; 0.0 for unknown or zero-total
    /// departments, which forces the cache gate to miss.
    pub fn accuracy_rate(&self, department: &str) -> f32 {
        self.counters
            .read()
            .unwrap()
            .get(department)
            .map(Counters::rate)
            .unwrap_or(0.0)
    }

    /// The full record for one department, if any outcome has touched it.
    pub fn record(&self, department: &str) -> Option<AccuracyRecord> {
        self.counters
            .read()
            .unwrap()
            .get(department)
            .map(|c| AccuracyRecord {
                department: department.to_string(),
                total_predictions: c.total,
                correct_predictions: c.correct,
                accuracy_rate: c.rate(),
            })
    }

    /// All records, sorted by department, for reporting consumers.
    pub fn snapshot(&self) -> Vec<AccuracyRecord> {
        let counters = self.counters.read().unwrap();
        let mut records: Vec<AccuracyRecord> = counters
            .iter()
            .map(|(department, c)| AccuracyRecord {
                department: department.clone(),
                total_predictions: c.total,
                correct_predictions: c.correct,
                accuracy_rate: c.rate(),
            })
            .collect();
        records.sort_by(|a, b| a.department.cmp(&b.department));
        records
    }

    /// Spawn the single aggregating writer for the outcome feedback
    /// channel. The task ends when the channel closes.
    pub fn spawn_ingest(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<OutcomeEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracker.record_outcome(&event);
            }
            info!("Outcome feedback channel closed; ingest task exiting");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(predicted: &str, actual: &str) -> OutcomeEvent {
        OutcomeEvent {
            ticket_id: "T-1".into(),
            predicted_department: predicted.into(),
            actual_department: actual.into(),
            resolution_time_hours: 3.0,
            satisfaction: 4,
        }
    }

    #[test]
    fn unknown_department_rates_zero() {
        let tracker = AccuracyTracker::new();
        assert_eq!(tracker.accuracy_rate("billing"), 0.0);
        assert!(tracker.record("billing").is_none());
    }

    #[test]
    fn rate_reflects_outcomes() {
        let tracker = AccuracyTracker::new();
        tracker.record_outcome(&outcome("billing", "billing"));
        tracker.record_outcome(&outcome("billing", "billing"));
        tracker.record_outcome(&outcome("billing", "technical_support_l1"));

        let record = tracker.record("billing").unwrap();
        assert_eq!(record.total_predictions, 3);
        assert_eq!(record.correct_predictions, 2);
        assert!((record.accuracy_rate - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn totals_are_monotonic_and_rate_bounded() {
        let tracker = AccuracyTracker::new();
        let mut last_total = 0;
        for i in 0..50 {
            let actual = if i % 3 == 0 { "billing" } else { "other" };
            tracker.record_outcome(&outcome("billing", actual));
            let record = tracker.record("billing").unwrap();
            assert!(record.total_predictions > last_total);
            last_total = record.total_predictions;
            assert!((0.0..=1.0).contains(&record.accuracy_rate));
        }
    }

    #[test]
    fn counters_track_predicted_department() {
        let tracker = AccuracyTracker::new();
        tracker.record_outcome(&outcome("billing", "credit_management"));
        // The misprediction counts against billing, not credit_management.
        assert_eq!(tracker.record("billing").unwrap().total_predictions, 1);
        assert!(tracker.record("credit_management").is_none());
    }

    #[test]
    fn seed_bootstraps_counters() {
        let tracker = AccuracyTracker::new();
        tracker.seed("technical_support_l2", 200, 174);
        assert!((tracker.accuracy_rate("technical_support_l2") - 0.87).abs() < 1e-6);
    }

    #[test]
    fn snapshot_is_sorted() {
        let tracker = AccuracyTracker::new();
        tracker.seed("billing", 10, 9);
        tracker.seed("accounts", 5, 4);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot[0].department, "accounts");
        assert_eq!(snapshot[1].department, "billing");
    }

    #[tokio::test]
    async fn ingest_task_drains_channel() {
        let tracker = Arc::new(AccuracyTracker::new());
        let (tx, rx) = mpsc::channel(16);
        let handle = tracker.spawn_ingest(rx);

        for _ in 0..10 {
            tx.send(outcome("billing", "billing")).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(tracker.record("billing").unwrap().total_predictions, 10);
        assert_eq!(tracker.accuracy_rate("billing"), 1.0);
    }
}
