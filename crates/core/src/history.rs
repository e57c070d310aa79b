//! Historical ticket outcomes and the ground-truth feedback event.
//!
//! Historical records are the source of both cache candidates and
//! RAG few-shot context. They reference tickets by id only — no
//! back-pointers into live pipeline state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved ticket with its actual outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalTicketRecord {
    /// Id of the original ticket.
    pub id: String,

    /// Embedding of the ticket text at resolution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// The department that actually resolved the ticket.
    pub actual_department: String,

    /// Hours from creation to resolution.
    pub resolution_time_hours: f32,

    /// Customer satisfaction score, 1–5.
    pub satisfaction: u8,

    /// Whether the AI prediction made at routing time turned out correct.
    pub prior_prediction_correct: bool,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// A ground-truth outcome event from the external feedback channel.
///
/// Carries both the predicted and the actual department: the feedback
/// channel performs the prediction/outcome join, so the accuracy tracker
/// stays a pure consumer with a single writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub ticket_id: String,
    pub predicted_department: String,
    pub actual_department: String,
    pub resolution_time_hours: f32,
    pub satisfaction: u8,
}

impl OutcomeEvent {
    /// Whether the routing prediction matched the ground truth.
    pub fn was_correct(&self) -> bool {
        self.predicted_department == self.actual_department
    }
}
