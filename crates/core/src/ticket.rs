//! The Ticket input type and its fail-fast validation.
//!
//! A ticket is validated once, before the routing pipeline starts. A
//! malformed ticket is rejected immediately — no stage ever sees it.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum accepted ticket text size in bytes.
pub const MAX_TICKET_TEXT: usize = 32 * 1024;

/// An incoming support ticket.
///
/// The embedding is an opaque handle produced by the (external) embedding
/// generator; the engine never computes embeddings itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket identifier from the source ticketing system.
    pub id: String,

    /// The customer-facing ticket text (subject + body).
    pub text: String,

    /// Source-system metadata (channel, customer tier, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Pre-computed text embedding, if the caller has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Ticket {
    /// Create a ticket with just an id and text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
            embedding: None,
        }
    }

    /// Attach an embedding handle.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Validate the ticket before it enters the pipeline.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText {
                ticket_id: self.id.clone(),
            });
        }
        if self.text.len() > MAX_TICKET_TEXT {
            return Err(ValidationError::TextTooLong {
                ticket_id: self.id.clone(),
                max_bytes: MAX_TICKET_TEXT,
                actual_bytes: self.text.len(),
            });
        }
        Ok(())
    }
}
