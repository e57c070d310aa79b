//! An in-process similarity index over loaded historical records.
//!
//! Backs tests, demos, and small single-node deployments. Production
//! traffic points the `SimilarityIndex` trait at a real vector store.

use async_trait::async_trait;
use std::path::Path;
use ticketwise_core::{HistoricalTicketRecord, IndexError, IndexMatch, SimilarityIndex, Ticket};
use tracing::debug;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]; 0.0 for mismatched lengths, empty, or
/// near-zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine-similarity index over an in-memory record list.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: Vec<HistoricalTicketRecord>,
}

impl InMemoryIndex {
    pub fn new(records: Vec<HistoricalTicketRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON array file (demo/bootstrap data).
    pub fn from_json_path(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| IndexError::Unavailable(format!("{}: {e}", path.display())))?;
        let records: Vec<HistoricalTicketRecord> = serde_json::from_str(&content)
            .map_err(|e| IndexError::QueryFailed(format!("{}: {e}", path.display())))?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn search(
        &self,
        ticket: &Ticket,
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        let Some(query) = ticket.embedding.as_deref() else {
            debug!(ticket = %ticket.id, "Ticket has no embedding; no candidates");
            return Ok(Vec::new());
        };

        let mut matches: Vec<IndexMatch> = self
            .records
            .iter()
            .filter_map(|record| {
                let embedding = record.embedding.as_deref()?;
                // Negative similarity is never a cache candidate.
                let similarity = cosine_similarity(query, embedding).max(0.0);
                Some(IndexMatch {
                    record_id: record.id.clone(),
                    similarity,
                    record: record.clone(),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
