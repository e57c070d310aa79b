//! SimilarityIndex trait — the abstraction over the external vector index.
//!
//! The engine only ever asks the index one question: "which historical
//! records are closest to this ticket?". Storage internals, sharding and
//! embedding generation are the backend's problem.

use crate::error::IndexError;
use crate::history::HistoricalTicketRecord;
use crate::ticket::Ticket;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One candidate returned by a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Id of the matched historical record.
    pub record_id: String,

    /// Cosine similarity in [0, 1] (backends clamp negatives to 0).
    pub similarity: f32,

    /// The matched record, resolved by the backend.
    pub record: HistoricalTicketRecord,
}

/// The external similarity index contract.
///
/// Implementations must be safe for concurrent queries and must bound
/// their own I/O; callers additionally wrap queries in a timeout.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// A human-readable backend name (for logs).
    fn name(&self) -> &str;

    /// Return up to `top_k` closest records, ordered by similarity
    /// descending. An empty result is a valid answer, not an error.
    async fn search(&self, ticket: &Ticket, top_k: usize)
        -> Result<Vec<IndexMatch>, IndexError>;
}
