//! The similarity router — the cache stage of the pipeline.
//!
//! Queries the similarity index for the closest historical tickets and
//! reuses the best candidate's actual outcome when two gates pass:
//! the match is similar enough, and the candidate department's tracked
//! prediction accuracy is high enough.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use ticketwise_config::ConfigSnapshot;
use ticketwise_core::{IndexError, IndexMatch, SimilarityIndex, Ticket};
use ticketwise_telemetry::AccuracyTracker;
use tracing::{debug, info};

/// Compiled-in gate defaults, used when config-driven thresholds are off.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.88;
pub const DEFAULT_ACCURACY_THRESHOLD: f32 = 0.82;

const DEFAULT_TOP_K: usize = 5;
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the cache stage declined to answer.
#[derive(Debug, Clone, PartialEq)]
pub enum MissReason {
    /// The index returned nothing usable.
    NoCandidates,
    /// The best candidate was not similar enough.
    BelowSimilarity { best: f32, threshold: f32 },
    /// The candidate department's accuracy is too low to trust reuse.
    BelowAccuracy {
        department: String,
        rate: f32,
        threshold: f32,
    },
}

/// The cache stage outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome {
    /// Reuse the historical record's actual department; similarity is
    /// the confidence proxy.
    Hit {
        record_id: String,
        department: String,
        similarity: f32,
    },
    Miss { reason: MissReason },
}

/// Outcome plus the ranked candidates behind it.
///
/// On a miss the candidates become the few-shot examples of the LLM
/// stage, saving a second index round-trip.
#[derive(Debug, Clone)]
pub struct CacheEvaluation {
    pub outcome: CacheOutcome,
    pub candidates: Vec<IndexMatch>,
}

/// Gates cache reuse on similarity and historical accuracy.
pub struct SimilarityRouter {
    index: Arc<dyn SimilarityIndex>,
    accuracy: Arc<AccuracyTracker>,
    top_k: usize,
    query_timeout: Duration,
}

impl SimilarityRouter {
    pub fn new(index: Arc<dyn SimilarityIndex>, accuracy: Arc<AccuracyTracker>) -> Self {
        Self {
            index,
            accuracy,
            top_k: DEFAULT_TOP_K,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Evaluate the cache stage for one ticket.
    ///
    /// An `Err` means the index itself failed; the orchestrator treats
    /// that as a miss and moves on.
    pub async fn check(
        &self,
        ticket: &Ticket,
        config: &ConfigSnapshot,
    ) -> Result<CacheEvaluation, IndexError> {
        let (similarity_threshold, accuracy_threshold) = if config.config_driven() {
            (config.thresholds.similarity, config.thresholds.accuracy)
        } else {
            (DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_ACCURACY_THRESHOLD)
        };

        let mut candidates =
            match tokio::time::timeout(self.query_timeout, self.index.search(ticket, self.top_k))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(IndexError::Timeout {
                        timeout_secs: self.query_timeout.as_secs(),
                    });
                }
            };

        self.rank_candidates(&mut candidates);
        let outcome = self.gate(ticket, &candidates, similarity_threshold, accuracy_threshold);
        Ok(CacheEvaluation {
            outcome,
            candidates,
        })
    }

    /// Apply the two cache-hit gates to the best-ranked candidate.
    fn gate(
        &self,
        ticket: &Ticket,
        candidates: &[IndexMatch],
        similarity_threshold: f32,
        accuracy_threshold: f32,
    ) -> CacheOutcome {
        let Some(best) = candidates.first() else {
            debug!(ticket = %ticket.id, index = %self.index.name(), "Cache: no candidates");
            return CacheOutcome::Miss {
                reason: MissReason::NoCandidates,
            };
        };

        if best.similarity < similarity_threshold {
            debug!(
                ticket = %ticket.id,
                best = best.similarity,
                threshold = similarity_threshold,
                "Cache: best candidate below similarity threshold"
            );
            return CacheOutcome::Miss {
                reason: MissReason::BelowSimilarity {
                    best: best.similarity,
                    threshold: similarity_threshold,
                },
            };
        }

        let department = best.record.actual_department.clone();
        let rate = self.accuracy.accuracy_rate(&department);
        if rate < accuracy_threshold {
            debug!(
                ticket = %ticket.id,
                department = %department,
                rate,
                threshold = accuracy_threshold,
                "Cache: candidate department accuracy too low"
            );
            return CacheOutcome::Miss {
                reason: MissReason::BelowAccuracy {
                    department,
                    rate,
                    threshold: accuracy_threshold,
                },
            };
        }

        info!(
            ticket = %ticket.id,
            record = %best.record_id,
            department = %department,
            similarity = best.similarity,
            accuracy = rate,
            "Cache hit"
        );
        CacheOutcome::Hit {
            record_id: best.record_id.clone(),
            department,
            similarity: best.similarity,
        }
    }

    /// Order candidates: similarity descending, then the matched
    /// department's accuracy, then most recent record. The last step is
    /// a documented default — the upstream material leaves the
    /// equal-similarity, equal-accuracy case open.
    fn rank_candidates(&self, candidates: &mut [IndexMatch]) {
        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    let rate_a = self.accuracy.accuracy_rate(&a.record.actual_department);
                    let rate_b = self.accuracy.accuracy_rate(&b.record.actual_department);
                    rate_b.partial_cmp(&rate_a).unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        });
    }
}
