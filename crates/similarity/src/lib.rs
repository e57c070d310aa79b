//! Similarity cache routing for TicketWise.
//!
//! If a new ticket is close enough to a historical one, and the
//! department that historical ticket landed in has been predicted
//! accurately enough, the historical outcome is reused directly —
//! skipping the LLM entirely. Both gates are configuration-driven.

pub mod memory_index;
pub mod router;

pub use memory_index::{cosine_similarity, InMemoryIndex};
pub use router::{CacheEvaluation, CacheOutcome, MissReason, SimilarityRouter};
