//! Accuracy tracking and decision audit logging for TicketWise.
//!
//! Two consumers of routing output live here:
//! - the [`AccuracyTracker`], fed ground-truth outcome events from the
//!   external feedback channel and read by the similarity cache gate;
//! - the [`DecisionLogger`], a best-effort structured audit sink that
//!   must never block or fail a routing decision.

pub mod accuracy;
pub mod audit;

pub use accuracy::{AccuracyRecord, AccuracyTracker};
pub use audit::{DecisionAuditRecord, DecisionLogger, DecisionSink, TracingSink};
