//! The TicketWise decision orchestrator.
//!
//! Sequences the routing stages into exactly one decision per ticket:
//!
//! ```text
//! START → RULES_EVAL ─ matched ──────────────────────────→ DONE
//!             │ no match
//!             ▼
//!         CACHE_EVAL ─ hit ─────────────────────────────→ DONE
//!             │ miss
//!             ▼
//!          LLM_EVAL ─ success ──────────────────────────→ DONE
//!             │ failure (after the stage's own retry)
//!             ▼
//!          FALLBACK ────────────────────────────────────→ DONE
//! ```
//!
//! The orchestrator is stateless per call: tickets are processed
//! independently and concurrently, and dropping the returned future
//! cancels any in-flight index or LLM call.

pub mod orchestrator;

pub use orchestrator::DecisionOrchestrator;
