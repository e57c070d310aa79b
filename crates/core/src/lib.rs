//! # TicketWise Core
//!
//! Domain types, traits, and error definitions for the TicketWise routing
//! decision engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (the similarity index, the LLM provider) is
//! defined as a trait here. Implementations live in their respective crates.
//! This enables:
//! - Swapping backends via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod decision;
pub mod error;
pub mod history;
pub mod index;
pub mod provider;
pub mod ticket;

// Re-export key types at crate root for ergonomics
pub use decision::{DecisionMethod, Evidence, RoutingDecision, Stage, StageLatency};
pub use error::{Error, IndexError, ProviderError, Result, ValidationError};
pub use history::{HistoricalTicketRecord, OutcomeEvent};
pub use index::{IndexMatch, SimilarityIndex};
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, PromptMessage, Role, Usage,
};
pub use ticket::Ticket;
