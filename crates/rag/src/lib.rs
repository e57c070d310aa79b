//! Retrieval-augmented LLM classification for TicketWise.
//!
//! When neither a rule nor the similarity cache can route a ticket, the
//! engine builds a few-shot prompt from similar historical tickets'
//! *actual* outcomes and asks an LLM for a department. The stage owns
//! its own timeout and bounded retry; anything that survives both is a
//! provider failure the orchestrator turns into a fallback decision.

pub mod http;
pub mod prompt;
pub mod stage;

pub use http::ChatCompletionsClient;
pub use prompt::{PromptBuilder, RoutingPrompt};
pub use stage::{LlmRoute, LlmStage};
