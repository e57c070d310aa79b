//! Error types for the TicketWise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all TicketWise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- LLM provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Similarity index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Raised when a ticket fails input validation. Rejected before the
/// routing pipeline starts; no partial processing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Ticket id is empty")]
    EmptyId,

    #[error("Ticket {ticket_id} has no text")]
    EmptyText { ticket_id: String },

    #[error("Ticket {ticket_id} text exceeds {max_bytes} bytes ({actual_bytes})")]
    TextTooLong {
        ticket_id: String,
        max_bytes: usize,
        actual_bytes: usize,
    },
}

/// Errors from the LLM provider. A malformed response is a provider
/// failure like any other — it feeds the same retry-then-fallback path.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    Parse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Errors from the external similarity index.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Index query failed: {0}")]
    QueryFailed(String),

    #[error("Index query timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Index backend unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn validation_error_displays_ticket_id() {
        let err = Error::Validation(ValidationError::EmptyText {
            ticket_id: "T-100".into(),
        });
        assert!(err.to_string().contains("T-100"));
    }

    #[test]
    fn parse_error_is_a_provider_error() {
        let err: Error = ProviderError::Parse("no JSON object in response".into()).into();
        assert!(matches!(err, Error::Provider(ProviderError::Parse(_))));
    }
}
