//! The LLM classification stage: timeout, bounded retry, strict parse.
//!
//! One timeout per attempt, one retry with exponential backoff after the
//! first failure (both configuration-driven). A response that cannot be
//! parsed into a routing verdict is a provider failure like a timeout —
//! it consumes an attempt and, once attempts are exhausted, the
//! orchestrator falls back.

use crate::prompt::{PromptBuilder, RoutingPrompt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use ticketwise_config::ConfigSnapshot;
use ticketwise_core::{
    CompletionProvider, CompletionRequest, IndexMatch, PromptMessage, ProviderError, Ticket,
};
use tracing::{info, warn};
use uuid::Uuid;

const MAX_COMPLETION_TOKENS: u32 = 512;

/// A successful LLM routing verdict.
#[derive(Debug, Clone)]
pub struct LlmRoute {
    pub department: String,
    pub confidence: f32,
    pub rationale: String,
    /// Audit ids for the prompt/response pair.
    pub prompt_id: String,
    pub response_id: String,
}

/// What the model is asked to emit.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    department: String,
    confidence: f32,
    #[serde(default)]
    rationale: String,
}

/// Drives the LLM call for tickets nothing else could route.
pub struct LlmStage {
    provider: Arc<dyn CompletionProvider>,
    builder: PromptBuilder,
}

impl LlmStage {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            builder: PromptBuilder,
        }
    }

    /// Classify a ticket with few-shot context.
    ///
    /// Returns `Err` only after every attempt (1 + max_retries) has
    /// failed; the caller owns the fallback decision.
    pub async fn classify(
        &self,
        ticket: &Ticket,
        examples: &[IndexMatch],
        config: &ConfigSnapshot,
    ) -> Result<LlmRoute, ProviderError> {
        let prompt = self.builder.build(
            ticket,
            examples,
            &config.routing.departments,
            config.llm.top_k,
        );

        let request = CompletionRequest {
            model: config.llm.model.clone(),
            messages: vec![
                PromptMessage::system(&prompt.system),
                PromptMessage::user(&prompt.user),
            ],
            temperature: 0.0,
            max_tokens: Some(MAX_COMPLETION_TOKENS),
        };

        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let attempts = config.llm.max_retries + 1;
        let mut last_error = ProviderError::NotConfigured("no attempt made".into());

        for attempt in 0..attempts {
            if attempt > 0 {
                let backoff = Duration::from_millis(
                    config.llm.backoff_ms.saturating_mul(1u64 << (attempt - 1)),
                );
                warn!(
                    ticket = %ticket.id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "LLM attempt failed; backing off before retry"
                );
                tokio::time::sleep(backoff).await;
            }

            let outcome =
                match tokio::time::timeout(timeout, self.provider.complete(request.clone())).await
                {
                    Ok(Ok(response)) => self.parse(&prompt, &response.content, config),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        self.provider.name(),
                        timeout.as_secs()
                    ))),
                };

            match outcome {
                Ok(route) => {
                    info!(
                        ticket = %ticket.id,
                        department = %route.department,
                        confidence = route.confidence,
                        attempt = attempt + 1,
                        "LLM classified ticket"
                    );
                    return Ok(route);
                }
                Err(e) => {
                    warn!(ticket = %ticket.id, error = %e, attempt = attempt + 1, "LLM attempt failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Parse the model output into a verdict.
    fn parse(
        &self,
        prompt: &RoutingPrompt,
        content: &str,
        config: &ConfigSnapshot,
    ) -> Result<LlmRoute, ProviderError> {
        let json = extract_json_object(content)
            .ok_or_else(|| ProviderError::Parse("no JSON object in response".into()))?;

        let raw: RawVerdict = serde_json::from_str(json)
            .map_err(|e| ProviderError::Parse(format!("verdict does not deserialize: {e}")))?;

        if raw.department.trim().is_empty() {
            return Err(ProviderError::Parse("empty department".into()));
        }
        if !config.routing.departments.is_empty()
            && !config.routing.departments.contains(&raw.department)
        {
            return Err(ProviderError::Parse(format!(
                "unknown department '{}'",
                raw.department
            )));
        }

        Ok(LlmRoute {
            department: raw.department,
            confidence: raw.confidence.clamp(0.0, 1.0),
            rationale: raw.rationale,
            prompt_id: prompt.prompt_id.clone(),
            response_id: Uuid::new_v4().to_string(),
        })
    }
}

/// Find the JSON object in possibly chatty model output: strips markdown
/// fences and takes the outermost `{...}` span.
fn extract_json_object(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}
