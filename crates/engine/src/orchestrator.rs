//! Stage sequencing, latency capture, and terminal decision synthesis.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use ticketwise_config::ConfigManager;
use ticketwise_core::{
    DecisionMethod, Error, Evidence, RoutingDecision, Stage, StageLatency, Ticket,
};
use ticketwise_rag::LlmStage;
use ticketwise_rules::RulesEngine;
use ticketwise_similarity::{CacheOutcome, SimilarityRouter};
use ticketwise_telemetry::DecisionLogger;
use tracing::{info, warn};

/// Fallback confidence used when config-driven thresholds are off.
const DEFAULT_FALLBACK_CONFIDENCE: f32 = 0.30;

/// Sequences rules → cache → LLM → fallback for each ticket.
///
/// Shared across the worker pool behind an `Arc`; all mutable state
/// lives in the injected collaborators, each with its own discipline.
pub struct DecisionOrchestrator {
    rules: Arc<RulesEngine>,
    cache: Arc<SimilarityRouter>,
    llm: Arc<LlmStage>,
    config: Arc<ConfigManager>,
    logger: Arc<DecisionLogger>,
}

impl DecisionOrchestrator {
    pub fn new(
        rules: Arc<RulesEngine>,
        cache: Arc<SimilarityRouter>,
        llm: Arc<LlmStage>,
        config: Arc<ConfigManager>,
        logger: Arc<DecisionLogger>,
    ) -> Self {
        Self {
            rules,
            cache,
            llm,
            config,
            logger,
        }
    }

    /// Route one ticket to a department.
    ///
    /// The only `Err` this returns is input validation — a malformed
    /// ticket never enters the pipeline. Every stage-level failure is
    /// absorbed into a terminal decision instead.
    pub async fn route(&self, ticket: &Ticket) -> Result<RoutingDecision, Error> {
        ticket.validate()?;

        let config = self.config.snapshot();
        let mut latencies: Vec<StageLatency> = Vec::with_capacity(4);

        // ── RULES_EVAL ──
        let started = Instant::now();
        let rule_match = self.rules.evaluate(ticket, &config);
        latencies.push(StageLatency {
            stage: Stage::Rules,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        if let Some(matched) = rule_match {
            let decision = RoutingDecision::new(
                &ticket.id,
                matched.department,
                matched.confidence,
                DecisionMethod::Rule,
                Evidence::RuleMatch {
                    rule_id: matched.rule_id,
                },
            )
            .with_latencies(latencies);
            return Ok(self.finish(decision));
        }

        // ── CACHE_EVAL ──
        let started = Instant::now();
        let (outcome, candidates) = match self.cache.check(ticket, &config).await {
            Ok(evaluation) => (evaluation.outcome, evaluation.candidates),
            Err(e) => {
                // A broken index costs us the cache stage, not the ticket.
                warn!(ticket = %ticket.id, error = %e, "Cache stage degraded to miss");
                (
                    CacheOutcome::Miss {
                        reason: ticketwise_similarity::MissReason::NoCandidates,
                    },
                    Vec::new(),
                )
            }
        };
        latencies.push(StageLatency {
            stage: Stage::Cache,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        if let CacheOutcome::Hit {
            record_id,
            department,
            similarity,
        } = outcome
        {
            let decision = RoutingDecision::new(
                &ticket.id,
                department,
                similarity,
                DecisionMethod::Cache,
                Evidence::CacheHit {
                    record_id,
                    similarity,
                },
            )
            .with_latencies(latencies);
            return Ok(self.finish(decision));
        }

        // ── LLM_EVAL ──
        let started = Instant::now();
        let llm_result = self.llm.classify(ticket, &candidates, &config).await;
        latencies.push(StageLatency {
            stage: Stage::Llm,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        let decision = match llm_result {
            Ok(route) => RoutingDecision::new(
                &ticket.id,
                route.department,
                route.confidence,
                DecisionMethod::Llm,
                Evidence::LlmCompletion {
                    prompt_id: route.prompt_id,
                    response_id: route.response_id,
                },
            )
            .with_latencies(latencies),

            // ── FALLBACK ──
            Err(e) => {
                let started = Instant::now();
                let confidence = if config.config_driven() {
                    config.thresholds.fallback_confidence
                } else {
                    DEFAULT_FALLBACK_CONFIDENCE
                };
                let decision = RoutingDecision::new(
                    &ticket.id,
                    &config.routing.default_department,
                    confidence,
                    DecisionMethod::Fallback,
                    Evidence::Fallback {
                        reason: e.to_string(),
                    },
                )
                .with_human_review();
                let mut latencies = latencies;
                latencies.push(StageLatency {
                    stage: Stage::Fallback,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
                decision.with_latencies(latencies)
            }
        };

        Ok(self.finish(decision))
    }

    /// Route a batch with bounded concurrency, preserving input order.
    ///
    /// Tickets are independent: one validation failure does not disturb
    /// its neighbors. Dropping the future cancels in-flight work.
    pub async fn route_batch(
        &self,
        tickets: &[Ticket],
        concurrency: usize,
    ) -> Vec<Result<RoutingDecision, Error>> {
        futures::stream::iter(tickets.iter().map(|ticket| self.route(ticket)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// The single exit: audit, then hand the decision to the caller.
    fn finish(&self, decision: RoutingDecision) -> RoutingDecision {
        info!(
            ticket = %decision.ticket_id,
            department = %decision.department,
            method = %decision.method,
            confidence = decision.confidence,
            total_ms = decision.total_elapsed_ms(),
            "Ticket routed"
        );
        self.logger.log(&decision);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ticketwise_core::{
        CompletionProvider, CompletionRequest, CompletionResponse, HistoricalTicketRecord,
        IndexError, IndexMatch, ProviderError, SimilarityIndex,
    };
    use ticketwise_rules::RuleSet;
    use ticketwise_similarity::InMemoryIndex;
    use ticketwise_telemetry::AccuracyTracker;

    struct CountingIndex {
        inner: InMemoryIndex,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SimilarityIndex for CountingIndex {
        fn name(&self) -> &str {
            "counting"
        }
        async fn search(
            &self,
            ticket: &Ticket,
            top_k: usize,
        ) -> Result<Vec<IndexMatch>, IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search(ticket, top_k).await
        }
    }

    struct StaticProvider {
        body: String,
    }

    impl StaticProvider {
        fn new(body: &str) -> Self {
            Self { body: body.into() }
        }
    }

    #[async_trait]
    impl CompletionProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: self.body.clone(),
                model: "mock".into(),
                usage: None,
            })
        }
    }

    fn rules() -> RulesEngine {
        RulesEngine::new(
            RuleSet::from_toml(
                r#"
[[rules]]
id = "R001"
priority = 10
keywords = ["dispute", "chargeback"]
confidence = 0.98
department = "credit_management"
sla_hours = 4
"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn record(id: &str, department: &str) -> HistoricalTicketRecord {
        HistoricalTicketRecord {
            id: id.into(),
            embedding: Some(vec![1.0, 0.0]),
            actual_department: department.into(),
            resolution_time_hours: 2.0,
            satisfaction: 4,
            prior_prediction_correct: true,
            created_at: chrono::Utc::now(),
        }
    }

    fn orchestrator(
        index: Arc<dyn SimilarityIndex>,
        tracker: Arc<AccuracyTracker>,
        provider_body: &str,
    ) -> (DecisionOrchestrator, Arc<DecisionLogger>) {
        let logger = Arc::new(DecisionLogger::new());
        let orchestrator = DecisionOrchestrator::new(
            Arc::new(rules()),
            Arc::new(SimilarityRouter::new(index, tracker)),
            Arc::new(LlmStage::new(Arc::new(StaticProvider::new(provider_body)))),
            Arc::new(ConfigManager::with_defaults()),
            logger.clone(),
        );
        (orchestrator, logger)
    }

    #[tokio::test]
    async fn rule_match_skips_cache_and_llm() {
        let index = Arc::new(CountingIndex {
            inner: InMemoryIndex::new(vec![record("H-1", "billing")]),
            calls: AtomicUsize::new(0),
        });
        let (orchestrator, logger) = orchestrator(
            index.clone(),
            Arc::new(AccuracyTracker::new()),
            r#"{"department": "billing", "confidence": 0.7}"#,
        );

        let decision = orchestrator
            .route(&Ticket::new("T-1", "I dispute this charge"))
            .await
            .unwrap();

        assert_eq!(decision.method, DecisionMethod::Rule);
        assert_eq!(decision.department, "credit_management");
        // The cache stage never ran.
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        assert_eq!(decision.stage_latencies.len(), 1);
        assert_eq!(decision.stage_latencies[0].stage, Stage::Rules);
        assert_eq!(logger.count(), 1);
    }

    #[tokio::test]
    async fn validation_failure_never_enters_pipeline() {
        let index = Arc::new(CountingIndex {
            inner: InMemoryIndex::new(vec![]),
            calls: AtomicUsize::new(0),
        });
        let (orchestrator, logger) = orchestrator(
            index.clone(),
            Arc::new(AccuracyTracker::new()),
            r#"{"department": "billing", "confidence": 0.7}"#,
        );

        let err = orchestrator.route(&Ticket::new("", "text")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        assert_eq!(logger.count(), 0);
    }

    #[tokio::test]
    async fn index_error_degrades_to_llm() {
        struct BrokenIndex;
        #[async_trait]
        impl SimilarityIndex for BrokenIndex {
            fn name(&self) -> &str {
                "broken"
            }
            async fn search(
                &self,
                _ticket: &Ticket,
                _top_k: usize,
            ) -> Result<Vec<IndexMatch>, IndexError> {
                Err(IndexError::Unavailable("connection refused".into()))
            }
        }

        let (orchestrator, _) = orchestrator(
            Arc::new(BrokenIndex),
            Arc::new(AccuracyTracker::new()),
            r#"{"department": "billing", "confidence": 0.7}"#,
        );

        let decision = orchestrator
            .route(&Ticket::new("T-2", "something unusual"))
            .await
            .unwrap();
        // Index failure is contained; the LLM still answers.
        assert_eq!(decision.method, DecisionMethod::Llm);
        assert_eq!(decision.department, "billing");
    }

    #[tokio::test]
    async fn batch_preserves_order_and_independence() {
        let (orchestrator, logger) = orchestrator(
            Arc::new(InMemoryIndex::new(vec![])),
            Arc::new(AccuracyTracker::new()),
            r#"{"department": "billing", "confidence": 0.7}"#,
        );

        let tickets = vec![
            Ticket::new("T-1", "I dispute this charge"),
            Ticket::new("", "invalid"),
            Ticket::new("T-3", "other topic"),
        ];
        let results = orchestrator.route_batch(&tickets, 8).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().ticket_id, "T-1");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().ticket_id, "T-3");
        // Two decisions audited, the invalid ticket none.
        assert_eq!(logger.count(), 2);
    }
}
