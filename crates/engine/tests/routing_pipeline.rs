//! End-to-end pipeline scenarios: every stage of the decision ladder,
//! exercised through the public orchestrator API with mock backends.

use async_trait::async_trait;
use std::sync::Arc;
use ticketwise_config::{ConfigManager, ConfigSnapshot, LayeredPaths};
use ticketwise_core::{
    CompletionProvider, CompletionRequest, CompletionResponse, DecisionMethod, Evidence,
    HistoricalTicketRecord, ProviderError, RoutingDecision, Ticket,
};
use ticketwise_engine::DecisionOrchestrator;
use ticketwise_rag::LlmStage;
use ticketwise_rules::{RuleSet, RulesEngine};
use ticketwise_similarity::{InMemoryIndex, SimilarityRouter};
use ticketwise_telemetry::{AccuracyTracker, DecisionLogger};

const RULES: &str = r#"
[[rules]]
id = "R001"
priority = 10
keywords = ["dispute", "chargeback"]
confidence = 0.98
department = "credit_management"
sla_hours = 4
"#;

/// Embedding pairs chosen so cosine([1,0], [0.9, 0.4359]) = 0.90.
const QUERY_EMBEDDING: [f32; 2] = [1.0, 0.0];
const NEAR_EMBEDDING: [f32; 2] = [0.9, 0.435_889_9];

struct StaticProvider(String);

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
            content: self.0.clone(),
            model: "mock".into(),
            usage: None,
        })
    }
}

struct HangingProvider;

#[async_trait]
impl CompletionProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        unreachable!()
    }
}

fn history_record(department: &str) -> HistoricalTicketRecord {
    HistoricalTicketRecord {
        id: "H-100".into(),
        embedding: Some(NEAR_EMBEDDING.to_vec()),
        actual_department: department.into(),
        resolution_time_hours: 6.0,
        satisfaction: 4,
        prior_prediction_correct: true,
        created_at: chrono::Utc::now(),
    }
}

fn gated_snapshot() -> ConfigSnapshot {
    let mut snapshot = ConfigSnapshot::default();
    snapshot.feature_flags.use_config_driven_thresholds = true;
    snapshot.thresholds.similarity = 0.85;
    snapshot.thresholds.accuracy = 0.80;
    snapshot.llm.timeout_secs = 1;
    snapshot.llm.backoff_ms = 10;
    snapshot
}

fn build(
    records: Vec<HistoricalTicketRecord>,
    tracker: Arc<AccuracyTracker>,
    provider: Arc<dyn CompletionProvider>,
    config: Arc<ConfigManager>,
) -> (DecisionOrchestrator, Arc<DecisionLogger>) {
    let logger = Arc::new(DecisionLogger::new());
    let orchestrator = DecisionOrchestrator::new(
        Arc::new(RulesEngine::new(RuleSet::from_toml(RULES).unwrap()).unwrap()),
        Arc::new(SimilarityRouter::new(
            Arc::new(InMemoryIndex::new(records)),
            tracker,
        )),
        Arc::new(LlmStage::new(provider)),
        config,
        logger.clone(),
    );
    (orchestrator, logger)
}

// Scenario 1: a dispute ticket is routed by rule R001.
#[tokio::test]
async fn scenario_rule_match() {
    let (orchestrator, logger) = build(
        vec![],
        Arc::new(AccuracyTracker::new()),
        Arc::new(StaticProvider("never called".into())),
        Arc::new(ConfigManager::with_defaults()),
    );

    let decision = orchestrator
        .route(&Ticket::new("T-1", "I dispute this charge"))
        .await
        .unwrap();

    assert_eq!(decision.department, "credit_management");
    assert_eq!(decision.confidence, 0.98);
    assert_eq!(decision.method, DecisionMethod::Rule);
    assert_eq!(
        decision.evidence,
        Evidence::RuleMatch {
            rule_id: "R001".into()
        }
    );
    assert_eq!(logger.count(), 1);
}

// Scenario 2: no rule match, similarity 0.90 and accuracy 0.87 beat the
// 0.85/0.80 gates — the historical outcome is reused.
#[tokio::test]
async fn scenario_cache_hit() {
    let tracker = Arc::new(AccuracyTracker::new());
    tracker.seed("technical_support_l2", 100, 87);

    let (orchestrator, _) = build(
        vec![history_record("technical_support_l2")],
        tracker,
        Arc::new(StaticProvider("never called".into())),
        Arc::new(ConfigManager::with_snapshot(gated_snapshot())),
    );

    let ticket =
        Ticket::new("T-2", "the vpn client disconnects hourly").with_embedding(QUERY_EMBEDDING.to_vec());
    let decision = orchestrator.route(&ticket).await.unwrap();

    assert_eq!(decision.method, DecisionMethod::Cache);
    assert_eq!(decision.department, "technical_support_l2");
    // Similarity is the confidence proxy.
    assert!((decision.confidence - 0.90).abs() < 0.01);
    assert!(matches!(
        decision.evidence,
        Evidence::CacheHit { ref record_id, .. } if record_id == "H-100"
    ));
}

// Scenario 3: identical similarity, but the department's accuracy is
// 0.60 — the cache gate refuses and the LLM answers instead.
#[tokio::test]
async fn scenario_low_accuracy_falls_to_llm() {
    let tracker = Arc::new(AccuracyTracker::new());
    tracker.seed("technical_support_l2", 100, 60);

    let (orchestrator, _) = build(
        vec![history_record("technical_support_l2")],
        tracker,
        Arc::new(StaticProvider(
            r#"{"department": "technical_support_l1", "confidence": 0.72, "rationale": "connectivity triage"}"#.into(),
        )),
        Arc::new(ConfigManager::with_snapshot(gated_snapshot())),
    );

    let ticket =
        Ticket::new("T-3", "the vpn client disconnects hourly").with_embedding(QUERY_EMBEDDING.to_vec());
    let decision = orchestrator.route(&ticket).await.unwrap();

    assert_eq!(decision.method, DecisionMethod::Llm);
    assert_eq!(decision.department, "technical_support_l1");
    assert_eq!(decision.confidence, 0.72);
    assert!(matches!(decision.evidence, Evidence::LlmCompletion { .. }));
}

// Scenario 4: the provider times out on the attempt and its retry; the
// ticket still gets exactly one decision — the fallback.
#[tokio::test]
async fn scenario_llm_timeout_falls_back() {
    let (orchestrator, logger) = build(
        vec![],
        Arc::new(AccuracyTracker::new()),
        Arc::new(HangingProvider),
        Arc::new(ConfigManager::with_snapshot(gated_snapshot())),
    );

    tokio::time::pause();
    let decision = orchestrator
        .route(&Ticket::new("T-4", "nothing matches this"))
        .await
        .unwrap();

    assert_eq!(decision.method, DecisionMethod::Fallback);
    assert_eq!(decision.department, "general_support");
    assert!(decision.confidence <= 0.5);
    assert!(decision.needs_human_review);
    assert!(matches!(decision.evidence, Evidence::Fallback { .. }));
    assert_eq!(logger.count(), 1);
}

// Scenario 5: a config document carrying an out-of-bounds confidence is
// rejected wholesale; routing keeps working on compiled-in values.
#[tokio::test]
async fn scenario_invalid_config_keeps_legacy_mode() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("base.toml"),
        r#"
[thresholds.rule_confidence]
R001 = 0.45

[feature_flags]
use_config_driven_thresholds = true
"#,
    )
    .unwrap();

    // Permissive startup: the bad document is refused and the manager
    // boots in legacy mode instead of crashing.
    let manager = Arc::new(ConfigManager::load(LayeredPaths::from_dir(
        dir.path(),
        None,
        None,
    )));
    assert!(!manager.snapshot().config_driven());

    let (orchestrator, _) = build(
        vec![],
        Arc::new(AccuracyTracker::new()),
        Arc::new(StaticProvider("never called".into())),
        manager,
    );

    let decision = orchestrator
        .route(&Ticket::new("T-5", "chargeback on my card"))
        .await
        .unwrap();

    // Compiled-in rule confidence, not the rejected 0.45.
    assert_eq!(decision.method, DecisionMethod::Rule);
    assert_eq!(decision.confidence, 0.98);
}

// A logged decision round-trips through JSON intact.
#[tokio::test]
async fn decision_roundtrips_through_audit_serialization() {
    let (orchestrator, _) = build(
        vec![],
        Arc::new(AccuracyTracker::new()),
        Arc::new(StaticProvider("never called".into())),
        Arc::new(ConfigManager::with_defaults()),
    );

    let decision = orchestrator
        .route(&Ticket::new("T-6", "chargeback please"))
        .await
        .unwrap();

    let json = serde_json::to_string(&decision).unwrap();
    let parsed: RoutingDecision = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.ticket_id, decision.ticket_id);
    assert_eq!(parsed.department, decision.department);
    assert_eq!(parsed.confidence, decision.confidence);
    assert_eq!(parsed.method, decision.method);
}
