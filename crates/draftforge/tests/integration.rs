//! End-to-end tests over the full engine: SQLite-backed index,
//! retrieval, and the coordinator pipeline with streaming events.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use draftforge::config::{Config, EmbeddingConfig, GenerationConfig, RetrievalConfig};
use draftforge::coordinator::AgentCoordinator;
use draftforge::engine::{GenerationEngine, TemplateEngine, TemplateId, TemplateVars};
use draftforge::index::EmbeddingIndex;
use draftforge::platforms::PlatformRegistry;
use draftforge::retriever::Retriever;
use draftforge::sqlite_store::SqliteIndex;
use draftforge::{db, migrate, seed};

use draftforge_core::error::EngineError;
use draftforge_core::models::{
    ActivityKind, ContentItem, ContentType, GenerationRequest, Platform,
};
use draftforge_core::store::memory::InMemoryIndex;

fn item(id: &str, text: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: id.replace('-', " "),
        text: text.to_string(),
        content_type: ContentType::BlogPost,
        tags: vec![],
        metadata: Default::default(),
        brand_voice_score: None,
    }
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        prompt: prompt.to_string(),
        content_type: ContentType::BlogPost,
        target_audience: None,
        tone: None,
        max_length: None,
        platform: None,
        use_rag: true,
        include_reasoning: false,
    }
}

fn memory_index() -> Arc<EmbeddingIndex> {
    Arc::new(EmbeddingIndex::new(
        Arc::new(InMemoryIndex::new()),
        EmbeddingConfig::default(),
    ))
}

/// Retrieval thresholds tuned for the hashed embedding stand-in, whose
/// absolute cosine scores run lower than a sentence-transformer's.
fn test_retrieval_config() -> RetrievalConfig {
    RetrievalConfig {
        similarity_threshold: 0.2,
        brand_similarity_threshold: 0.1,
        ..Default::default()
    }
}

fn coordinator_with(
    index: Arc<EmbeddingIndex>,
    engine: Arc<dyn GenerationEngine>,
    retrieval: RetrievalConfig,
) -> Arc<AgentCoordinator> {
    let retriever = Arc::new(Retriever::new(index, retrieval));
    Arc::new(AgentCoordinator::new(
        retriever,
        engine,
        PlatformRegistry::simulated(),
        GenerationConfig::default(),
    ))
}

async fn seeded_memory_index() -> Arc<EmbeddingIndex> {
    let index = memory_index();
    seed::seed(&index, &RetrievalConfig::default()).await.unwrap();
    index
}

// ── SQLite-backed index ────────────────────────────────────────────────

async fn sqlite_index(dir: &tempfile::TempDir) -> Arc<EmbeddingIndex> {
    let mut config = Config::default();
    config.db.path = dir.path().join("forge-test.db");
    let pool = db::connect(&config).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteIndex::new(pool, "hashed-v1"));
    Arc::new(EmbeddingIndex::new(store, EmbeddingConfig::default()))
}

#[tokio::test]
async fn sqlite_threshold_and_ordering_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let index = sqlite_index(&dir).await;
    index.create_collection("content").await.unwrap();
    index
        .upsert(
            "content",
            &[
                item("a", "solar panel costs"),
                item("b", "solar panel installation"),
                item("c", "email marketing tips"),
            ],
        )
        .await
        .unwrap();

    let hits = index
        .query("content", "cost of solar installation", 2, 0.3, None)
        .await
        .unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.item.id.as_str()).collect();
    assert_eq!(hits.len(), 2);
    assert!(ids.contains(&"a") && ids.contains(&"b"), "got {:?}", ids);
    // Every returned score clears the threshold, ordered descending.
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert!(hits.iter().all(|h| h.similarity >= 0.3));
}

#[tokio::test]
async fn sqlite_upsert_is_idempotent_per_id() {
    let dir = tempfile::tempdir().unwrap();
    let index = sqlite_index(&dir).await;
    index.create_collection("content").await.unwrap();

    index
        .upsert("content", &[item("a", "first version")])
        .await
        .unwrap();
    index
        .upsert("content", &[item("a", "second version")])
        .await
        .unwrap();

    let stats = index.stats("content").await.unwrap();
    assert_eq!(stats.items, 1);
    let entry = index.get_entry("content", "a").await.unwrap().unwrap();
    assert_eq!(entry.item.text, "second version");

    // The stored vector tracks the latest text.
    let hits = index
        .query("content", "second version", 1, 0.0, None)
        .await
        .unwrap();
    assert_eq!(hits[0].item.id, "a");
}

#[tokio::test]
async fn sqlite_seed_and_retrieve_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let index = sqlite_index(&dir).await;
    let retrieval = RetrievalConfig::default();
    seed::seed(&index, &retrieval).await.unwrap();

    let retriever = Retriever::new(index.clone(), retrieval.clone());
    let results = retriever
        .retrieve_context("commercial solar payback", None, 5, 0.2)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results
        .iter()
        .all(|r| r.matched_collection == retrieval.content_collection));

    let stats = index.stats(&retrieval.brand_collection).await.unwrap();
    assert!(stats.avg_brand_voice_score.unwrap() > 0.8);
}

#[tokio::test]
async fn unknown_collection_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let index = sqlite_index(&dir).await;
    let err = index.query("missing", "anything", 5, 0.5, None).await;
    assert!(matches!(err, Err(EngineError::CollectionNotFound(_))));
}

// ── Retriever addressing errors ────────────────────────────────────────

#[tokio::test]
async fn recommend_similar_unknown_id_errors() {
    let index = seeded_memory_index().await;
    let retriever = Retriever::new(index, RetrievalConfig::default());
    let err = retriever.recommend_similar("nonexistent-id", 5, false).await;
    assert!(matches!(err, Err(EngineError::ContentNotFound(_))));
}

// ── Pipeline: success, degradation, failure ────────────────────────────

#[tokio::test]
async fn generate_with_seeded_index_produces_grounded_response() {
    let index = seeded_memory_index().await;
    let coordinator = coordinator_with(
        index,
        Arc::new(TemplateEngine::new()),
        test_retrieval_config(),
    );

    let mut req = request("commercial solar ROI for manufacturers");
    req.include_reasoning = true;
    let response = coordinator.generate(req).await.unwrap();

    assert!(!response.content.is_empty());
    assert!(!response.sources_used.is_empty());
    assert!(response.brand_voice_score.is_some());
    assert!(response.confidence > 0.0 && response.confidence <= 1.0);
    assert!(response.reasoning.is_some());
}

#[tokio::test]
async fn empty_index_degrades_instead_of_failing() {
    let index = memory_index();
    seed_collections_only(&index).await;
    let coordinator = coordinator_with(
        index,
        Arc::new(TemplateEngine::new()),
        RetrievalConfig::default(),
    );

    let response = coordinator
        .generate(request("solar ROI against an empty index"))
        .await
        .unwrap();

    assert!(response.sources_used.is_empty());
    assert!(!response.content.is_empty());
}

async fn seed_collections_only(index: &EmbeddingIndex) {
    let retrieval = RetrievalConfig::default();
    index
        .create_collection(&retrieval.content_collection)
        .await
        .unwrap();
    index
        .create_collection(&retrieval.brand_collection)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_collections_also_degrade_retrieval() {
    // Even an addressing error at retrieval time downgrades to empty
    // context rather than failing the run.
    let coordinator = coordinator_with(
        memory_index(),
        Arc::new(TemplateEngine::new()),
        RetrievalConfig::default(),
    );

    let response = coordinator.generate(request("solar ROI")).await.unwrap();
    assert!(response.sources_used.is_empty());
    assert!(response
        .suggestions
        .iter()
        .any(|s| s.contains("without reference material")));
}

#[tokio::test]
async fn empty_prompt_rejected_before_any_event() {
    let index = seeded_memory_index().await;
    let coordinator = coordinator_with(
        index,
        Arc::new(TemplateEngine::new()),
        test_retrieval_config(),
    );

    let (mut events, handle) = coordinator.generate_streaming(request(""));

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(events.recv().await.is_none(), "no events may precede validation");
}

// ── Streaming contract ─────────────────────────────────────────────────

#[tokio::test]
async fn streaming_events_are_monotonic_and_terminated() {
    let index = seeded_memory_index().await;
    let coordinator = coordinator_with(
        index,
        Arc::new(TemplateEngine::new()),
        test_retrieval_config(),
    );

    let (mut events, handle) = coordinator.generate_streaming(request("solar ROI update"));

    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    let response = handle.await.unwrap().unwrap();

    assert!(collected.len() >= 4);
    assert_eq!(collected.first().unwrap().kind, ActivityKind::Started);
    assert_eq!(collected.last().unwrap().kind, ActivityKind::Completed);
    assert_eq!(collected.last().unwrap().progress, 100);

    for pair in collected.windows(2) {
        assert!(pair[1].step > pair[0].step, "steps must strictly increase");
        assert!(
            pair[1].progress >= pair[0].progress,
            "progress must never decrease"
        );
    }

    // All events and the final response share one request id.
    for event in &collected {
        assert_eq!(event.request_id, response.request_id);
    }

    assert!(collected
        .iter()
        .any(|e| e.kind == ActivityKind::Retrieval && e.tools_used == vec!["content_search"]));
    assert!(collected
        .iter()
        .any(|e| e.kind == ActivityKind::BrandAnalysis));
}

#[tokio::test]
async fn dropping_the_receiver_cancels_the_run() {
    let index = seeded_memory_index().await;
    let coordinator = coordinator_with(
        index,
        Arc::new(TemplateEngine::new()),
        test_retrieval_config(),
    );

    let (events, handle) = coordinator.generate_streaming(request("solar ROI"));
    drop(events);

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(coordinator.stats().failed, 0);
    assert_eq!(coordinator.stats().completed, 0);
}

// ── Stage failure classification ───────────────────────────────────────

/// Engine whose `analyze` call always fails; `complete` stays healthy.
struct AnalyzeFailEngine {
    inner: TemplateEngine,
}

#[async_trait]
impl GenerationEngine for AnalyzeFailEngine {
    async fn complete(&self, template: TemplateId, vars: &TemplateVars) -> AnyResult<String> {
        self.inner.complete(template, vars).await
    }
    async fn analyze(
        &self,
        _template: TemplateId,
        _vars: &TemplateVars,
    ) -> AnyResult<serde_json::Value> {
        anyhow::bail!("analysis backend offline")
    }
}

/// Engine that fails every call.
struct DeadEngine;

#[async_trait]
impl GenerationEngine for DeadEngine {
    async fn complete(&self, _t: TemplateId, _v: &TemplateVars) -> AnyResult<String> {
        anyhow::bail!("capability unavailable")
    }
    async fn analyze(&self, _t: TemplateId, _v: &TemplateVars) -> AnyResult<serde_json::Value> {
        anyhow::bail!("capability unavailable")
    }
}

#[tokio::test]
async fn brand_stage_failure_degrades_with_null_score() {
    // Empty (but existing) collections pin every stage confidence:
    // retrieval 0.5 (nothing cleared), strategy 0.75, drafting 0.78.
    let index = memory_index();
    seed_collections_only(&index).await;
    let coordinator = coordinator_with(
        index,
        Arc::new(AnalyzeFailEngine {
            inner: TemplateEngine::new(),
        }),
        RetrievalConfig::default(),
    );

    let response = coordinator
        .generate(request("commercial solar ROI for manufacturers"))
        .await
        .unwrap();

    assert!(response.brand_voice_score.is_none());
    assert!(response
        .suggestions
        .iter()
        .any(|s| s.contains("unscored")));

    // The degraded brand stage is excluded from the aggregate, so the
    // minimum over the completed stages is retrieval's 0.5.
    assert!((response.confidence - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn strategy_failure_is_fatal_with_error_event() {
    let index = seeded_memory_index().await;
    let coordinator = coordinator_with(index, Arc::new(DeadEngine), test_retrieval_config());

    let (mut events, handle) = coordinator.generate_streaming(request("solar ROI"));

    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    let result = handle.await.unwrap();

    assert!(matches!(
        result,
        Err(EngineError::GenerationFailed { .. })
    ));
    let last = collected.last().unwrap();
    assert_eq!(last.kind, ActivityKind::Error);
    assert!(last.action.contains("generation_failed"));
    // Strategy failed, so retrieval is the last completed step.
    assert!(last
        .reasoning
        .as_deref()
        .unwrap()
        .contains("last completed step: retrieving"));
    assert_eq!(coordinator.stats().failed, 1);
}

// ── Distribution inside the pipeline ───────────────────────────────────

#[tokio::test]
async fn platform_request_runs_distribution_stage() {
    let index = seeded_memory_index().await;
    let coordinator = coordinator_with(
        index,
        Arc::new(TemplateEngine::new()),
        test_retrieval_config(),
    );

    let mut req = request("solar ROI for social");
    req.content_type = ContentType::SocialMedia;
    req.platform = Some(Platform::Linkedin);

    let (mut events, handle) = coordinator.generate_streaming(req);
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    let response = handle.await.unwrap().unwrap();

    assert!(collected
        .iter()
        .any(|e| e.tools_used == vec!["distribution_planner"]));
    // Simulated clients accept everything, so no failure suggestions.
    assert!(response
        .suggestions
        .iter()
        .all(|s| !s.contains("Publishing to")));
}

// ── Brand confidence floor ─────────────────────────────────────────────

#[tokio::test]
async fn brand_analysis_without_exemplars_reports_low_confidence() {
    use draftforge::agents::BrandConsistencyAgent;

    let index = memory_index();
    seed_collections_only(&index).await;
    let retriever = Arc::new(Retriever::new(index, RetrievalConfig::default()));
    let agent = BrandConsistencyAgent::new(retriever, Arc::new(TemplateEngine::new()));

    let analysis = agent
        .analyze_brand_voice("Entirely novel content with no exemplar corpus.", 0.8)
        .await
        .unwrap();

    assert!((analysis.overall_score - 0.5).abs() < 1e-9);
    assert!(analysis.confidence < 0.5);
    assert!(!analysis.suggestions.is_empty());
    assert!(analysis.examples_used.is_empty());
}
