//! The orchestration state machine.
//!
//! One [`AgentCoordinator`] run corresponds to one logical request and
//! walks a strictly forward pipeline:
//!
//! ```text
//! INITIALIZED → RETRIEVING → STRATEGIZING → GENERATING
//!      → ANALYZING_BRAND → (DISTRIBUTING) → COMPLETED
//! ```
//!
//! `FAILED` is reachable from any non-terminal state; there is no state
//! re-entry. Failure classification per stage:
//!
//! | Stage | On failure |
//! |-------|-----------|
//! | Retrieval | degrade to empty context, warn, continue |
//! | Strategy | fatal |
//! | Drafting | fatal |
//! | Brand analysis | degrade: null score + warning suggestion |
//! | Distribution | per-platform, never aborts the run |
//!
//! Progress events flow through a bounded mpsc channel. The consumer
//! cancels by dropping the receiver; the coordinator observes the
//! closed channel at the next stage boundary, stops emitting, and
//! abandons the run with [`EngineError::Cancelled`]. No terminal event
//! follows a cancellation — the stream is simply closed.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use draftforge_core::error::EngineError;
use draftforge_core::models::{
    ActivityKind, AgentActivityEvent, GenerationRequest, GenerationResponse, PublishResult,
    RetrievalResult,
};

use crate::agents::{BrandConsistencyAgent, ContentStrategyAgent, DistributionAgent};
use crate::config::GenerationConfig;
use crate::engine::GenerationEngine;
use crate::platforms::PlatformRegistry;
use crate::retriever::Retriever;

/// Pipeline states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Initialized,
    Retrieving,
    Strategizing,
    Generating,
    AnalyzingBrand,
    Distributing,
    Completed,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Initialized => "initialized",
            PipelineState::Retrieving => "retrieving",
            PipelineState::Strategizing => "strategizing",
            PipelineState::Generating => "generating",
            PipelineState::AnalyzingBrand => "analyzing_brand",
            PipelineState::Distributing => "distributing",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Lifetime counters for observability.
#[derive(Debug, Default)]
pub struct CoordinatorStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of [`CoordinatorStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub completed: u64,
    pub failed: u64,
}

enum EventSink {
    Channel(mpsc::Sender<AgentActivityEvent>),
    Discard,
}

/// Tracks step/progress monotonicity and pushes events to the sink.
struct Emitter {
    sink: EventSink,
    request_id: String,
    step: u32,
    progress: u8,
}

impl Emitter {
    fn new(sink: EventSink, request_id: String) -> Self {
        Self {
            sink,
            request_id,
            step: 0,
            progress: 0,
        }
    }

    /// Emit one event. Progress clamps to the high-water mark so it
    /// never decreases; steps strictly increase.
    async fn emit(
        &mut self,
        kind: ActivityKind,
        action: impl Into<String>,
        progress: u8,
        reasoning: Option<String>,
        confidence: Option<f64>,
        tools_used: Vec<String>,
    ) -> Result<(), EngineError> {
        self.step += 1;
        self.progress = self.progress.max(progress.min(100));

        let event = AgentActivityEvent {
            kind,
            step: self.step,
            action: action.into(),
            progress: self.progress,
            reasoning,
            confidence,
            tools_used,
            request_id: self.request_id.clone(),
        };

        match &self.sink {
            EventSink::Discard => Ok(()),
            EventSink::Channel(tx) => tx
                .send(event)
                .await
                .map_err(|_| EngineError::Cancelled),
        }
    }
}

/// Central coordinator for multi-agent generation runs.
pub struct AgentCoordinator {
    retriever: Arc<Retriever>,
    strategy_agent: ContentStrategyAgent,
    brand_agent: BrandConsistencyAgent,
    distribution_agent: DistributionAgent,
    config: GenerationConfig,
    stats: CoordinatorStats,
}

impl AgentCoordinator {
    pub fn new(
        retriever: Arc<Retriever>,
        engine: Arc<dyn GenerationEngine>,
        platforms: PlatformRegistry,
        config: GenerationConfig,
    ) -> Self {
        let strategy_agent = ContentStrategyAgent::new(engine.clone());
        let brand_agent = BrandConsistencyAgent::new(retriever.clone(), engine);
        let distribution_agent = DistributionAgent::new(
            platforms,
            Duration::from_secs(config.publish_timeout_secs),
        );
        Self {
            retriever,
            strategy_agent,
            brand_agent,
            distribution_agent,
            config,
            stats: CoordinatorStats::default(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// Synchronous entry point: run the pipeline to completion without
    /// an event consumer.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, EngineError> {
        let request_id = Uuid::new_v4().to_string();
        let mut emitter = Emitter::new(EventSink::Discard, request_id);
        self.run_pipeline(request, &mut emitter).await
    }

    /// Streaming entry point.
    ///
    /// Returns the event receiver and a handle resolving to the final
    /// response. Dropping the receiver cancels the run at its next
    /// stage boundary; the handle then resolves to
    /// [`EngineError::Cancelled`] and no terminal event is emitted.
    pub fn generate_streaming(
        self: &Arc<Self>,
        request: GenerationRequest,
    ) -> (
        mpsc::Receiver<AgentActivityEvent>,
        JoinHandle<Result<GenerationResponse, EngineError>>,
    ) {
        let (tx, rx) = mpsc::channel(self.config.event_buffer);
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            let request_id = Uuid::new_v4().to_string();
            let mut emitter = Emitter::new(EventSink::Channel(tx), request_id);
            coordinator.run_pipeline(request, &mut emitter).await
        });
        (rx, handle)
    }

    async fn run_pipeline(
        &self,
        request: GenerationRequest,
        emitter: &mut Emitter,
    ) -> Result<GenerationResponse, EngineError> {
        // Validation happens before any event or state transition.
        request.validate()?;

        let started_at = Instant::now();
        let mut state = PipelineState::Initialized;
        let mut last_completed = PipelineState::Initialized;
        let mut confidences: Vec<f64> = Vec::new();
        let mut suggestions: Vec<String> = Vec::new();
        let mut reasoning_trail: Vec<String> = Vec::new();

        info!(request_id = %emitter.request_id, content_type = %request.content_type, "generation started");

        emitter
            .emit(
                ActivityKind::Started,
                "Accepted request; starting generation pipeline",
                5,
                None,
                None,
                vec![],
            )
            .await?;

        // ── RETRIEVING ─────────────────────────────────────────────
        state = self.advance(state, PipelineState::Retrieving);
        let retrieval_cfg = self.retriever.config().clone();
        let context: Vec<RetrievalResult> = if request.use_rag {
            let outcome = bounded(
                "context retrieval",
                self.config.retrieval_timeout_secs,
                self.retriever.retrieve_context(
                    &request.prompt,
                    Some(request.content_type),
                    retrieval_cfg.default_k,
                    retrieval_cfg.similarity_threshold,
                ),
            )
            .await;
            match outcome {
                Ok(results) => results,
                Err(e) => {
                    // Generation without context is degraded but valid.
                    warn!(error = %e, "retrieval degraded to empty context");
                    suggestions.push(format!(
                        "Context retrieval was unavailable ({}); content was generated \
                         without reference material.",
                        e.kind()
                    ));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let retrieval_conf = retrieval_confidence(&context, retrieval_cfg.default_k);
        confidences.push(retrieval_conf);
        reasoning_trail.push(format!(
            "Retrieval: {} item(s) cleared threshold {:.2}.",
            context.len(),
            retrieval_cfg.similarity_threshold
        ));

        emitter
            .emit(
                ActivityKind::Retrieval,
                format!("Retrieved {} context item(s)", context.len()),
                25,
                Some(summarize_context(&context)),
                Some(retrieval_conf),
                vec!["content_search".into()],
            )
            .await?;
        last_completed = state;

        // ── STRATEGIZING ───────────────────────────────────────────
        state = self.advance(state, PipelineState::Strategizing);
        let strategy = match bounded(
            "strategy planning",
            self.config.strategy_timeout_secs,
            self.strategy_agent.plan_strategy(&request, &context),
        )
        .await
        {
            Ok(strategy) => strategy,
            Err(e) => return self.fail(emitter, last_completed, e).await,
        };
        confidences.push(strategy.confidence);
        reasoning_trail.push(strategy.reasoning.clone());

        emitter
            .emit(
                ActivityKind::Progress,
                "Planned content strategy",
                45,
                request.include_reasoning.then(|| strategy.reasoning.clone()),
                Some(strategy.confidence),
                vec!["strategy_planner".into()],
            )
            .await?;
        last_completed = state;

        // ── GENERATING ─────────────────────────────────────────────
        state = self.advance(state, PipelineState::Generating);
        let draft = match bounded(
            "draft generation",
            self.config.draft_timeout_secs,
            self.strategy_agent
                .generate_content(&strategy, &context, &request),
        )
        .await
        {
            Ok(draft) => draft,
            Err(e) => return self.fail(emitter, last_completed, e).await,
        };
        confidences.push(draft.confidence);
        reasoning_trail.push(draft.reasoning.clone());

        emitter
            .emit(
                ActivityKind::Progress,
                format!("Generated draft ({} characters)", draft.content.chars().count()),
                70,
                request.include_reasoning.then(|| draft.reasoning.clone()),
                Some(draft.confidence),
                vec!["content_generator".into()],
            )
            .await?;
        last_completed = state;

        // ── ANALYZING_BRAND ────────────────────────────────────────
        state = self.advance(state, PipelineState::AnalyzingBrand);
        let mut brand_voice_score = None;
        let mut brand_sources: Vec<String> = Vec::new();
        match bounded(
            "brand analysis",
            self.config.analysis_timeout_secs,
            self.brand_agent
                .analyze_brand_voice(&draft.content, self.config.brand_target_score),
        )
        .await
        {
            Ok(analysis) => {
                brand_voice_score = Some(analysis.overall_score);
                confidences.push(analysis.confidence);
                brand_sources = analysis.examples_used.clone();
                suggestions.extend(analysis.suggestions.clone());
                reasoning_trail.push(format!(
                    "Brand analysis: score {:.3} from {} exemplar(s).",
                    analysis.overall_score,
                    analysis.examples_used.len()
                ));
                emitter
                    .emit(
                        ActivityKind::BrandAnalysis,
                        format!("Brand voice score {:.3}", analysis.overall_score),
                        85,
                        request.include_reasoning.then(|| {
                            format!(
                                "Weighted against {} exemplar(s); confidence {:.2}.",
                                analysis.examples_used.len(),
                                analysis.confidence
                            )
                        }),
                        Some(analysis.confidence),
                        vec!["brand_analysis".into()],
                    )
                    .await?;
            }
            Err(e @ EngineError::Cancelled) => return Err(e),
            Err(e) => {
                // Publishing unscored-but-valid content beats failing
                // the whole request; the brand stage is excluded from
                // the confidence aggregate since it didn't complete.
                warn!(error = %e, "brand analysis degraded");
                suggestions.push(
                    "Brand voice analysis was unavailable; the draft is unscored and should \
                     be reviewed against brand guidelines manually."
                        .to_string(),
                );
                reasoning_trail.push("Brand analysis: degraded (no score).".to_string());
                emitter
                    .emit(
                        ActivityKind::BrandAnalysis,
                        "Brand analysis degraded; continuing without a score",
                        85,
                        Some(format!("cause: {}", e.kind())),
                        None,
                        vec!["brand_analysis".into()],
                    )
                    .await?;
            }
        }

        // ── DISTRIBUTING (optional) ────────────────────────────────
        if let Some(platform) = request.platform {
            state = self.advance(state, PipelineState::Distributing);
            let plans = self
                .distribution_agent
                .plan_distribution(&draft.content, &[platform]);
            let results: Vec<PublishResult> =
                self.distribution_agent.execute_distribution(&plans).await;
            for result in &results {
                if let Some(error) = &result.error {
                    suggestions.push(format!(
                        "Publishing to {} failed: {}.",
                        result.platform, error
                    ));
                }
            }
            let succeeded = results.iter().filter(|r| r.success).count();
            reasoning_trail.push(format!(
                "Distribution: {}/{} platform(s) succeeded.",
                succeeded,
                results.len()
            ));
            emitter
                .emit(
                    ActivityKind::Progress,
                    format!(
                        "Distributed to {}/{} platform(s)",
                        succeeded,
                        results.len()
                    ),
                    95,
                    None,
                    None,
                    vec!["distribution_planner".into()],
                )
                .await?;
        }

        // ── COMPLETED ──────────────────────────────────────────────
        state = self.advance(state, PipelineState::Completed);
        let confidence = confidences
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .min(1.0);

        let mut sources_used: Vec<String> = draft
            .sources_used
            .iter()
            .cloned()
            .chain(brand_sources)
            .collect();
        sources_used.sort();
        sources_used.dedup();

        let response = GenerationResponse {
            content: draft.content,
            reasoning: request
                .include_reasoning
                .then(|| reasoning_trail.join("\n")),
            confidence,
            brand_voice_score,
            sources_used,
            suggestions,
            processing_time_ms: started_at.elapsed().as_millis() as u64,
            request_id: emitter.request_id.clone(),
        };

        emitter
            .emit(
                ActivityKind::Completed,
                "Generation complete",
                100,
                None,
                Some(confidence),
                vec![],
            )
            .await?;

        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        info!(
            request_id = %emitter.request_id,
            state = %state,
            elapsed_ms = response.processing_time_ms,
            "generation completed"
        );
        Ok(response)
    }

    /// Record a forward transition. Transitions are strictly forward by
    /// construction; this exists to keep the walk observable in logs.
    fn advance(&self, from: PipelineState, to: PipelineState) -> PipelineState {
        info!(from = %from, to = %to, "pipeline transition");
        to
    }

    /// Terminal failure: emit the `error` event and surface the cause.
    async fn fail(
        &self,
        emitter: &mut Emitter,
        last_completed: PipelineState,
        error: EngineError,
    ) -> Result<GenerationResponse, EngineError> {
        if matches!(error, EngineError::Cancelled) {
            return Err(error);
        }

        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        warn!(last_completed = %last_completed, error = %error, "generation failed");

        // Best effort: a dropped receiver here just means nobody is
        // listening for the terminal event.
        let _ = emitter
            .emit(
                ActivityKind::Error,
                format!("Generation failed: {}", error.kind()),
                emitter.progress,
                Some(format!(
                    "{} (last completed step: {})",
                    error, last_completed
                )),
                None,
                vec![],
            )
            .await;

        Err(error)
    }
}

/// Map bounded-call timeouts into the same failure path as the call
/// failing outright.
async fn bounded<T>(
    operation: &str,
    seconds: u64,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(Duration::from_secs(seconds), fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation: operation.to_string(),
            seconds,
        }),
    }
}

/// Confidence attributed to the retrieval stage: scales with how much
/// of the requested context materialized.
fn retrieval_confidence(context: &[RetrievalResult], k: usize) -> f64 {
    let fill = context.len() as f64 / k.max(1) as f64;
    0.5 + 0.4 * fill.min(1.0)
}

fn summarize_context(context: &[RetrievalResult]) -> String {
    if context.is_empty() {
        return "No prior content cleared the similarity threshold.".to_string();
    }
    let titles: Vec<String> = context
        .iter()
        .take(3)
        .map(|r| format!("\"{}\" ({:.3})", r.content.title, r.similarity_score))
        .collect();
    format!("Top matches: {}", titles.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_confidence_scales_with_fill() {
        let empty: Vec<RetrievalResult> = Vec::new();
        assert!((retrieval_confidence(&empty, 5) - 0.5).abs() < 1e-9);
        // k = 0 must not divide by zero.
        assert!((retrieval_confidence(&empty, 0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn states_display_in_wire_form() {
        assert_eq!(PipelineState::AnalyzingBrand.to_string(), "analyzing_brand");
        assert_eq!(PipelineState::Failed.to_string(), "failed");
    }
}
