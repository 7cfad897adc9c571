//! Brand consistency agent.
//!
//! Scores content against a corpus of known-good brand-voice exemplars
//! and produces ordered, concrete suggestions when the score misses the
//! target. The estimate is a similarity-weighted average of exemplar
//! scores, so closer examples dominate; confidence tracks how many and
//! how similar the matched exemplars were — a sparse corpus can never
//! produce a confidently-wrong score.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use draftforge_core::error::EngineError;
use draftforge_core::models::RetrievalResult;

use crate::engine::{GenerationEngine, TemplateId, TemplateVars};
use crate::retriever::Retriever;

/// Confidence below this value marks an analysis as low-confidence.
pub const LOW_CONFIDENCE_CUTOFF: f64 = 0.5;

/// Result of one brand-voice analysis.
#[derive(Debug, Clone)]
pub struct BrandAnalysis {
    /// Similarity-weighted score estimate in [0, 1].
    pub overall_score: f64,
    /// How much to trust `overall_score`; low when exemplars were few
    /// or weakly similar.
    pub confidence: f64,
    /// Descriptive per-dimension characteristic scores.
    pub dimension_scores: BTreeMap<String, f64>,
    /// Ordered improvement suggestions; empty when the target is met.
    pub suggestions: Vec<String>,
    /// Ids of exemplars that informed the estimate.
    pub examples_used: Vec<String>,
}

pub struct BrandConsistencyAgent {
    retriever: Arc<Retriever>,
    engine: Arc<dyn GenerationEngine>,
    top_k: usize,
}

impl BrandConsistencyAgent {
    pub fn new(retriever: Arc<Retriever>, engine: Arc<dyn GenerationEngine>) -> Self {
        Self {
            retriever,
            engine,
            top_k: 5,
        }
    }

    /// Score `content` against the exemplar corpus.
    pub async fn analyze_brand_voice(
        &self,
        content: &str,
        target_score: f64,
    ) -> Result<BrandAnalysis, EngineError> {
        let examples = self
            .retriever
            .retrieve_brand_voice_examples(content, self.top_k)
            .await?;

        let (overall_score, confidence) = weighted_score(&examples, self.top_k);

        let mut vars = TemplateVars::new();
        vars.insert("content".into(), content.to_string());
        let analysis = self
            .engine
            .analyze(TemplateId::VoiceDimensions, &vars)
            .await
            .map_err(|e| EngineError::GenerationFailed {
                stage: "brand_analysis".into(),
                message: e.to_string(),
                partial_strategy: None,
            })?;

        let dimension_scores: BTreeMap<String, f64> = analysis
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_f64().map(|score| (k.clone(), score)))
                    .collect()
            })
            .unwrap_or_default();

        let mut suggestions = Vec::new();
        if examples.is_empty() {
            suggestions.push(
                "No brand-voice exemplars matched this content; the score is a neutral \
                 default with low confidence."
                    .to_string(),
            );
        }
        if overall_score < target_score {
            suggestions.extend(gap_suggestions(
                overall_score,
                target_score,
                &dimension_scores,
                &examples,
            ));
        }

        debug!(
            overall_score,
            confidence,
            examples = examples.len(),
            "brand voice analysis complete"
        );

        Ok(BrandAnalysis {
            overall_score,
            confidence,
            dimension_scores,
            suggestions,
            examples_used: examples.iter().map(|e| e.content.id.clone()).collect(),
        })
    }
}

/// Similarity-weighted average of exemplar brand scores.
///
/// Each exemplar contributes `similarity × stored_score` with weight
/// `similarity`, so closer matches dominate the estimate. With no
/// exemplars the score falls back to a neutral 0.5 with confidence
/// well below [`LOW_CONFIDENCE_CUTOFF`]. Confidence is the mean
/// similarity mass over the requested `top_k` slots, so fewer or
/// weaker exemplars always yield lower confidence.
fn weighted_score(examples: &[RetrievalResult], top_k: usize) -> (f64, f64) {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for example in examples {
        let stored = example.content.brand_voice_score.unwrap_or(0.0);
        weighted_sum += example.similarity_score * stored;
        total_weight += example.similarity_score;
    }

    if total_weight <= f64::EPSILON {
        return (0.5, 0.1);
    }

    let score = weighted_sum / total_weight;
    let confidence = (total_weight / top_k.max(1) as f64).min(1.0);
    (score, confidence)
}

/// Ordered, concrete suggestions derived from the score gap and the
/// weakest dimensions.
fn gap_suggestions(
    overall: f64,
    target: f64,
    dimensions: &BTreeMap<String, f64>,
    examples: &[RetrievalResult],
) -> Vec<String> {
    let mut weakest: Vec<(&String, &f64)> = dimensions.iter().collect();
    weakest.sort_by(|a, b| {
        a.1.partial_cmp(b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let mut suggestions = vec![format!(
        "Overall brand-voice score {:.2} is below the {:.2} target; revise before publishing.",
        overall, target
    )];

    for (dimension, score) in weakest.iter().take(3) {
        if **score >= 0.7 {
            break;
        }
        suggestions.push(match dimension.as_str() {
            "tone_consistency" => {
                "Strengthen the professional register with evidence-led phrasing.".to_string()
            }
            "solution_focus" => {
                "Reframe features as outcomes: name the problem each claim solves.".to_string()
            }
            "optimistic_outlook" => {
                "Shift framing toward opportunity and achievable results.".to_string()
            }
            "data_credibility" => {
                "Add two or three specific figures with credible sources.".to_string()
            }
            "accessibility" => {
                "Shorten sentences and replace jargon with plain terms.".to_string()
            }
            other => format!("Improve the {} dimension (currently {:.2}).", other, score),
        });
    }

    if let Some(best) = examples.first() {
        suggestions.push(format!(
            "Model the revision on \"{}\", the closest high-scoring exemplar.",
            best.content.title
        ));
    }

    suggestions
}
