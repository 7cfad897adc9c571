//! Core data models used throughout DraftForge.
//!
//! These types represent the content items, requests, progress events,
//! and responses that flow through the indexing and generation pipeline.
//! The serialized field names of [`GenerationRequest`],
//! [`AgentActivityEvent`], and [`GenerationResponse`] are a wire contract
//! consumed by external dashboards and must not be renamed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Content categories supported by the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    BlogPost,
    SocialMedia,
    EmailNewsletter,
    ProductDescription,
    LandingPage,
}

impl ContentType {
    /// Stable string form, identical to the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::BlogPost => "blog_post",
            ContentType::SocialMedia => "social_media",
            ContentType::EmailNewsletter => "email_newsletter",
            ContentType::ProductDescription => "product_description",
            ContentType::LandingPage => "landing_page",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishing destinations known to the distribution planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linkedin,
    Twitter,
    Facebook,
    Email,
    Blog,
    Website,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Email => "email",
            Platform::Blog => "blog",
            Platform::Website => "website",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of indexed content.
///
/// Immutable once indexed except for metadata and brand-voice score
/// updates, which happen by re-upserting under the same `id`. The index
/// holds a query-only copy plus the derived embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique, stable identifier. The unit of mutation for upserts.
    pub id: String,
    pub title: String,
    /// Full body text. The embedding is derived from title + text.
    pub text: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Open key-value map: author, publish date, performance stats, etc.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Brand-voice alignment in [0, 1], set by prior analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_voice_score: Option<f64>,
}

impl ContentItem {
    /// The text that gets embedded: title and body together, so title
    /// terms contribute to similarity the same way the body does.
    pub fn embedding_text(&self) -> String {
        if self.title.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n\n{}", self.title, self.text)
        }
    }
}

/// A single retrieval hit, produced per-query and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub content: ContentItem,
    /// Similarity in [0, 1]; 1 = identical (1 − normalized distance).
    pub similarity_score: f64,
    /// Deterministic, templated human-readable justification.
    pub relevance_explanation: String,
    pub matched_collection: String,
}

/// Input value object for one generation run. Validated at entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Soft length target in characters; must be > 0 when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default = "default_true")]
    pub use_rag: bool,
    #[serde(default)]
    pub include_reasoning: bool,
}

fn default_true() -> bool {
    true
}

impl GenerationRequest {
    /// Reject malformed requests before any pipeline state transition.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.prompt.trim().is_empty() {
            return Err(EngineError::Validation("prompt must not be empty".into()));
        }
        if let Some(max) = self.max_length {
            if max == 0 {
                return Err(EngineError::Validation("maxLength must be > 0".into()));
            }
        }
        Ok(())
    }
}

/// Discriminant for [`AgentActivityEvent`]. Serialized values are part
/// of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Started,
    Progress,
    Retrieval,
    BrandAnalysis,
    Completed,
    Error,
}

/// Ephemeral progress record emitted during orchestration.
///
/// All events for one generation run share a `requestId`; `step`
/// strictly increases and `progress` never decreases across that
/// sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivityEvent {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub step: u32,
    pub action: String,
    /// 0–100, monotonically non-decreasing within one request.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    pub request_id: String,
}

/// Terminal output of one successful generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Minimum of the per-stage confidences that actually ran.
    pub confidence: f64,
    /// `None` when brand analysis was skipped or degraded.
    pub brand_voice_score: Option<f64>,
    /// Deduplicated union of content ids referenced across retrieval
    /// and brand-voice-example retrieval.
    pub sources_used: Vec<String>,
    pub suggestions: Vec<String>,
    pub processing_time_ms: u64,
    pub request_id: String,
}

/// Outcome of one platform publish attempt during distribution fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub platform: Platform,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Platform-returned metadata (post id, URL, ...).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_roundtrip() {
        for ct in [
            ContentType::BlogPost,
            ContentType::SocialMedia,
            ContentType::EmailNewsletter,
            ContentType::ProductDescription,
            ContentType::LandingPage,
        ] {
            let json = serde_json::to_string(&ct).unwrap();
            assert_eq!(json, format!("\"{}\"", ct.as_str()));
            let back: ContentType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ct);
        }
    }

    #[test]
    fn request_validation() {
        let mut req = GenerationRequest {
            prompt: "solar ROI for mid-size manufacturers".into(),
            content_type: ContentType::BlogPost,
            target_audience: None,
            tone: None,
            max_length: Some(800),
            platform: None,
            use_rag: true,
            include_reasoning: false,
        };
        assert!(req.validate().is_ok());

        req.prompt = "   ".into();
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));

        req.prompt = "ok".into();
        req.max_length = Some(0);
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn event_wire_field_names() {
        let event = AgentActivityEvent {
            kind: ActivityKind::BrandAnalysis,
            step: 4,
            action: "Analyzing brand voice consistency".into(),
            progress: 85,
            reasoning: None,
            confidence: Some(0.82),
            tools_used: vec!["brand_analysis".into()],
            request_id: "req-1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "brand_analysis");
        assert_eq!(json["step"], 4);
        assert_eq!(json["progress"], 85);
        assert_eq!(json["toolsUsed"][0], "brand_analysis");
        assert_eq!(json["requestId"], "req-1");
        assert!(json.get("reasoning").is_none());
    }

    #[test]
    fn response_wire_field_names() {
        let resp = GenerationResponse {
            content: "draft".into(),
            reasoning: None,
            confidence: 0.8,
            brand_voice_score: None,
            sources_used: vec!["a".into()],
            suggestions: vec![],
            processing_time_ms: 12,
            request_id: "req-1".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["brandVoiceScore"], serde_json::Value::Null);
        assert_eq!(json["sourcesUsed"][0], "a");
        assert_eq!(json["processingTimeMs"], 12);
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{"prompt": "smart grids", "contentType": "social_media"}"#,
        )
        .unwrap();
        assert!(req.use_rag);
        assert!(!req.include_reasoning);
        assert!(req.platform.is_none());
    }
}
