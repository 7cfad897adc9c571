use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("draftforge.db"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hashed".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Collection holding the general content corpus.
    #[serde(default = "default_content_collection")]
    pub content_collection: String,
    /// Collection holding pre-scored brand-voice exemplars.
    #[serde(default = "default_brand_collection")]
    pub brand_collection: String,
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Minimum stored score for an item to count as a brand exemplar.
    #[serde(default = "default_brand_example_floor")]
    pub brand_example_floor: f64,
    /// Minimum similarity for an exemplar to inform a voice analysis.
    #[serde(default = "default_brand_similarity_threshold")]
    pub brand_similarity_threshold: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            content_collection: default_content_collection(),
            brand_collection: default_brand_collection(),
            default_k: default_k(),
            similarity_threshold: default_similarity_threshold(),
            brand_example_floor: default_brand_example_floor(),
            brand_similarity_threshold: default_brand_similarity_threshold(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
        }
    }
}

fn default_content_collection() -> String {
    "content".to_string()
}
fn default_brand_collection() -> String {
    "brand_voice_examples".to_string()
}
fn default_k() -> usize {
    5
}
fn default_similarity_threshold() -> f64 {
    0.7
}
fn default_brand_example_floor() -> f64 {
    0.8
}
fn default_brand_similarity_threshold() -> f64 {
    0.5
}
fn default_semantic_weight() -> f64 {
    0.7
}
fn default_keyword_weight() -> f64 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,
    #[serde(default = "default_strategy_timeout")]
    pub strategy_timeout_secs: u64,
    #[serde(default = "default_draft_timeout")]
    pub draft_timeout_secs: u64,
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
    /// Brand score below which the pipeline emits revision suggestions.
    #[serde(default = "default_brand_target")]
    pub brand_target_score: f64,
    /// Bound on the progress-event channel between producer and consumer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            retrieval_timeout_secs: default_retrieval_timeout(),
            strategy_timeout_secs: default_strategy_timeout(),
            draft_timeout_secs: default_draft_timeout(),
            analysis_timeout_secs: default_analysis_timeout(),
            publish_timeout_secs: default_publish_timeout(),
            brand_target_score: default_brand_target(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_retrieval_timeout() -> u64 {
    15
}
fn default_strategy_timeout() -> u64 {
    30
}
fn default_draft_timeout() -> u64 {
    45
}
fn default_analysis_timeout() -> u64 {
    20
}
fn default_publish_timeout() -> u64 {
    20
}
fn default_brand_target() -> f64 {
    0.8
}
fn default_event_buffer() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8790".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "hashed" | "openai" | "ollama" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hashed, openai, ollama, or disabled.",
            other
        ),
    }

    if config.embedding.provider == "openai" && config.embedding.model.is_none() {
        anyhow::bail!("embedding.model must be specified when provider is 'openai'");
    }

    if !(0.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        anyhow::bail!("retrieval.similarity_threshold must be in [0.0, 1.0]");
    }

    if !(0.0..=1.0).contains(&config.generation.brand_target_score) {
        anyhow::bail!("generation.brand_target_score must be in [0.0, 1.0]");
    }

    if config.retrieval.default_k == 0 {
        anyhow::bail!("retrieval.default_k must be >= 1");
    }

    if config.retrieval.semantic_weight < 0.0 || config.retrieval.keyword_weight < 0.0 {
        anyhow::bail!("retrieval weights must be non-negative");
    }

    if config.generation.event_buffer == 0 {
        anyhow::bail!("generation.event_buffer must be >= 1");
    }

    Ok(config)
}
