//! # DraftForge CLI (`forge`)
//!
//! The `forge` binary is the primary interface for DraftForge. It
//! provides commands for database initialization, demo-data seeding,
//! content indexing, retrieval, generation, and starting the HTTP
//! server.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `forge init` | Create the SQLite database and run schema migrations |
//! | `forge seed` | Load the demo corpus into the index |
//! | `forge index <file.json>` | Upsert content items from a JSON file |
//! | `forge search "<query>"` | Retrieve ranked context with explanations |
//! | `forge recommend <id>` | Recommend items similar to a stored one |
//! | `forge generate "<prompt>"` | Run the full generation pipeline |
//! | `forge stats <collection>` | Show collection statistics |
//! | `forge serve` | Start the HTTP + WebSocket server |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use draftforge::config::{load_config, Config};
use draftforge::coordinator::AgentCoordinator;
use draftforge::engine::TemplateEngine;
use draftforge::index::EmbeddingIndex;
use draftforge::platforms::PlatformRegistry;
use draftforge::retriever::Retriever;
use draftforge::server::{run_server, AppState};
use draftforge::sqlite_store::SqliteIndex;
use draftforge::{db, migrate, seed};

use draftforge_core::models::{ContentItem, ContentType, GenerationRequest, Platform};

/// DraftForge CLI — a multi-agent RAG content generation engine.
#[derive(Parser)]
#[command(
    name = "forge",
    about = "DraftForge — a multi-agent RAG content generation engine",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./forge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the schema, and the configured
    /// collections. Idempotent.
    Init,

    /// Load the demo corpus (content + brand-voice exemplars).
    Seed,

    /// Upsert content items from a JSON file (array of items).
    Index {
        /// Path to a JSON file containing an array of content items.
        file: PathBuf,
        /// Target collection.
        #[arg(long)]
        collection: Option<String>,
    },

    /// Retrieve ranked context for a query.
    Search {
        query: String,
        /// Number of results.
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Minimum similarity score in [0, 1].
        #[arg(long)]
        threshold: Option<f64>,
        /// Filter by content type.
        #[arg(long)]
        content_type: Option<String>,
        /// Hybrid semantic + keyword ranking instead of pure semantic.
        #[arg(long)]
        hybrid: bool,
    },

    /// Recommend items similar to a stored one.
    Recommend {
        id: String,
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Penalize near-duplicate titles/tags in the result set.
        #[arg(long)]
        diversify: bool,
    },

    /// Run the full generation pipeline for a prompt.
    Generate {
        prompt: String,
        /// Content type: blog_post, social_media, email_newsletter,
        /// product_description, landing_page.
        #[arg(long, default_value = "blog_post")]
        content_type: String,
        #[arg(long)]
        audience: Option<String>,
        #[arg(long)]
        tone: Option<String>,
        /// Soft length target in characters.
        #[arg(long)]
        max_length: Option<usize>,
        /// Publish to this platform after generation.
        #[arg(long)]
        platform: Option<String>,
        /// Generate without retrieved context.
        #[arg(long)]
        no_rag: bool,
        /// Include the reasoning trail in the output.
        #[arg(long)]
        reasoning: bool,
    },

    /// Show statistics for a collection.
    Stats { collection: String },

    /// Start the HTTP + WebSocket server.
    Serve,
}

fn load_or_default(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

async fn build_index(config: &Config) -> Result<Arc<EmbeddingIndex>> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let provider = draftforge::embedding::create_provider(&config.embedding)?;
    let store = Arc::new(SqliteIndex::new(pool, provider.model_name().to_string()));
    Ok(Arc::new(EmbeddingIndex::new(
        store,
        config.embedding.clone(),
    )))
}

fn build_coordinator(config: &Config, index: Arc<EmbeddingIndex>) -> Arc<AgentCoordinator> {
    let retriever = Arc::new(Retriever::new(index, config.retrieval.clone()));
    Arc::new(AgentCoordinator::new(
        retriever,
        Arc::new(TemplateEngine::new()),
        PlatformRegistry::simulated(),
        config.generation.clone(),
    ))
}

fn parse_content_type(s: &str) -> Result<ContentType> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown content type: {}", s))
}

fn parse_platform(s: &str) -> Result<Platform> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown platform: {}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draftforge=info,forge=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let index = build_index(&config).await?;
            index
                .create_collection(&config.retrieval.content_collection)
                .await?;
            index
                .create_collection(&config.retrieval.brand_collection)
                .await?;
            println!("Initialized database at {}", config.db.path.display());
        }

        Commands::Seed => {
            let index = build_index(&config).await?;
            let (content, brand) = seed::seed(&index, &config.retrieval).await?;
            println!(
                "Seeded {} content item(s) and {} brand-voice exemplar(s)",
                content, brand
            );
        }

        Commands::Index { file, collection } => {
            let index = build_index(&config).await?;
            let collection =
                collection.unwrap_or_else(|| config.retrieval.content_collection.clone());
            let body = std::fs::read_to_string(&file)?;
            let items: Vec<ContentItem> = serde_json::from_str(&body)?;
            index.create_collection(&collection).await?;
            let report = index.upsert(&collection, &items).await?;
            println!(
                "Wrote {} item(s) ({} unchanged) to '{}'",
                report.written, report.skipped_unchanged, collection
            );
        }

        Commands::Search {
            query,
            top,
            threshold,
            content_type,
            hybrid,
        } => {
            let index = build_index(&config).await?;
            let retriever = Retriever::new(index, config.retrieval.clone());
            let threshold = threshold.unwrap_or(config.retrieval.similarity_threshold);

            let results = if hybrid {
                retriever
                    .hybrid_search(
                        &query,
                        top,
                        config.retrieval.semantic_weight,
                        config.retrieval.keyword_weight,
                    )
                    .await?
            } else {
                let ct = content_type.as_deref().map(parse_content_type).transpose()?;
                retriever.retrieve_context(&query, ct, top, threshold).await?
            };

            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} ({})",
                    i + 1,
                    result.similarity_score,
                    result.content.title,
                    result.content.id
                );
                println!("    {}", result.relevance_explanation);
            }
        }

        Commands::Recommend { id, top, diversify } => {
            let index = build_index(&config).await?;
            let retriever = Retriever::new(index, config.retrieval.clone());
            let results = retriever.recommend_similar(&id, top, diversify).await?;
            if results.is_empty() {
                println!("No similar items.");
                return Ok(());
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} ({})",
                    i + 1,
                    result.similarity_score,
                    result.content.title,
                    result.content.id
                );
            }
        }

        Commands::Generate {
            prompt,
            content_type,
            audience,
            tone,
            max_length,
            platform,
            no_rag,
            reasoning,
        } => {
            let index = build_index(&config).await?;
            let coordinator = build_coordinator(&config, index);

            let request = GenerationRequest {
                prompt,
                content_type: parse_content_type(&content_type)?,
                target_audience: audience,
                tone,
                max_length,
                platform: platform.as_deref().map(parse_platform).transpose()?,
                use_rag: !no_rag,
                include_reasoning: reasoning,
            };

            let response = coordinator.generate(request).await?;
            println!("{}", response.content);
            println!();
            println!(
                "confidence: {:.2}  brand voice: {}  sources: {}  {}ms",
                response.confidence,
                response
                    .brand_voice_score
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "unscored".to_string()),
                response.sources_used.len(),
                response.processing_time_ms
            );
            for suggestion in &response.suggestions {
                println!("  - {}", suggestion);
            }
            if let Some(trail) = &response.reasoning {
                println!();
                println!("reasoning:\n{}", trail);
            }
        }

        Commands::Stats { collection } => {
            let index = build_index(&config).await?;
            let stats = index.stats(&collection).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Serve => {
            let index = build_index(&config).await?;
            let coordinator = build_coordinator(&config, index.clone());
            let state = AppState { coordinator, index };
            run_server(state, &config.server.bind).await?;
        }
    }

    Ok(())
}
