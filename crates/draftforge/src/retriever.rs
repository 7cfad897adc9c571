//! Retrieval layer: ranked, explained, threshold-filtered context sets.
//!
//! Builds on [`EmbeddingIndex`] to produce the context the generation
//! agents consume. Every operation here is read-only and side-effect
//! free, so concurrent generation runs can share one retriever without
//! synchronization.
//!
//! # Retrieval Modes
//!
//! - **Context** — semantic query over the content corpus, optionally
//!   filtered by content type, with templated relevance explanations.
//! - **Brand voice** — query over the pre-scored exemplar collection,
//!   used by brand-consistency analysis.
//! - **Recommendation** — similar-item lookup from a stored vector (no
//!   re-embedding), self-excluded, with optional diversification.
//! - **Hybrid** — weighted merge of semantic similarity and keyword
//!   overlap, for queries where exact terminology matters.

use std::sync::Arc;

use draftforge_core::error::EngineError;
use draftforge_core::models::{ContentType, RetrievalResult};
use draftforge_core::scoring;
use draftforge_core::store::{FieldPredicate, MetadataFilter};

use crate::config::RetrievalConfig;
use crate::index::EmbeddingIndex;

pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(index: Arc<EmbeddingIndex>, config: RetrievalConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve ranked context for a query.
    ///
    /// Deterministic given fixed index state and inputs: hits come back
    /// ordered by similarity (ids break ties) with a templated
    /// explanation derived from score band, shared terms, and metadata.
    pub async fn retrieve_context(
        &self,
        query: &str,
        content_type: Option<ContentType>,
        k: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<RetrievalResult>, EngineError> {
        let filter = content_type.map(|ct| {
            MetadataFilter::new().with(
                "content_type",
                FieldPredicate::Eq(serde_json::Value::String(ct.as_str().to_string())),
            )
        });

        let hits = self
            .index
            .query(
                &self.config.content_collection,
                query,
                k,
                similarity_threshold,
                filter.as_ref(),
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievalResult {
                relevance_explanation: scoring::relevance_explanation(
                    query,
                    &hit.item,
                    hit.similarity,
                ),
                similarity_score: hit.similarity,
                matched_collection: self.config.content_collection.clone(),
                content: hit.item,
            })
            .collect())
    }

    /// Retrieve brand-voice exemplars most similar to `content`.
    ///
    /// Queries the dedicated exemplar collection, restricted to items
    /// whose stored brand score clears the configured floor, using the
    /// candidate content itself as the query text.
    pub async fn retrieve_brand_voice_examples(
        &self,
        content: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, EngineError> {
        let filter = MetadataFilter::new().with(
            "brand_voice_score",
            FieldPredicate::Gte(self.config.brand_example_floor),
        );

        let hits = self
            .index
            .query(
                &self.config.brand_collection,
                content,
                top_k,
                self.config.brand_similarity_threshold,
                Some(&filter),
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievalResult {
                relevance_explanation: format!(
                    "Voice exemplar with {} (score: {:.3})",
                    scoring::score_band(hit.similarity),
                    hit.similarity
                ),
                similarity_score: hit.similarity,
                matched_collection: self.config.brand_collection.clone(),
                content: hit.item,
            })
            .collect())
    }

    /// Recommend items similar to a stored one.
    ///
    /// Looks up the item's stored vector (no re-embedding), queries its
    /// own collection excluding itself, and optionally applies a
    /// diversification pass so the result set is not dominated by
    /// near-identical titles/tags.
    pub async fn recommend_similar(
        &self,
        content_id: &str,
        k: usize,
        diversify: bool,
    ) -> Result<Vec<RetrievalResult>, EngineError> {
        let collection = &self.config.content_collection;
        let entry = self
            .index
            .get_entry(collection, content_id)
            .await?
            .ok_or_else(|| EngineError::ContentNotFound(content_id.to_string()))?;

        // Over-fetch when diversifying so the re-rank has options.
        let fetch_k = if diversify { k.saturating_mul(3) } else { k + 1 };
        let hits = self
            .index
            .query_by_vector(collection, &entry.vector, fetch_k, 0.0, None)
            .await?;

        let mut results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|hit| hit.item.id != content_id)
            .map(|hit| RetrievalResult {
                relevance_explanation: format!(
                    "Similar to \"{}\" (score: {:.3})",
                    entry.item.title, hit.similarity
                ),
                similarity_score: hit.similarity,
                matched_collection: collection.clone(),
                content: hit.item,
            })
            .collect();

        scoring::sort_results(&mut results);

        if diversify {
            Ok(scoring::diversify(results, k))
        } else {
            results.truncate(k);
            Ok(results)
        }
    }

    /// Hybrid semantic + keyword search.
    ///
    /// Combines the semantic similarity with a normalized
    /// keyword-overlap score via a weighted sum; weights that don't sum
    /// to 1 are normalized. Exists because pure embedding similarity
    /// can miss exact terminology matches in technical content.
    pub async fn hybrid_search(
        &self,
        query: &str,
        k: usize,
        semantic_weight: f64,
        keyword_weight: f64,
    ) -> Result<Vec<RetrievalResult>, EngineError> {
        // Pull a wider semantic candidate set, unthresholded; the
        // combined score decides what survives.
        let hits = self
            .index
            .query(
                &self.config.content_collection,
                query,
                k.saturating_mul(2).max(k),
                0.0,
                None,
            )
            .await?;

        let mut results: Vec<RetrievalResult> = hits
            .into_iter()
            .map(|hit| {
                let keyword = scoring::keyword_overlap(query, &hit.item);
                let combined = scoring::combine_hybrid(
                    hit.similarity,
                    keyword,
                    semantic_weight,
                    keyword_weight,
                );
                RetrievalResult {
                    relevance_explanation: format!(
                        "{} | keyword overlap {:.3} | hybrid score: {:.3}",
                        scoring::relevance_explanation(query, &hit.item, hit.similarity),
                        keyword,
                        combined
                    ),
                    similarity_score: combined,
                    matched_collection: self.config.content_collection.clone(),
                    content: hit.item,
                }
            })
            .collect();

        scoring::sort_results(&mut results);
        results.truncate(k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use draftforge_core::models::ContentItem;
    use draftforge_core::store::memory::InMemoryIndex;

    fn make_item(
        id: &str,
        title: &str,
        text: &str,
        ct: ContentType,
        brand_score: Option<f64>,
    ) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            content_type: ct,
            tags: vec![],
            metadata: Default::default(),
            brand_voice_score: brand_score,
        }
    }

    async fn make_retriever(items: &[ContentItem]) -> Retriever {
        let index = Arc::new(EmbeddingIndex::new(
            Arc::new(InMemoryIndex::new()),
            EmbeddingConfig::default(),
        ));
        let config = RetrievalConfig::default();
        index
            .create_collection(&config.content_collection)
            .await
            .unwrap();
        index
            .create_collection(&config.brand_collection)
            .await
            .unwrap();
        index
            .upsert(&config.content_collection, items)
            .await
            .unwrap();
        Retriever::new(index, config)
    }

    #[tokio::test]
    async fn retrieve_context_filters_by_content_type() {
        let retriever = make_retriever(&[
            make_item(
                "a",
                "Solar savings",
                "solar savings analysis",
                ContentType::BlogPost,
                None,
            ),
            make_item(
                "b",
                "Solar savings post",
                "solar savings analysis",
                ContentType::SocialMedia,
                None,
            ),
        ])
        .await;

        let results = retriever
            .retrieve_context("solar savings", Some(ContentType::SocialMedia), 5, 0.1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content.id, "b");
        assert!(results[0]
            .relevance_explanation
            .contains("content type: social_media"));
    }

    #[tokio::test]
    async fn recommend_similar_excludes_self_and_unknown_id_errors() {
        let retriever = make_retriever(&[
            make_item("a", "Solar costs", "solar panel costs", ContentType::BlogPost, None),
            make_item(
                "b",
                "Solar install",
                "solar panel installation",
                ContentType::BlogPost,
                None,
            ),
        ])
        .await;

        let results = retriever.recommend_similar("a", 5, false).await.unwrap();
        assert!(results.iter().all(|r| r.content.id != "a"));
        assert!(!results.is_empty());

        let err = retriever.recommend_similar("nonexistent-id", 5, false).await;
        assert!(matches!(err, Err(EngineError::ContentNotFound(_))));
    }

    #[tokio::test]
    async fn hybrid_search_rewards_exact_terminology() {
        let retriever = make_retriever(&[
            make_item(
                "exact",
                "LCOE methodology",
                "LCOE methodology for utility procurement",
                ContentType::BlogPost,
                None,
            ),
            make_item(
                "vague",
                "Energy pricing",
                "general discussion of energy pricing trends",
                ContentType::BlogPost,
                None,
            ),
        ])
        .await;

        let results = retriever
            .hybrid_search("LCOE methodology", 2, 0.7, 0.3)
            .await
            .unwrap();
        assert_eq!(results[0].content.id, "exact");
        assert!(results[0].relevance_explanation.contains("hybrid score"));
    }

    #[tokio::test]
    async fn hybrid_search_normalizes_weights() {
        let retriever = make_retriever(&[make_item(
            "a",
            "Solar",
            "solar panels",
            ContentType::BlogPost,
            None,
        )])
        .await;

        let normalized = retriever
            .hybrid_search("solar panels", 1, 0.7, 0.3)
            .await
            .unwrap();
        let unnormalized = retriever
            .hybrid_search("solar panels", 1, 7.0, 3.0)
            .await
            .unwrap();
        assert!(
            (normalized[0].similarity_score - unnormalized[0].similarity_score).abs() < 1e-9
        );
    }

    #[tokio::test]
    async fn brand_examples_respect_score_floor() {
        let retriever = make_retriever(&[]).await;
        let brand_collection = retriever.config().brand_collection.clone();
        retriever
            .index()
            .upsert(
                &brand_collection,
                &[
                    make_item(
                        "good",
                        "Exemplar",
                        "sustainable innovation delivers measurable ROI",
                        ContentType::BlogPost,
                        Some(0.92),
                    ),
                    make_item(
                        "weak",
                        "Weak exemplar",
                        "sustainable innovation delivers measurable ROI",
                        ContentType::BlogPost,
                        Some(0.4),
                    ),
                ],
            )
            .await
            .unwrap();

        let results = retriever
            .retrieve_brand_voice_examples("sustainable innovation measurable ROI", 5)
            .await
            .unwrap();
        assert!(results.iter().any(|r| r.content.id == "good"));
        assert!(results.iter().all(|r| r.content.id != "weak"));
    }
}
