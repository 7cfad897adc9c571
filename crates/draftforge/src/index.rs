//! The embedding index: durable mapping from content id to (text,
//! metadata, embedding vector), organized into named collections.
//!
//! Wraps an [`IndexStore`] backend with the embedding step: upserts
//! embed item text in batches, queries embed the query text, and both
//! convert backend cosine scores into the `[0, 1]` similarity contract.
//! Re-upserting unchanged text is detected via content hash and skips
//! the embedding call.

use std::sync::Arc;

use tracing::{debug, warn};

use draftforge_core::embedding::{content_hash, cosine_to_similarity};
use draftforge_core::error::{EngineError, ItemFailure};
use draftforge_core::models::ContentItem;
use draftforge_core::store::{
    CollectionStats, IndexEntry, IndexStore, MetadataFilter, ScoredEntry,
};

use crate::config::EmbeddingConfig;
use crate::embedding::embed_texts;

/// A scored query hit with the backend score already normalized.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub item: ContentItem,
    /// Similarity in `[0, 1]`, 1 = identical.
    pub similarity: f64,
}

/// Report for an upsert batch that wrote everything it attempted.
#[derive(Debug, Clone)]
pub struct UpsertReport {
    pub written: usize,
    pub skipped_unchanged: usize,
}

pub struct EmbeddingIndex {
    store: Arc<dyn IndexStore>,
    embedding: EmbeddingConfig,
}

impl EmbeddingIndex {
    pub fn new(store: Arc<dyn IndexStore>, embedding: EmbeddingConfig) -> Self {
        Self { store, embedding }
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    async fn require_collection(&self, name: &str) -> Result<(), EngineError> {
        if !self.store.collection_exists(name).await? {
            return Err(EngineError::CollectionNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Create a named collection if absent. Idempotent.
    pub async fn create_collection(&self, name: &str) -> Result<(), EngineError> {
        self.store.create_collection(name).await?;
        Ok(())
    }

    /// Insert or replace items, computing embeddings in batches.
    ///
    /// Embedding failures never corrupt the batch: items whose
    /// embedding fails are reported in [`EngineError::IndexWrite`] while
    /// every other item is committed. Items whose text is unchanged
    /// (same content hash as the stored entry) skip the embedding call.
    pub async fn upsert(
        &self,
        collection: &str,
        items: &[ContentItem],
    ) -> Result<UpsertReport, EngineError> {
        self.require_collection(collection).await?;

        let mut written = 0usize;
        let mut skipped_unchanged = 0usize;
        let mut failed: Vec<ItemFailure> = Vec::new();

        // Partition into unchanged items (reusable vector) and items
        // that need a fresh embedding.
        let mut to_embed: Vec<&ContentItem> = Vec::new();
        for item in items {
            let hash = content_hash(&item.embedding_text());
            let existing = self.store.get_entry(collection, &item.id).await?;
            match existing {
                Some(entry) if entry.content_hash == hash => {
                    // Text unchanged: keep the vector, refresh item fields.
                    self.store
                        .upsert_entry(
                            collection,
                            &IndexEntry {
                                item: item.clone(),
                                vector: entry.vector,
                                content_hash: hash,
                            },
                        )
                        .await?;
                    skipped_unchanged += 1;
                    written += 1;
                }
                _ => to_embed.push(item),
            }
        }

        for batch in to_embed.chunks(self.embedding.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|i| i.embedding_text()).collect();
            match embed_texts(&self.embedding, &texts).await {
                Ok(vectors) => {
                    for (item, vector) in batch.iter().zip(vectors) {
                        if vector.is_empty() {
                            failed.push(ItemFailure {
                                id: item.id.clone(),
                                reason: "embedding backend returned an empty vector".into(),
                            });
                            continue;
                        }
                        self.write_entry(collection, item, vector, &mut written, &mut failed)
                            .await;
                    }
                }
                Err(batch_err) => {
                    // Isolate the failing item(s): retry one by one so a
                    // single poisoned input can't sink its batch mates.
                    debug!(error = %batch_err, "batch embedding failed, retrying per item");
                    for item in batch {
                        match embed_texts(&self.embedding, &[item.embedding_text()]).await {
                            Ok(mut vectors) if !vectors.is_empty() => {
                                let vector = vectors.remove(0);
                                self.write_entry(
                                    collection,
                                    item,
                                    vector,
                                    &mut written,
                                    &mut failed,
                                )
                                .await;
                            }
                            Ok(_) => failed.push(ItemFailure {
                                id: item.id.clone(),
                                reason: "embedding backend returned no vector".into(),
                            }),
                            Err(e) => failed.push(ItemFailure {
                                id: item.id.clone(),
                                reason: e.to_string(),
                            }),
                        }
                    }
                }
            }
        }

        if failed.is_empty() {
            Ok(UpsertReport {
                written,
                skipped_unchanged,
            })
        } else {
            warn!(
                collection,
                written,
                failed = failed.len(),
                "upsert committed partially"
            );
            Err(EngineError::IndexWrite {
                attempted: items.len(),
                written,
                failed,
            })
        }
    }

    async fn write_entry(
        &self,
        collection: &str,
        item: &ContentItem,
        vector: Vec<f32>,
        written: &mut usize,
        failed: &mut Vec<ItemFailure>,
    ) {
        let entry = IndexEntry {
            content_hash: content_hash(&item.embedding_text()),
            item: item.clone(),
            vector,
        };
        match self.store.upsert_entry(collection, &entry).await {
            Ok(()) => *written += 1,
            Err(e) => failed.push(ItemFailure {
                id: item.id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// k-nearest-neighbor query over a collection.
    ///
    /// Embeds `query_text`, searches entries passing `filter`, converts
    /// the backend metric to similarity in `[0, 1]`, drops hits below
    /// `similarity_threshold`, and returns the top `k` in descending
    /// order. An empty result is not an error.
    pub async fn query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
        similarity_threshold: f64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, EngineError> {
        self.require_collection(collection).await?;

        let query_vec = crate::embedding::embed_query(&self.embedding, query_text)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        self.query_by_vector(collection, &query_vec, k, similarity_threshold, filter)
            .await
    }

    /// Same as [`query`](Self::query) but with a pre-computed vector —
    /// used by similar-item recommendation to avoid re-embedding.
    pub async fn query_by_vector(
        &self,
        collection: &str,
        query_vec: &[f32],
        k: usize,
        similarity_threshold: f64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, EngineError> {
        self.require_collection(collection).await?;

        // Over-fetch so threshold filtering doesn't starve the result.
        let candidates: Vec<ScoredEntry> = self
            .store
            .vector_search(collection, query_vec, k.saturating_mul(3).max(k), filter)
            .await?;

        let mut hits: Vec<QueryHit> = candidates
            .into_iter()
            .map(|c| QueryHit {
                similarity: cosine_to_similarity(c.raw_score as f32),
                item: c.item,
            })
            .filter(|h| h.similarity >= similarity_threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Fetch one item and its stored vector.
    pub async fn get_entry(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<IndexEntry>, EngineError> {
        self.require_collection(collection).await?;
        Ok(self.store.get_entry(collection, id).await?)
    }

    /// Item count and aggregate metadata for observability.
    pub async fn stats(&self, collection: &str) -> Result<CollectionStats, EngineError> {
        self.require_collection(collection).await?;
        Ok(self.store.stats(collection).await?)
    }
}
