//! In-memory [`IndexStore`] implementation for testing and demos.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Vector
//! search is brute-force cosine similarity over all stored vectors.
//! Entries are replaced whole under the write lock, so readers always
//! observe a complete (item, vector, hash) triple.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;

use super::{CollectionStats, IndexEntry, IndexStore, MetadataFilter, ScoredEntry};

/// In-memory store for tests and demo runs.
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, HashMap<String, IndexEntry>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndex {
    async fn create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let collections = self.collections.read().unwrap();
        Ok(collections.contains_key(name))
    }

    async fn upsert_entry(&self, collection: &str, entry: &IndexEntry) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let entries = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow::anyhow!("collection not found: {}", collection))?;
        entries.insert(entry.item.id.clone(), entry.clone());
        Ok(())
    }

    async fn get_entry(&self, collection: &str, id: &str) -> Result<Option<IndexEntry>> {
        let collections = self.collections.read().unwrap();
        let entries = collections
            .get(collection)
            .ok_or_else(|| anyhow::anyhow!("collection not found: {}", collection))?;
        Ok(entries.get(id).cloned())
    }

    async fn vector_search(
        &self,
        collection: &str,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        let collections = self.collections.read().unwrap();
        let entries = collections
            .get(collection)
            .ok_or_else(|| anyhow::anyhow!("collection not found: {}", collection))?;

        let mut candidates: Vec<ScoredEntry> = entries
            .values()
            .filter(|e| filter.map(|f| f.matches(&e.item)).unwrap_or(true))
            .map(|e| ScoredEntry {
                item: e.item.clone(),
                raw_score: cosine_similarity(query_vec, &e.vector) as f64,
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn stats(&self, collection: &str) -> Result<CollectionStats> {
        let collections = self.collections.read().unwrap();
        let entries = collections
            .get(collection)
            .ok_or_else(|| anyhow::anyhow!("collection not found: {}", collection))?;

        let mut content_types: BTreeMap<String, u64> = BTreeMap::new();
        let mut score_sum = 0.0;
        let mut score_count = 0u64;
        let mut dims = None;

        for entry in entries.values() {
            *content_types
                .entry(entry.item.content_type.as_str().to_string())
                .or_insert(0) += 1;
            if let Some(score) = entry.item.brand_voice_score {
                score_sum += score;
                score_count += 1;
            }
            dims.get_or_insert(entry.vector.len());
        }

        Ok(CollectionStats {
            items: entries.len() as u64,
            avg_brand_voice_score: (score_count > 0).then(|| score_sum / score_count as f64),
            content_types,
            dims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::content_hash;
    use crate::models::{ContentItem, ContentType};

    fn make_entry(id: &str, vector: Vec<f32>, score: Option<f64>) -> IndexEntry {
        let item = ContentItem {
            id: id.to_string(),
            title: format!("title {}", id),
            text: format!("body {}", id),
            content_type: ContentType::BlogPost,
            tags: vec![],
            metadata: Default::default(),
            brand_voice_score: score,
        };
        let hash = content_hash(&item.text);
        IndexEntry {
            item,
            vector,
            content_hash: hash,
        }
    }

    #[tokio::test]
    async fn create_collection_is_idempotent() {
        let store = InMemoryIndex::new();
        store.create_collection("content").await.unwrap();
        store
            .upsert_entry("content", &make_entry("a", vec![1.0, 0.0], None))
            .await
            .unwrap();
        // A second create must not wipe existing entries.
        store.create_collection("content").await.unwrap();
        assert!(store.get_entry("content", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryIndex::new();
        store.create_collection("content").await.unwrap();
        store
            .upsert_entry("content", &make_entry("a", vec![1.0, 0.0], None))
            .await
            .unwrap();
        let mut updated = make_entry("a", vec![0.0, 1.0], None);
        updated.item.text = "revised body".into();
        store.upsert_entry("content", &updated).await.unwrap();

        let stats = store.stats("content").await.unwrap();
        assert_eq!(stats.items, 1);
        let entry = store.get_entry("content", "a").await.unwrap().unwrap();
        assert_eq!(entry.item.text, "revised body");
        assert_eq!(entry.vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn vector_search_orders_and_limits() {
        let store = InMemoryIndex::new();
        store.create_collection("content").await.unwrap();
        store
            .upsert_entry("content", &make_entry("a", vec![1.0, 0.0], None))
            .await
            .unwrap();
        store
            .upsert_entry("content", &make_entry("b", vec![0.7, 0.7], None))
            .await
            .unwrap();
        store
            .upsert_entry("content", &make_entry("c", vec![0.0, 1.0], None))
            .await
            .unwrap();

        let hits = store
            .vector_search("content", &[1.0, 0.0], 2, None)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_collection_errors() {
        let store = InMemoryIndex::new();
        assert!(store.get_entry("missing", "a").await.is_err());
        assert!(store
            .vector_search("missing", &[1.0], 5, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stats_aggregate_scores() {
        let store = InMemoryIndex::new();
        store.create_collection("brand").await.unwrap();
        store
            .upsert_entry("brand", &make_entry("a", vec![1.0], Some(0.9)))
            .await
            .unwrap();
        store
            .upsert_entry("brand", &make_entry("b", vec![1.0], Some(0.7)))
            .await
            .unwrap();
        store
            .upsert_entry("brand", &make_entry("c", vec![1.0], None))
            .await
            .unwrap();

        let stats = store.stats("brand").await.unwrap();
        assert_eq!(stats.items, 3);
        assert!((stats.avg_brand_voice_score.unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(stats.dims, Some(1));
    }
}
