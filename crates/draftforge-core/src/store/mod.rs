//! Storage abstraction for the embedding index.
//!
//! The [`IndexStore`] trait defines all storage operations needed by the
//! index and retrieval layers, enabling pluggable backends (SQLite,
//! in-memory). Implementations must be `Send + Sync` to serve many
//! concurrent queries from one server process.
//!
//! Consistency contract: an upsert replaces an entry's item, vector, and
//! content hash as one unit. A concurrent reader sees either the old or
//! the new entry for a given id, never a half-written vector.

pub mod memory;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::ContentItem;

/// One stored unit: the query-only copy of a [`ContentItem`] plus its
/// derived embedding vector and the hash of the embedded text.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub item: ContentItem,
    pub vector: Vec<f32>,
    pub content_hash: String,
}

/// A candidate returned from vector search, before threshold filtering.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub item: ContentItem,
    /// Raw cosine similarity from the backend, in `[-1, 1]`.
    pub raw_score: f64,
}

/// Observability summary for one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub items: u64,
    /// Mean of stored brand-voice scores, when any are present.
    pub avg_brand_voice_score: Option<f64>,
    /// Item count per content type.
    pub content_types: BTreeMap<String, u64>,
    /// Vector dimensionality, when at least one entry exists.
    pub dims: Option<usize>,
}

/// A predicate over one addressable field of an item.
#[derive(Debug, Clone)]
pub enum FieldPredicate {
    /// Exact match against the JSON representation of the field.
    Eq(serde_json::Value),
    /// Numeric lower bound (inclusive).
    Gte(f64),
    /// Numeric upper bound (inclusive).
    Lte(f64),
}

/// Conjunction of field predicates applied during search.
///
/// Addressable fields: `content_type`, `brand_voice_score`, `tags`
/// (matches when the tag list contains the value), and any key of the
/// item's open metadata map.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub predicates: Vec<(String, FieldPredicate)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, predicate: FieldPredicate) -> Self {
        self.predicates.push((field.into(), predicate));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    fn field_value(item: &ContentItem, field: &str) -> Option<serde_json::Value> {
        match field {
            "content_type" => Some(serde_json::Value::String(
                item.content_type.as_str().to_string(),
            )),
            "brand_voice_score" => item
                .brand_voice_score
                .and_then(|s| serde_json::Number::from_f64(s).map(serde_json::Value::Number)),
            "id" => Some(serde_json::Value::String(item.id.clone())),
            "title" => Some(serde_json::Value::String(item.title.clone())),
            other => item.metadata.get(other).cloned(),
        }
    }

    /// Whether an item passes every predicate.
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.predicates.iter().all(|(field, predicate)| {
            if field == "tags" {
                return match predicate {
                    FieldPredicate::Eq(serde_json::Value::String(tag)) => {
                        item.tags.iter().any(|t| t == tag)
                    }
                    _ => false,
                };
            }
            let value = Self::field_value(item, field);
            match (predicate, value) {
                (FieldPredicate::Eq(expected), Some(actual)) => *expected == actual,
                (FieldPredicate::Gte(bound), Some(actual)) => {
                    actual.as_f64().map(|v| v >= *bound).unwrap_or(false)
                }
                (FieldPredicate::Lte(bound), Some(actual)) => {
                    actual.as_f64().map(|v| v <= *bound).unwrap_or(false)
                }
                (_, None) => false,
            }
        })
    }
}

/// Abstract storage backend for the embedding index.
///
/// All operations are async (via `async-trait`) so native backends can
/// do I/O; the in-memory implementation returns immediately-ready
/// futures.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Create a named collection if absent. Idempotent: creating an
    /// existing collection is a no-op, not an error.
    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Whether a collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Insert or replace one entry, keyed by item id. Atomic per entry.
    async fn upsert_entry(&self, collection: &str, entry: &IndexEntry) -> Result<()>;

    /// Fetch one entry (item + vector) by id.
    async fn get_entry(&self, collection: &str, id: &str) -> Result<Option<IndexEntry>>;

    /// Brute-force cosine search over the collection, restricted to
    /// entries passing `filter`, sorted descending by raw score and
    /// truncated to `limit`.
    async fn vector_search(
        &self,
        collection: &str,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>>;

    /// Aggregate statistics for a collection.
    async fn stats(&self, collection: &str) -> Result<CollectionStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn make_item(id: &str, score: Option<f64>) -> ContentItem {
        let mut metadata = BTreeMap::new();
        metadata.insert("author".to_string(), serde_json::json!("sofia"));
        metadata.insert("views".to_string(), serde_json::json!(1200));
        ContentItem {
            id: id.to_string(),
            title: "Solar ROI".into(),
            text: "body".into(),
            content_type: ContentType::BlogPost,
            tags: vec!["solar".into(), "roi".into()],
            metadata,
            brand_voice_score: score,
        }
    }

    #[test]
    fn filter_exact_match_on_content_type() {
        let filter = MetadataFilter::new().with(
            "content_type",
            FieldPredicate::Eq(serde_json::json!("blog_post")),
        );
        assert!(filter.matches(&make_item("a", None)));

        let filter = MetadataFilter::new().with(
            "content_type",
            FieldPredicate::Eq(serde_json::json!("social_media")),
        );
        assert!(!filter.matches(&make_item("a", None)));
    }

    #[test]
    fn filter_range_on_brand_voice_score() {
        let filter =
            MetadataFilter::new().with("brand_voice_score", FieldPredicate::Gte(0.8));
        assert!(filter.matches(&make_item("a", Some(0.9))));
        assert!(!filter.matches(&make_item("a", Some(0.5))));
        // Missing field never passes a range predicate.
        assert!(!filter.matches(&make_item("a", None)));
    }

    #[test]
    fn filter_tags_contains() {
        let filter =
            MetadataFilter::new().with("tags", FieldPredicate::Eq(serde_json::json!("solar")));
        assert!(filter.matches(&make_item("a", None)));

        let filter =
            MetadataFilter::new().with("tags", FieldPredicate::Eq(serde_json::json!("wind")));
        assert!(!filter.matches(&make_item("a", None)));
    }

    #[test]
    fn filter_metadata_fields_and_conjunction() {
        let filter = MetadataFilter::new()
            .with("author", FieldPredicate::Eq(serde_json::json!("sofia")))
            .with("views", FieldPredicate::Gte(1000.0));
        assert!(filter.matches(&make_item("a", None)));

        let filter = MetadataFilter::new()
            .with("author", FieldPredicate::Eq(serde_json::json!("sofia")))
            .with("views", FieldPredicate::Lte(100.0));
        assert!(!filter.matches(&make_item("a", None)));
    }
}
