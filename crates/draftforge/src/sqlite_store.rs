//! SQLite-backed [`IndexStore`] implementation.
//!
//! Maps each store operation to SQL against the schema in
//! [`crate::migrate`]. Entry writes (item row + vector row) happen in a
//! single transaction so concurrent readers never observe a
//! half-written vector.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use draftforge_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use draftforge_core::models::{ContentItem, ContentType};
use draftforge_core::store::{
    CollectionStats, IndexEntry, IndexStore, MetadataFilter, ScoredEntry,
};

/// SQLite implementation of the [`IndexStore`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
    model: String,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, model: impl Into<String>) -> Self {
        Self {
            pool,
            model: model.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn require_collection(&self, name: &str) -> Result<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM collections WHERE name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            anyhow::bail!("collection not found: {}", name);
        }
        Ok(())
    }
}

fn content_type_from_str(s: &str) -> Result<ContentType> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown content type in database: {}", s))
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<ContentItem> {
    let tags_json: String = row.get("tags_json");
    let metadata_json: String = row.get("metadata_json");
    let content_type: String = row.get("content_type");

    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let metadata: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&metadata_json).unwrap_or_default();

    Ok(ContentItem {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("body"),
        content_type: content_type_from_str(&content_type)?,
        tags,
        metadata,
        brand_voice_score: row.get("brand_voice_score"),
    })
}

#[async_trait]
impl IndexStore for SqliteIndex {
    async fn create_collection(&self, name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO collections (name, dims, created_at) VALUES (?, NULL, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn upsert_entry(&self, collection: &str, entry: &IndexEntry) -> Result<()> {
        self.require_collection(collection).await?;

        let now = chrono::Utc::now().timestamp();
        let item = &entry.item;
        let tags_json = serde_json::to_string(&item.tags)?;
        let metadata_json = serde_json::to_string(&item.metadata)?;
        let blob = vec_to_blob(&entry.vector);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO entries (collection, id, title, body, content_type, tags_json,
                                 metadata_json, brand_voice_score, content_hash, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                content_type = excluded.content_type,
                tags_json = excluded.tags_json,
                metadata_json = excluded.metadata_json,
                brand_voice_score = excluded.brand_voice_score,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.text)
        .bind(item.content_type.as_str())
        .bind(&tags_json)
        .bind(&metadata_json)
        .bind(item.brand_voice_score)
        .bind(&entry.content_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO entry_vectors (collection, id, embedding, dims, model)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                embedding = excluded.embedding,
                dims = excluded.dims,
                model = excluded.model
            "#,
        )
        .bind(collection)
        .bind(&item.id)
        .bind(&blob)
        .bind(entry.vector.len() as i64)
        .bind(&self.model)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE collections SET dims = ? WHERE name = ? AND dims IS NULL")
            .bind(entry.vector.len() as i64)
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_entry(&self, collection: &str, id: &str) -> Result<Option<IndexEntry>> {
        self.require_collection(collection).await?;

        let row = sqlx::query(
            r#"
            SELECT e.id, e.title, e.body, e.content_type, e.tags_json, e.metadata_json,
                   e.brand_voice_score, e.content_hash, v.embedding
            FROM entries e
            JOIN entry_vectors v ON v.collection = e.collection AND v.id = e.id
            WHERE e.collection = ? AND e.id = ?
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let blob: Vec<u8> = row.get("embedding");
        Ok(Some(IndexEntry {
            item: row_to_item(&row)?,
            vector: blob_to_vec(&blob),
            content_hash: row.get("content_hash"),
        }))
    }

    async fn vector_search(
        &self,
        collection: &str,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        self.require_collection(collection).await?;

        let rows = sqlx::query(
            r#"
            SELECT e.id, e.title, e.body, e.content_type, e.tags_json, e.metadata_json,
                   e.brand_voice_score, e.content_hash, v.embedding
            FROM entries e
            JOIN entry_vectors v ON v.collection = e.collection AND v.id = e.id
            WHERE e.collection = ?
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<ScoredEntry> = Vec::with_capacity(rows.len());
        for row in &rows {
            let item = row_to_item(row)?;
            if let Some(f) = filter {
                if !f.matches(&item) {
                    continue;
                }
            }
            let blob: Vec<u8> = row.get("embedding");
            let vector = blob_to_vec(&blob);
            candidates.push(ScoredEntry {
                raw_score: cosine_similarity(query_vec, &vector) as f64,
                item,
            });
        }

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
        self.require_collection(collection).await?;

        let rows = sqlx::query(
            "SELECT content_type, brand_voice_score FROM entries WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut content_types: BTreeMap<String, u64> = BTreeMap::new();
        let mut score_sum = 0.0;
        let mut score_count = 0u64;

        for row in &rows {
            let ct: String = row.get("content_type");
            *content_types.entry(ct).or_insert(0) += 1;
            if let Some(score) = row.get::<Option<f64>, _>("brand_voice_score") {
                score_sum += score;
                score_count += 1;
            }
        }

        let dims: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;

        Ok(CollectionStats {
            items: rows.len() as u64,
            avg_brand_voice_score: (score_count > 0).then(|| score_sum / score_count as f64),
            content_types,
            dims: dims.map(|d| d as usize),
        })
    }
}
