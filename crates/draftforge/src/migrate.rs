use anyhow::Result;
use sqlx::SqlitePool;

/// Create the index schema if absent. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Named collections; dims is fixed per collection once set.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            dims INTEGER,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per indexed content item.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            content_type TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            metadata_json TEXT NOT NULL DEFAULT '{}',
            brand_voice_score REAL,
            content_hash TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Embedding vectors, 1:1 with entries, stored as f32 LE blobs.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entry_vectors (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dims INTEGER NOT NULL,
            model TEXT NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection, id) REFERENCES entries(collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entries_content_type ON entries(collection, content_type)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
