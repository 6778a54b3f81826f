use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Create the `chunks` and `embeddings` relations if they do not exist.
///
/// Safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            bucket TEXT NOT NULL,
            source TEXT NOT NULL,
            text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create chunks table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            id TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            vector BLOB NOT NULL,
            FOREIGN KEY (id) REFERENCES chunks(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create embeddings table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_bucket ON chunks(bucket)")
        .execute(pool)
        .await
        .context("Failed to create bucket index")?;

    Ok(())
}
