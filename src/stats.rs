//! Index statistics and health overview.
//!
//! Provides a quick summary of what's indexed: chunk counts and embedding
//! coverage per bucket, plus which models produced the stored vectors. Used
//! by `kidx stats` to confirm that builds are doing what they should.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

/// Per-bucket chunk and embedding counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketStats {
    pub bucket: String,
    pub chunks: i64,
    pub embedded: i64,
}

/// Vector count for one (model, dims) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStats {
    pub model: String,
    pub dims: i64,
    pub vectors: i64,
}

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub chunks: i64,
    pub embedded: i64,
    pub buckets: Vec<BucketStats>,
    pub models: Vec<ModelStats>,
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<IndexStats> {
    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;

    let embedded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
        .fetch_one(pool)
        .await?;

    let bucket_rows = sqlx::query(
        r#"
        SELECT
            c.bucket,
            COUNT(c.id) AS chunk_count,
            COUNT(e.id) AS embedded_count
        FROM chunks c
        LEFT JOIN embeddings e ON e.id = c.id
        GROUP BY c.bucket
        ORDER BY c.bucket
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut buckets = Vec::with_capacity(bucket_rows.len());
    for row in &bucket_rows {
        buckets.push(BucketStats {
            bucket: row.try_get("bucket")?,
            chunks: row.try_get("chunk_count")?,
            embedded: row.try_get("embedded_count")?,
        });
    }

    let model_rows = sqlx::query(
        "SELECT model, dims, COUNT(*) AS vectors FROM embeddings GROUP BY model, dims ORDER BY model",
    )
    .fetch_all(pool)
    .await?;

    let mut models = Vec::with_capacity(model_rows.len());
    for row in &model_rows {
        models.push(ModelStats {
            model: row.try_get("model")?,
            dims: row.try_get("dims")?,
            vectors: row.try_get("vectors")?,
        });
    }

    Ok(IndexStats {
        chunks,
        embedded,
        buckets,
        models,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    crate::migrate::run_migrations(&pool).await?;
    let stats = collect_stats(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Knowledge Index Stats");
    println!("=====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Chunks:      {}", stats.chunks);
    println!(
        "  Embedded:    {} / {} ({}%)",
        stats.embedded,
        stats.chunks,
        percent(stats.embedded, stats.chunks)
    );

    if !stats.buckets.is_empty() {
        println!();
        println!("  {:<10} {:>8} {:>10}", "BUCKET", "CHUNKS", "EMBEDDED");
        for b in &stats.buckets {
            println!("  {:<10} {:>8} {:>10}", b.bucket, b.chunks, b.embedded);
        }
    }

    if !stats.models.is_empty() {
        println!();
        println!("  {:<32} {:>6} {:>8}", "MODEL", "DIMS", "VECTORS");
        for m in &stats.models {
            println!("  {:<32} {:>6} {:>8}", m.model, m.dims, m.vectors);
        }
    }

    pool.close().await;
    Ok(())
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 4), 25);
    }
}
