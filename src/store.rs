//! The index store: ingestion (`build`) and bucket-scoped retrieval (`query`).
//!
//! # Build
//!
//! ```text
//! load_documents ─▶ chunk_document ─▶ candidate set C
//!                                        │
//!     ┌──────────────────────────────────┼────────────────────────────┐
//!     ▼                                  ▼                            ▼
//!  cleanup: stored − C            upsert C (no-op on          diff: C − embedded
//!  (500 ids / statement)          conflict, one tx)                   │
//!                                                                     ▼
//!                                             one embed call + one tx per batch
//! ```
//!
//! Chunk ids are content addresses, so an unchanged corpus produces an empty
//! diff and the second build makes no provider calls. Each embedding batch
//! commits on its own; a failure leaves earlier batches in place and the next
//! build resumes with whatever is still missing.
//!
//! # Query
//!
//! Embeds the query text once, loads every embedded chunk in the allowed
//! buckets (in insertion order), and ranks them with [`rank::top_k`].

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunk::{chunk_document, DEFAULT_MAX_CHARS};
use crate::config::{Config, CorpusConfig};
use crate::db;
use crate::embedding::{self, Embedder};
use crate::loader::load_documents;
use crate::migrate::run_migrations;
use crate::models::{Bucket, BuildReport, Chunk, EmbeddingRecord, ScoredChunk};
use crate::rank::{self, Candidate};
use crate::stats::{self, IndexStats};

/// Maximum number of ids bound into a single `IN (...)` statement.
pub const ID_BATCH_SIZE: usize = 500;

/// Default number of texts sent per embedding call.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 96;

/// What a build would do, computed without writing or calling the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    pub documents: usize,
    pub chunks: usize,
    pub stale: usize,
    pub pending_embeddings: usize,
}

struct CandidateSet {
    documents: usize,
    chunks: Vec<Chunk>,
    ids: HashSet<String>,
}

/// SQLite-backed chunk + embedding index.
pub struct IndexStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    max_chars: usize,
    embed_batch_size: usize,
}

impl IndexStore {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            pool,
            embedder,
            max_chars: DEFAULT_MAX_CHARS,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    /// Connect to the configured database and embedding provider.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.db).await?;
        let embedder = embedding::create_embedder(&config.embedding)?;
        Ok(Self::open_with(config, pool, embedder))
    }

    /// Like [`open`](Self::open) but with caller-supplied pool and provider.
    pub fn open_with(config: &Config, pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(pool, embedder)
            .with_max_chars(config.chunking.max_chars)
            .with_embed_batch_size(config.embedding.batch_size)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Bring the index in line with the corpus on disk.
    ///
    /// Fatal on any filesystem, store, or provider error. Work committed
    /// before the failure (cleanup, upsert, earlier embedding batches) stays.
    pub async fn build(&self, corpus: &CorpusConfig) -> Result<BuildReport> {
        run_migrations(&self.pool).await?;

        let candidates = self.candidate_set(corpus)?;
        let mut report = BuildReport {
            documents: candidates.documents,
            chunks: candidates.chunks.len(),
            ..BuildReport::default()
        };

        let stored = self.stored_ids().await?;
        let stale = stale_ids(&stored, &candidates.ids);
        report.stale_removed = self.remove_chunks(&stale).await?;

        report.inserted = self.upsert_chunks(&candidates.chunks).await?;

        let missing = self.missing_embeddings(&candidates.chunks).await?;
        if missing.is_empty() {
            debug!("all chunks already embedded");
        } else {
            let (embedded, calls) = self.embed_chunks(&missing).await?;
            report.embedded = embedded;
            report.embed_calls = calls;
        }

        info!(
            documents = report.documents,
            chunks = report.chunks,
            stale_removed = report.stale_removed,
            inserted = report.inserted,
            embedded = report.embedded,
            embed_calls = report.embed_calls,
            "index build complete"
        );

        Ok(report)
    }

    /// Compute what [`build`](Self::build) would do, without side effects.
    pub async fn plan(&self, corpus: &CorpusConfig) -> Result<BuildPlan> {
        let candidates = self.candidate_set(corpus)?;
        let mut plan = BuildPlan {
            documents: candidates.documents,
            chunks: candidates.chunks.len(),
            ..BuildPlan::default()
        };

        if !self.schema_exists().await? {
            plan.pending_embeddings = candidates.chunks.len();
            return Ok(plan);
        }

        let stored = self.stored_ids().await?;
        plan.stale = stale_ids(&stored, &candidates.ids).len();
        plan.pending_embeddings = self.missing_embeddings(&candidates.chunks).await?.len();
        Ok(plan)
    }

    /// Return the texts of the `k` chunks most similar to `text`, restricted
    /// to `buckets`. An empty list is a valid result.
    pub async fn query(&self, text: &str, k: usize, buckets: &[Bucket]) -> Result<Vec<String>> {
        Ok(self
            .query_scored(text, k, buckets)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    /// Like [`query`](Self::query), but keeps ids and similarity scores.
    pub async fn query_scored(
        &self,
        text: &str,
        k: usize,
        buckets: &[Bucket],
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 || buckets.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embedding::embed_one(self.embedder.as_ref(), text)
            .await
            .context("Failed to embed query")?;

        let candidates = self
            .fetch_candidates(buckets)
            .await
            .context("Failed to load candidate vectors")?;

        let mismatched = candidates
            .iter()
            .filter(|c| c.vector.len() != query_vec.len())
            .count();
        if mismatched > 0 {
            warn!(
                mismatched,
                query_dims = query_vec.len(),
                "stored vectors with a different dimensionality score 0.0"
            );
        }

        Ok(rank::top_k(&query_vec, candidates, k))
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        stats::collect_stats(&self.pool).await
    }

    // ============ Build steps ============

    fn candidate_set(&self, corpus: &CorpusConfig) -> Result<CandidateSet> {
        let docs = load_documents(corpus)?;
        let mut ids = HashSet::new();
        let mut chunks = Vec::new();

        for doc in &docs {
            for chunk in chunk_document(doc, self.max_chars) {
                // Repeated text within one document maps to one id
                if ids.insert(chunk.id.clone()) {
                    chunks.push(chunk);
                }
            }
        }

        Ok(CandidateSet {
            documents: docs.len(),
            chunks,
            ids,
        })
    }

    async fn schema_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('chunks', 'embeddings')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count == 2)
    }

    async fn stored_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM chunks")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read stored chunk ids")?;
        Ok(ids.into_iter().collect())
    }

    /// Delete chunks (and their embeddings) in one transaction, at most
    /// [`ID_BATCH_SIZE`] ids per statement.
    async fn remove_chunks(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;

        for batch in ids.chunks(ID_BATCH_SIZE) {
            let marks = placeholders(batch.len());

            let sql = format!("DELETE FROM embeddings WHERE id IN ({})", marks);
            let mut query = sqlx::query(&sql);
            for id in batch {
                query = query.bind(id);
            }
            query.execute(&mut *tx).await?;

            let sql = format!("DELETE FROM chunks WHERE id IN ({})", marks);
            let mut query = sqlx::query(&sql);
            for id in batch {
                query = query.bind(id);
            }
            removed += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await.context("Failed to commit stale chunk cleanup")?;
        debug!(removed, "removed stale chunks");
        Ok(removed as usize)
    }

    /// Insert every candidate chunk; existing ids are left untouched.
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for chunk in chunks {
            let result = sqlx::query(
                r#"
                INSERT INTO chunks (id, bucket, source, text)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(&chunk.id)
            .bind(chunk.bucket.as_str())
            .bind(&chunk.source)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert chunk from {}", chunk.source))?;
            inserted += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit chunk upsert")?;
        Ok(inserted as usize)
    }

    /// Candidate chunks with no stored vector, in candidate order.
    async fn missing_embeddings<'a>(&self, chunks: &'a [Chunk]) -> Result<Vec<&'a Chunk>> {
        let mut missing = Vec::new();

        for batch in chunks.chunks(ID_BATCH_SIZE) {
            let sql = format!(
                "SELECT id FROM embeddings WHERE id IN ({})",
                placeholders(batch.len())
            );
            let mut query = sqlx::query_scalar::<_, String>(&sql);
            for chunk in batch {
                query = query.bind(&chunk.id);
            }
            let present: HashSet<String> = query.fetch_all(&self.pool).await?.into_iter().collect();

            missing.extend(batch.iter().filter(|c| !present.contains(&c.id)));
        }

        Ok(missing)
    }

    /// One provider call and one transaction per batch. Returns
    /// `(vectors stored, provider calls made)`.
    async fn embed_chunks(&self, chunks: &[&Chunk]) -> Result<(usize, usize)> {
        let model = self.embedder.model_name().to_string();
        let total_batches = chunks.len().div_ceil(self.embed_batch_size);
        let mut embedded = 0usize;
        let mut calls = 0usize;

        for (n, batch) in chunks.chunks(self.embed_batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            calls += 1;
            let vectors = self.embedder.embed(&texts).await.with_context(|| {
                format!("Embedding batch {}/{} failed", n + 1, total_batches)
            })?;
            embedding::check_batch(batch.len(), &vectors)
                .with_context(|| format!("Embedding batch {}/{} rejected", n + 1, total_batches))?;

            let records: Vec<EmbeddingRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| EmbeddingRecord {
                    id: chunk.id.clone(),
                    model: model.clone(),
                    vector,
                })
                .collect();

            let mut tx = self.pool.begin().await?;
            for record in &records {
                sqlx::query(
                    r#"
                    INSERT INTO embeddings (id, model, dims, vector)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        model = excluded.model,
                        dims = excluded.dims,
                        vector = excluded.vector
                    "#,
                )
                .bind(&record.id)
                .bind(&record.model)
                .bind(record.vector.len() as i64)
                .bind(embedding::vec_to_blob(&record.vector))
                .execute(&mut *tx)
                .await?;
            }
            tx.commit()
                .await
                .with_context(|| format!("Failed to commit embedding batch {}", n + 1))?;

            embedded += batch.len();
            debug!(
                batch = n + 1,
                of = total_batches,
                size = batch.len(),
                "stored embedding batch"
            );
        }

        Ok((embedded, calls))
    }

    // ============ Query steps ============

    async fn fetch_candidates(&self, buckets: &[Bucket]) -> Result<Vec<Candidate>> {
        let sql = format!(
            r#"
            SELECT c.id, c.text, e.vector
            FROM chunks c
            JOIN embeddings e ON e.id = c.id
            WHERE c.bucket IN ({})
            ORDER BY c.rowid
            "#,
            placeholders(buckets.len())
        );
        let mut query = sqlx::query(&sql);
        for bucket in buckets {
            query = query.bind(bucket.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Candidate> {
                let blob: Vec<u8> = row.try_get("vector")?;
                Ok(Candidate {
                    id: row.try_get("id")?,
                    text: row.try_get("text")?,
                    vector: embedding::blob_to_vec(&blob),
                })
            })
            .collect()
    }
}

fn stale_ids(stored: &HashSet<String>, current: &HashSet<String>) -> Vec<String> {
    let mut stale: Vec<String> = stored.difference(current).cloned().collect();
    stale.sort();
    stale
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
