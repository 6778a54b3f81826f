//! Core data models used throughout the index.
//!
//! These types represent the documents, chunks, and embedding records that
//! flow through the build and query pipelines.

use anyhow::{bail, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Named visibility partition of the corpus.
///
/// Each bucket maps to one fixed subdirectory of the corpus root. Matching
/// is by exact label; there is no hierarchy between buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Base,
    Public,
    Private,
}

impl Bucket {
    /// All buckets, in the order the loader visits them.
    pub const ALL: [Bucket; 3] = [Bucket::Base, Bucket::Public, Bucket::Private];

    /// The literal label stored in the `chunks.bucket` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Base => "base",
            Bucket::Public => "public",
            Bucket::Private => "private",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "base" => Ok(Bucket::Base),
            "public" => Ok(Bucket::Public),
            "private" => Ok(Bucket::Private),
            other => bail!(
                "Unknown bucket: '{}'. Must be base, public, or private.",
                other
            ),
        }
    }
}

/// Caller-facing access mode, resolved to the set of buckets a query may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Anonymous callers: `base` + `public`.
    #[default]
    Public,
    /// Authenticated callers: `base` + `private`.
    Private,
}

impl Visibility {
    pub fn buckets(&self) -> &'static [Bucket] {
        match self {
            Visibility::Public => &[Bucket::Base, Bucket::Public],
            Visibility::Private => &[Bucket::Base, Bucket::Private],
        }
    }
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => bail!("Unknown mode: '{}'. Must be public or private.", other),
        }
    }
}

/// Raw file read from a bucket directory. Never persisted.
#[derive(Debug, Clone)]
pub struct Document {
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the corpus root, `/`-separated (e.g. `base/hours.md`).
    pub source: String,
    pub bucket: Bucket,
    pub text: String,
}

/// A content-addressed chunk of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub bucket: Bucket,
    pub source: String,
    pub text: String,
}

/// A stored embedding vector, keyed by its chunk id.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub id: String,
    pub model: String,
    pub vector: Vec<f32>,
}

/// A ranked query hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Counters reported by a completed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub stale_removed: usize,
    pub inserted: usize,
    pub embedded: usize,
    pub embed_calls: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_labels_roundtrip() {
        for bucket in Bucket::ALL {
            assert_eq!(bucket.as_str().parse::<Bucket>().unwrap(), bucket);
        }
    }

    #[test]
    fn test_bucket_rejects_unknown_and_case() {
        assert!("Base".parse::<Bucket>().is_err());
        assert!("secret".parse::<Bucket>().is_err());
    }

    #[test]
    fn test_visibility_buckets() {
        assert_eq!(Visibility::Public.buckets(), &[Bucket::Base, Bucket::Public]);
        assert_eq!(
            Visibility::Private.buckets(),
            &[Bucket::Base, Bucket::Private]
        );
        assert!(!Visibility::Public.buckets().contains(&Bucket::Private));
    }
}
