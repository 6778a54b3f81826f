//! Bucketed filesystem loader.
//!
//! Walks `<root>/base`, `<root>/public` and `<root>/private`, returning one
//! [`Document`] per file that matches the configured include globs. A bucket
//! directory that does not exist contributes nothing; any other I/O error
//! aborts the scan.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::{Bucket, Document};

/// Load every matching document under the corpus root.
///
/// Buckets are visited in [`Bucket::ALL`] order and files are sorted by
/// relative path within each bucket, so the output order is reproducible.
pub fn load_documents(corpus: &CorpusConfig) -> Result<Vec<Document>> {
    let include_set = build_globset(&corpus.include_globs)?;
    let mut docs = Vec::new();

    for bucket in Bucket::ALL {
        let mut bucket_docs = load_bucket(corpus, bucket, &include_set)?;
        debug!(bucket = %bucket, files = bucket_docs.len(), "scanned bucket");
        docs.append(&mut bucket_docs);
    }

    Ok(docs)
}

fn load_bucket(corpus: &CorpusConfig, bucket: Bucket, include_set: &GlobSet) -> Result<Vec<Document>> {
    let dir = corpus.root.join(bucket.as_str());
    match std::fs::metadata(&dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => bail!("Bucket path is not a directory: {}", dir.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "bucket directory absent, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to access bucket: {}", dir.display()))
        }
    }

    let mut docs = Vec::new();
    let walker = WalkDir::new(&dir)
        .follow_links(corpus.follow_symlinks)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&dir).unwrap_or(path);
        let rel_str = to_slash(relative);

        if !include_set.is_match(&rel_str) {
            continue;
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        docs.push(Document {
            path: path.to_path_buf(),
            source: format!("{}/{}", bucket.as_str(), rel_str),
            bucket,
            text,
        });
    }

    // Sort for deterministic ordering
    docs.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(docs)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
