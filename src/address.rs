//! Content addressing for chunks.
//!
//! A chunk id is the SHA-256 digest of `bucket \0 source \0 text`, rendered
//! as lowercase hex. Neither bucket labels nor relative paths can contain a
//! NUL byte and the text is the final field, so distinct tuples can never
//! encode to the same byte string.

use sha2::{Digest, Sha256};

use crate::models::Bucket;

const SEPARATOR: &[u8] = b"\0";

/// Derive the stable id for a chunk.
pub fn chunk_id(bucket: Bucket, source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bucket.as_str().as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(source.as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = chunk_id(Bucket::Base, "base/hours.md", "Our hours are 9-5");
        let b = chunk_id(Bucket::Base, "base/hours.md", "Our hours are 9-5");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_known_digest() {
        // sha256("base\0s\0t")
        let id = chunk_id(Bucket::Base, "s", "t");
        let mut hasher = Sha256::new();
        hasher.update(b"base\0s\0t");
        assert_eq!(id, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_each_field_changes_id() {
        let id = chunk_id(Bucket::Public, "public/a.md", "hello");
        assert_ne!(id, chunk_id(Bucket::Private, "public/a.md", "hello"));
        assert_ne!(id, chunk_id(Bucket::Public, "public/b.md", "hello"));
        assert_ne!(id, chunk_id(Bucket::Public, "public/a.md", "hello!"));
    }

    #[test]
    fn test_field_boundaries_unambiguous() {
        assert_ne!(
            chunk_id(Bucket::Base, "ab", "c"),
            chunk_id(Bucket::Base, "a", "bc")
        );
    }
}
