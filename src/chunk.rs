//! Line-boundary text chunker.
//!
//! Splits document text into segments of at most `max_chars` characters
//! without ever cutting through a line. Lines are accumulated into a buffer
//! joined by `\n`; when the next line would push the buffer past the limit,
//! the trimmed buffer is emitted and a new one starts from that line.
//!
//! A single line longer than `max_chars` is emitted intact as its own chunk,
//! so the limit is a target rather than a hard cap.

use crate::address::chunk_id;
use crate::models::{Chunk, Document};

/// Default chunk size in characters.
pub const DEFAULT_MAX_CHARS: usize = 900;

/// Split text into ordered chunk texts. Whitespace-only input yields nothing.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for line in text.lines() {
        let line_chars = line.chars().count();

        // +1 for the \n separator
        if buf_chars > 0 && buf_chars + 1 + line_chars > max_chars {
            flush(&mut chunks, &buf);
            buf.clear();
            buf_chars = 0;
        }

        if buf_chars > 0 {
            buf.push('\n');
            buf_chars += 1;
        }
        buf.push_str(line);
        buf_chars += line_chars;
    }

    flush(&mut chunks, &buf);
    chunks
}

fn flush(chunks: &mut Vec<String>, buf: &str) {
    let trimmed = buf.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Chunk a document and assign each piece its content-addressed id.
pub fn chunk_document(doc: &Document, max_chars: usize) -> Vec<Chunk> {
    chunk_text(&doc.text, max_chars)
        .into_iter()
        .map(|text| Chunk {
            id: chunk_id(doc.bucket, &doc.source, &text),
            bucket: doc.bucket,
            source: doc.source.clone(),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bucket;
    use std::path::PathBuf;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("  Hello, world!\nSecond line.\n\n", 900);
        assert_eq!(chunks, vec!["Hello, world!\nSecond line.".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 900).is_empty());
        assert!(chunk_text("\n   \n\t\n", 900).is_empty());
    }

    #[test]
    fn test_flush_when_next_line_exceeds() {
        // "aaaa\nbbbb" is 9 chars; adding "\ncccc" would make 14 > 10
        let chunks = chunk_text("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_exact_fit_stays_together() {
        // 4 + 1 + 5 = 10 == max
        let chunks = chunk_text("aaaa\nbbbbb", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbbb".to_string()]);
    }

    #[test]
    fn test_long_line_kept_intact() {
        let long = "x".repeat(50);
        let text = format!("short\n{}\ntail", long);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks, vec!["short".to_string(), long, "tail".to_string()]);
    }

    #[test]
    fn test_never_splits_inside_a_line() {
        let lines: Vec<String> = (0..40).map(|i| format!("line number {}", i)).collect();
        let text = lines.join("\n");
        for chunk in chunk_text(&text, 37) {
            for piece in chunk.lines() {
                assert!(lines.iter().any(|l| l == piece), "split line: {:?}", piece);
            }
        }
    }

    #[test]
    fn test_bound_respected_for_short_lines() {
        let text = (0..100)
            .map(|i| format!("entry {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        for chunk in chunk_text(&text, 30) {
            assert!(chunk.chars().count() <= 30, "oversized: {:?}", chunk);
        }
    }

    #[test]
    fn test_order_preserved() {
        let text = "one\ntwo\nthree\nfour\nfive";
        let rejoined = chunk_text(text, 8).join("\n");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // each line is 4 chars but 8 bytes
        let chunks = chunk_text("éééé\nüüüü", 9);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunk_document_ids() {
        let doc = Document {
            path: PathBuf::from("/corpus/base/a.md"),
            source: "base/a.md".to_string(),
            bucket: Bucket::Base,
            text: "alpha\nbeta".to_string(),
        };
        let chunks = chunk_document(&doc, 5);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, chunk_id(Bucket::Base, "base/a.md", "alpha"));
        assert_eq!(chunks[1].text, "beta");
        assert_eq!(chunks[1].bucket, Bucket::Base);
    }
}
