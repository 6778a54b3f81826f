//! # Knowledge Index
//!
//! Content-addressed, incrementally maintained embedding index with
//! bucket-scoped retrieval, built for retrieval-augmented chat.
//!
//! A corpus root holds three bucket directories (`base/`, `public/`,
//! `private/`). At startup [`store::IndexStore::build`] chunks every document,
//! addresses each chunk by a hash of its bucket, source, and text, removes
//! chunks that no longer exist, and embeds only the chunks that have never
//! been embedded. Queries embed the question once and rank the vectors of the
//! caller's allowed buckets by cosine similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌─────────┐   ┌──────────────┐
//! │  Loader  │──▶│ Chunker │──▶│ Address │──▶│  IndexStore  │◀──▶ Embedder
//! │ 3 buckets│   │  lines  │   │ sha-256 │   │ SQLite: chunks│
//! └──────────┘   └─────────┘   └─────────┘   │   embeddings │
//!                                            └──────┬───────┘
//!                                                   ▼
//!                                          rank::top_k (cosine)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kidx init                           # create database
//! kidx build                          # ingest + embed the corpus
//! kidx query "what are your hours"    # public-mode retrieval
//! kidx serve                          # build, then serve HTTP
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Buckets, documents, chunks |
//! | [`loader`] | Bucketed filesystem scan |
//! | [`chunk`] | Line-boundary chunking |
//! | [`address`] | Content-addressed chunk ids |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Build pipeline and bucket-scoped query |
//! | [`rank`] | Cosine similarity top-k |
//! | [`stats`] | Index statistics |
//! | [`server`] | HTTP query surface |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod address;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod rank;
pub mod server;
pub mod stats;
pub mod store;

pub use models::{Bucket, Visibility};
pub use store::IndexStore;
