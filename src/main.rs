//! # Knowledge Index CLI (`kidx`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kidx init` | Create the SQLite database and schema |
//! | `kidx build` | Chunk, diff, and embed the corpus |
//! | `kidx query "<text>"` | Bucket-scoped retrieval |
//! | `kidx stats` | Per-bucket chunk and embedding counts |
//! | `kidx serve` | Build, then start the HTTP server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use knowledge_index::config::{self, Config};
use knowledge_index::models::Visibility;
use knowledge_index::{db, migrate, server, stats, IndexStore};

/// Knowledge Index CLI: content-addressed embedding index with
/// bucket-scoped retrieval.
#[derive(Parser)]
#[command(name = "kidx", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kidx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file and the chunks / embeddings tables. Idempotent.
    Init,

    /// Bring the index in line with the corpus on disk.
    ///
    /// Removes chunks whose content no longer exists, inserts new chunks, and
    /// embeds only chunks that have never been embedded.
    Build {
        /// Show document, chunk, and pending-embedding counts without writing
        /// or calling the embedding provider.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve the chunks most similar to a query.
    Query {
        /// The query text.
        query: String,

        /// Access mode: `public` (base + public) or `private` (base + private).
        #[arg(long, default_value = "public")]
        mode: Visibility,

        /// Number of results (defaults to `[retrieval].top_k`).
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Show index statistics.
    Stats,

    /// Build the index, then serve `POST /query` over HTTP.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Build { dry_run } => run_build(&config, dry_run).await,
        Commands::Query { query, mode, k } => run_query(&config, &query, mode, k).await,
        Commands::Stats => stats::run_stats(&config).await,
        Commands::Serve => server::run_server(&config).await,
    }
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.db.path.display());
    Ok(())
}

async fn run_build(config: &Config, dry_run: bool) -> Result<()> {
    let store = IndexStore::open(config).await?;

    if dry_run {
        let plan = store.plan(&config.corpus).await?;
        println!("build (dry-run)");
        println!("  documents: {}", plan.documents);
        println!("  chunks: {}", plan.chunks);
        println!("  stale: {}", plan.stale);
        println!("  pending embeddings: {}", plan.pending_embeddings);
        store.pool().close().await;
        return Ok(());
    }

    let report = store.build(&config.corpus).await?;
    println!("build");
    println!("  documents: {}", report.documents);
    println!("  chunks: {}", report.chunks);
    println!("  stale removed: {}", report.stale_removed);
    println!("  chunks inserted: {}", report.inserted);
    println!("  embeddings written: {}", report.embedded);
    println!("  embedding calls: {}", report.embed_calls);
    println!("ok");

    store.pool().close().await;
    Ok(())
}

async fn run_query(config: &Config, query: &str, mode: Visibility, k: Option<usize>) -> Result<()> {
    let store = IndexStore::open(config).await?;
    migrate::run_migrations(store.pool()).await?;
    let k = k.unwrap_or(config.retrieval.top_k);

    let hits = store.query_scored(query, k, mode.buckets()).await?;
    if hits.is_empty() {
        println!("No results.");
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [{:.4}] {}", rank + 1, hit.score, &hit.id[..12.min(hit.id.len())]);
        for line in hit.text.lines() {
            println!("    {}", line);
        }
        println!();
    }

    store.pool().close().await;
    Ok(())
}
