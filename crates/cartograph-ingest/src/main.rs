//! `cartograph-ingest`: reconcile newline-delimited JSON observations into a
//! SQLite-backed entity graph.
//!
//! # Usage
//!
//! ```text
//! cartograph-ingest observations.ndjson
//! cartograph-ingest --mode visit --config ~/.config/cartograph.toml - < scan.ndjson
//! ```
//!
//! Each input line is either `{"entity": {...}, "mode": "merge"}` or
//! `{"relationship": {...}}`.

mod config;
mod ingest;

use std::path::PathBuf;

use anyhow::Context as _;
use cartograph_core::reconcile::{Mode, Reconciler};
use cartograph_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::IngestConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reconcile observations into the cartograph graph")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cartograph.toml")]
  config: PathBuf,

  /// How entity lines without their own `mode` are combined.
  #[arg(short, long)]
  mode: Option<Mode>,

  /// Reconcile against an empty in-memory store and discard the result.
  #[arg(long)]
  dry_run: bool,

  /// NDJSON input; `-` or omitted reads stdin.
  input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = IngestConfig::load(&cli.config)?;
  if let Some(mode) = cli.mode {
    cfg.default_mode = mode;
  }

  let store = if cli.dry_run {
    tracing::info!("dry run; using an in-memory store");
    SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store")?
  } else {
    let store_path = config::expand_tilde(&cfg.store_path);
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?
  };
  let store = store.with_history_limit(cfg.history_limit);

  let reconciler = Reconciler::new(&store).with_max_retries(cfg.max_retries);
  let reader = open_input(cli.input.as_deref()).await?;
  let summary = ingest::run(reader, &reconciler, cfg.default_mode).await?;

  tracing::info!(
    inserted = summary.inserted,
    updated = summary.updated,
    unchanged = summary.unchanged,
    rejected = summary.rejected,
    "ingest complete"
  );
  Ok(())
}

async fn open_input(
  path: Option<&std::path::Path>,
) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
  match path {
    None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    Some(p) if p.as_os_str() == "-" => {
      Ok(Box::new(BufReader::new(tokio::io::stdin())))
    }
    Some(p) => {
      let file = tokio::fs::File::open(p)
        .await
        .with_context(|| format!("failed to open input {}", p.display()))?;
      Ok(Box::new(BufReader::new(file)))
    }
  }
}
