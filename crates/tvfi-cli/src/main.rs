//! tvfi command-line binary.
//!
//! Reads `tvfi.toml` (or the path given with `--config`) plus `TVFI_*`
//! environment variables, opens the SQLite index and the filesystem blob
//! store, and runs one pipeline command. Results are printed as JSON.
//!
//! ```
//! tvfi ingest receipts.csv
//! tvfi reconcile --dry-run
//! tvfi lens engineer-realist helion
//! tvfi search fusion
//! ```

mod input;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tvfi_blob::FsBlobStore;
use tvfi_core::{cid::ContentId, identity::ReceiptIdentity, model::Frontier, score::KeywordScorer};
use tvfi_ingest::{
  Settings, ingest_batch,
  query::{
    DEFAULT_FEED_LIMIT, DEFAULT_PROMOTE_COUNT, FeedMode, FeedQuery, entity_lens, entity_profile,
    fetch_analysis, latest_receipts, promote_hidden, search, stats, verify_analysis,
  },
  reconcile_orphans,
};
use tvfi_store_sqlite::SqliteStore;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tvfi", author, version, about = "Frontier receipt pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tvfi.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the identity hash of a receipt without touching any store.
  Hash {
    url:   String,
    date:  String,
    title: String,
  },
  #[command(flatten)]
  Store(StoreCommand),
}

/// Commands that open the index and blob store.
#[derive(Subcommand)]
enum StoreCommand {
  /// Ingest receipts from a CSV file.
  Ingest {
    /// CSV with Title, Source / Link and Frontier columns.
    csv: PathBuf,
  },
  /// Delete artifact blobs that no receipt references.
  Reconcile {
    /// Report orphans without deleting them.
    #[arg(long)]
    dry_run: bool,
  },
  /// Receipt, entity and content-id counts.
  Stats,
  /// Print a stored analysis artifact.
  Analysis {
    cid: ContentId,
    /// Recompute the content id from the stored artifact instead.
    #[arg(long)]
    verify: bool,
  },
  /// An entity and its newest receipts.
  Entity { slug: String },
  /// Render a deterministic lens over an entity's receipts.
  Lens {
    /// `engineer-realist` or `market-mapper`.
    name: String,
    slug: String,
  },
  /// Newest visible receipts.
  Latest {
    #[arg(long)]
    frontier: Option<Frontier>,
    #[arg(long, default_value_t = DEFAULT_FEED_LIMIT)]
    limit:    usize,
    #[arg(long, value_enum, default_value_t = Mode::Public)]
    mode:     Mode,
  },
  /// Find entities and visible receipts containing a phrase.
  Search { query: String },
  /// Make the newest hidden receipts visible.
  Promote {
    #[arg(long, default_value_t = DEFAULT_PROMOTE_COUNT)]
    count: usize,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
  /// Only receipts older than the public delay.
  Public,
  All,
}

impl From<Mode> for FeedMode {
  fn from(mode: Mode) -> Self {
    match mode {
      Mode::Public => FeedMode::Public,
      Mode::All => FeedMode::All,
    }
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let command = match cli.command {
    Command::Hash { url, date, title } => {
      let identity = ReceiptIdentity::from_raw(&url, &date, &title)
        .context("title is empty after canonicalisation")?;
      println!("{}", identity.hash);
      return Ok(());
    }
    Command::Store(command) => command,
  };

  let settings = load_settings(&cli.config)?;

  let store_path = expand_tilde(&settings.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let blob_dir = expand_tilde(&settings.blob_dir);
  let blobs = FsBlobStore::open(&blob_dir)
    .await
    .with_context(|| format!("failed to open blob store at {blob_dir:?}"))?;

  match command {
    StoreCommand::Ingest { csv } => {
      let rows = input::read_csv_file(&csv)?;
      let report =
        ingest_batch(&store, &blobs, &KeywordScorer, &rows, settings.ingest_options()).await?;
      print_json(&report)?;
    }
    StoreCommand::Reconcile { dry_run } => {
      let report = reconcile_orphans(&store, &blobs, settings.reconcile_options(dry_run)?).await?;
      print_json(&report)?;
    }
    StoreCommand::Stats => print_json(&stats(&store).await?)?,
    StoreCommand::Analysis { cid, verify: false } => {
      print_json(&fetch_analysis(&blobs, &cid).await?)?;
    }
    StoreCommand::Analysis { cid, verify: true } => {
      let verification = verify_analysis(&blobs, &cid).await?;
      print_json(&verification)?;
      if !verification.matches {
        anyhow::bail!("content id mismatch for {cid}");
      }
    }
    StoreCommand::Entity { slug } => print_json(&entity_profile(&store, &slug).await?)?,
    StoreCommand::Lens { name, slug } => print_json(&entity_lens(&store, &name, &slug).await?)?,
    StoreCommand::Latest { frontier, limit, mode } => {
      let query = FeedQuery {
        frontier,
        limit,
        mode: mode.into(),
        public_delay_days: settings.public_delay_days,
      };
      print_json(&latest_receipts(&store, &query, Utc::now()).await?)?;
    }
    StoreCommand::Search { query } => print_json(&search(&store, &query).await?)?,
    StoreCommand::Promote { count } => {
      let promoted = promote_hidden(&store, count).await?;
      print_json(&serde_json::json!({ "promoted": promoted }))?;
    }
  }

  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Layer the config file under `TVFI_*` variables and validate the result.
/// Nested keys use a double underscore: `TVFI_RECONCILE__GRACE_SECS`.
fn load_settings(path: &Path) -> anyhow::Result<Settings> {
  let settings: Settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("TVFI")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise Settings")?;
  settings.validate()?;
  Ok(settings)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
