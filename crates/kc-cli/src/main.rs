//! `kc`: command-line front end for the Knowledge Canvas project store.
//!
//! Reads `kc.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs one subcommand against it. `kc serve` exposes the same
//! repository over the JSON API.
//!
//! # Usage
//!
//! ```text
//! kc create Research --sub Papers --sub Datasets
//! kc add-link <project-id> https://arxiv.org/abs/1706.03762
//! kc tree
//! kc serve
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use commands::{Command, Repository};
use kc_repository::{IdAllocator, RandomIdSource};
use kc_store_sqlite::SqliteStore;
use settings::{Settings, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kc", author, version, about = "Knowledge Canvas project store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "kc.toml")]
  config: PathBuf,

  /// Use this database instead of the configured `store_path`.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so command output stays clean on stdout.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store_path = match &cli.store {
    Some(path) => expand_tilde(path),
    None => settings.store_path.clone(),
  };
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let ids = IdAllocator::new(RandomIdSource, settings.allocator)?;
  let repo: Repository = kc_repository::ProjectRepository::open(store, ids)
    .await
    .context("failed to load projects")?;

  commands::run(cli.command, repo, &settings).await
}
