//! `archiv`, the administrative command line for the family archive.
//!
//! Reads `archiv.toml` (or the path given with `--config`), opens the SQLite
//! store with its file directory, runs one command and prints JSON.
//!
//! # Usage
//!
//! ```
//! archiv person add --given Anna --family Nováková --born 1890-05-01
//! archiv document add --year 1950 --person <ID> --file scan.pdf
//! archiv object delete <ID>
//! ```

mod commands;
mod settings;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use archiv_store_sqlite::{FsBlobStore, SqliteStore};
use clap::Parser;
use commands::Command;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "archiv", author, version, about = "Family archive administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "archiv.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
  // Logs go to stderr; stdout carries the JSON result.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => report(&error),
  }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  let settings = Settings::load(&cli.config)?;

  let blobs = Arc::new(FsBlobStore::new(&settings.blob_dir));
  let store = SqliteStore::open(&settings.store_path, blobs)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?
    .with_policy(settings.policy());
  tracing::debug!(store = ?settings.store_path, blobs = ?settings.blob_dir, "store opened");

  let output = commands::run(&store, cli.command).await?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

/// Print the failure and pick the exit code.
fn report(error: &anyhow::Error) -> ExitCode {
  let (code, message) = failure_message(error);
  eprintln!("{message}");
  ExitCode::from(code)
}

/// Validation problems go out per field as JSON with code 2; anything else
/// is a one-line message with code 1.
fn failure_message(error: &anyhow::Error) -> (u8, String) {
  let store_error = error.downcast_ref::<archiv_store_sqlite::Error>();

  if let Some(errors) = store_error.and_then(archiv_store_sqlite::Error::validation) {
    let message =
      serde_json::to_string_pretty(errors).unwrap_or_else(|_| errors.to_string());
    return (2, message);
  }

  if let Some(class) = store_error.map(archiv_store_sqlite::Error::class) {
    tracing::debug!(?class, "command failed");
  }
  (1, format!("error: {error:#}"))
}
