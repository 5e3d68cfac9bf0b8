//! Runtime settings: an optional TOML file layered with `ARCHIV_*` variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, ensure};
use archiv_core::dating::{DatingPolicy, MIN_YEAR, YEARS_AHEAD};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file.
  pub store_path:  PathBuf,
  /// Root directory for uploaded files.
  pub blob_dir:    PathBuf,
  pub min_year:    i32,
  pub years_ahead: i32,
}

/// Upper bound for `years_ahead`.
const MAX_YEARS_AHEAD: i32 = 100;

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:  PathBuf::from("archiv.db"),
      blob_dir:    PathBuf::from("media"),
      min_year:    MIN_YEAR,
      years_ahead: YEARS_AHEAD,
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then apply the environment on top.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ARCHIV"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut settings: Self = raw
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings.blob_dir = expand_tilde(&settings.blob_dir);
    settings.check(Utc::now().date_naive())?;
    Ok(settings)
  }

  /// Reject dating bounds that would make every date invalid.
  fn check(&self, today: NaiveDate) -> anyhow::Result<()> {
    ensure!(
      (0..=MAX_YEARS_AHEAD).contains(&self.years_ahead),
      "years_ahead must be between 0 and {MAX_YEARS_AHEAD}, got {}",
      self.years_ahead
    );
    ensure!(
      self.min_year <= today.year(),
      "min_year {} is later than the current year",
      self.min_year
    );
    Ok(())
  }

  pub fn policy(&self) -> DatingPolicy {
    DatingPolicy { min_year: self.min_year, years_ahead: self.years_ahead }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
