//! Ingest configuration: `cartograph.toml` layered with `CARTOGRAPH_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cartograph_core::reconcile::{DEFAULT_MAX_RETRIES, Mode};
use cartograph_store_sqlite::DEFAULT_HISTORY_LIMIT;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  pub store_path:    PathBuf,
  pub max_retries:   u32,
  pub history_limit: usize,
  pub default_mode:  Mode,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      store_path:    PathBuf::from("cartograph.db"),
      max_retries:   DEFAULT_MAX_RETRIES,
      history_limit: DEFAULT_HISTORY_LIMIT,
      default_mode:  Mode::Merge,
    }
  }
}

impl IngestConfig {
  /// Read `path` if it exists, then apply the environment on top.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CARTOGRAPH"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise IngestConfig")
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
