//! Error type for `cartograph-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cartograph_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored row that no longer decodes to a well-formed value.
  #[error("corrupt row {key:?}: {reason}")]
  CorruptRow { key: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
