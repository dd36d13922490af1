//! Error types for `cartograph-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid status code: {0:?}")]
  InvalidStatus(String),

  #[error("invalid source: {0:?}")]
  InvalidSource(String),

  #[error("invalid relationship label: {0:?}")]
  InvalidLabel(String),

  #[error("malformed {kind} key: {key:?}")]
  MalformedKey { kind: &'static str, key: String },

  #[error("{kind} is missing required field `{field}`")]
  MissingField {
    kind:  &'static str,
    field: &'static str,
  },

  #[error("hook `{hook}` failed: {source}")]
  Hook {
    hook:   &'static str,
    #[source]
    source: Box<Error>,
  },

  #[error("invalid url {url:?}: {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("invalid CPE 2.3 string: {0:?}")]
  InvalidCpe(String),

  #[error("cannot parse {field} as a number: {value:?}")]
  NumberParse { field: &'static str, value: String },

  #[error("write to {key} still conflicting after {attempts} attempts")]
  RetriesExhausted { key: String, attempts: u32 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// The innermost error, looking through any hook wrappers.
  pub fn root(&self) -> &Error {
    match self {
      Self::Hook { source, .. } => source.root(),
      other => other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
