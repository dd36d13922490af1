//! Encoding and decoding between domain values and SQLite columns.
//!
//! Bodies are compact JSON of the full value. Labels are a JSON array.
//! Versions are stored as `INTEGER` and must be positive.

use std::collections::BTreeSet;

use cartograph_core::{Entity, Label, Relationship, store::Versioned};

use crate::{Error, Result};

// ─── Versions ────────────────────────────────────────────────────────────────

pub fn encode_version(version: u64) -> i64 {
  i64::try_from(version).unwrap_or(i64::MAX)
}

pub fn decode_version(key: &str, raw: i64) -> Result<u64> {
  u64::try_from(raw)
    .ok()
    .filter(|v| *v > 0)
    .ok_or_else(|| Error::CorruptRow {
      key:    key.to_owned(),
      reason: format!("invalid version {raw}"),
    })
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// Union `stored` (a JSON array, possibly empty) with `labels`, sorted.
pub fn merge_labels<'a>(
  stored: Option<&str>,
  labels: impl IntoIterator<Item = &'a str>,
) -> Result<String> {
  let mut all: BTreeSet<String> = match stored {
    Some(json) => serde_json::from_str(json)?,
    None => BTreeSet::new(),
  };
  all.extend(labels.into_iter().map(str::to_owned));
  Ok(serde_json::to_string(&all)?)
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// An `entities` row as read from SQLite.
pub struct RawEntity {
  pub key:     String,
  pub body:    String,
  pub version: i64,
}

impl RawEntity {
  /// Decode and check that the body still derives the stored key.
  pub fn into_versioned(self) -> Result<Versioned<Entity>> {
    let value: Entity = serde_json::from_str(&self.body)?;
    if value.key() != self.key || !value.valid() {
      return Err(Error::CorruptRow {
        key:    self.key,
        reason: format!("body decodes to {} key {:?}", value.kind(), value.key()),
      });
    }
    let version = decode_version(&self.key, self.version)?;
    Ok(Versioned { value, version })
  }
}

/// A `relationships` row as read from SQLite.
pub struct RawRelationship {
  pub key:     String,
  pub label:   String,
  pub body:    String,
  pub version: i64,
}

impl RawRelationship {
  /// Decode, checking the label column before the body.
  pub fn into_versioned(self) -> Result<Versioned<Relationship>> {
    let label = Label::parse(&self.label)?;
    let value: Relationship = serde_json::from_str(&self.body)?;
    if value.label != label {
      return Err(Error::CorruptRow {
        key:    self.key,
        reason: format!("label column {label} but body carries {}", value.label),
      });
    }
    if value.key() != self.key {
      return Err(Error::CorruptRow {
        key:    self.key,
        reason: format!("body decodes to key {:?}", value.key()),
      });
    }
    let version = decode_version(&self.key, self.version)?;
    Ok(Versioned { value, version })
  }
}
