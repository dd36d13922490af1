//! [`SqliteStore`], the SQLite implementation of [`GraphStore`].

use std::path::Path;

use rusqlite::{ErrorCode, OptionalExtension as _};

use cartograph_core::{
  Entity, Relationship,
  store::{GraphStore, Versioned, WriteOutcome},
};

use crate::{
  Result,
  encode::{RawEntity, RawRelationship, encode_version, merge_labels},
  schema::SCHEMA,
};

/// History entries kept per entity unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An entity graph backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:          tokio_rusqlite::Connection,
  history_limit: usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn, history_limit: DEFAULT_HISTORY_LIMIT };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, for tests and dry runs.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, history_limit: DEFAULT_HISTORY_LIMIT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Keep at most `limit` newest history entries per entity on write.
  pub fn with_history_limit(mut self, limit: usize) -> Self {
    self.history_limit = limit;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  /// Every stored relationship with `source_key` as its source.
  pub async fn relationships_from(
    &self,
    source_key: &str,
  ) -> Result<Vec<Relationship>> {
    let source_key = source_key.to_owned();
    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT key, label, body, version FROM relationships
           WHERE source_key = ?1 ORDER BY key",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![source_key], |row| {
            Ok(RawRelationship {
              key:     row.get(0)?,
              label:   row.get(1)?,
              body:    row.get(2)?,
              version: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| raw.into_versioned().map(|v| v.value))
      .collect()
  }

  /// Number of stored `(entities, relationships)`.
  pub async fn counts(&self) -> Result<(u64, u64)> {
    let counts = self
      .conn
      .call(|conn| {
        let entities: i64 =
          conn.query_row("SELECT COUNT(*) FROM entities", [], |r| r.get(0))?;
        let relationships: i64 =
          conn.query_row("SELECT COUNT(*) FROM relationships", [], |r| {
            r.get(0)
          })?;
        Ok((entities, relationships))
      })
      .await?;
    Ok((
      u64::try_from(counts.0).unwrap_or_default(),
      u64::try_from(counts.1).unwrap_or_default(),
    ))
  }

  /// Drop all but the newest history entries before persisting.
  fn capped(&self, entity: &Entity) -> Entity {
    let mut entity = entity.clone();
    if let Some(lifecycle) = entity.lifecycle_mut()
      && lifecycle.history.len() > self.history_limit
    {
      lifecycle.history.retain_newest(self.history_limit);
    }
    entity
  }
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
  matches!(
    error,
    rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
  )
}

// ─── GraphStore impl ─────────────────────────────────────────────────────────

impl GraphStore for SqliteStore {
  type Error = crate::Error;

  async fn fetch_entity(&self, key: &str) -> Result<Option<Versioned<Entity>>> {
    let key = key.to_owned();
    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT key, body, version FROM entities WHERE key = ?1",
              rusqlite::params![key],
              |row| {
                Ok(RawEntity {
                  key:     row.get(0)?,
                  body:    row.get(1)?,
                  version: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntity::into_versioned).transpose()
  }

  async fn fetch_relationship(
    &self,
    key: &str,
  ) -> Result<Option<Versioned<Relationship>>> {
    let key = key.to_owned();
    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT key, label, body, version FROM relationships
               WHERE key = ?1",
              rusqlite::params![key],
              |row| {
                Ok(RawRelationship {
                  key:     row.get(0)?,
                  label:   row.get(1)?,
                  body:    row.get(2)?,
                  version: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRelationship::into_versioned).transpose()
  }

  async fn write_entity(
    &self,
    entity: &Entity,
    expected_version: Option<u64>,
    add_labels: &[&'static str],
  ) -> Result<WriteOutcome> {
    let entity = self.capped(entity);
    let key = entity.key().to_owned();
    let kind = entity.kind().prefix();
    let status = entity.status();
    let body = serde_json::to_string(&entity)?;
    let mut labels = entity.labels();
    labels.extend_from_slice(add_labels);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = match expected_version {
          None => {
            let labels_json = merge_labels(None, labels.iter().copied())
              .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            match tx.execute(
              "INSERT INTO entities (key, kind, status, labels, body, version)
               VALUES (?1, ?2, ?3, ?4, ?5, 1)",
              rusqlite::params![key, kind, status, labels_json, body],
            ) {
              Ok(_) => WriteOutcome::Committed { version: 1 },
              Err(e) if is_unique_violation(&e) => WriteOutcome::Conflict,
              Err(e) => return Err(e.into()),
            }
          }
          Some(expected) => {
            let stored: Option<String> = tx
              .query_row(
                "SELECT labels FROM entities WHERE key = ?1 AND version = ?2",
                rusqlite::params![key, encode_version(expected)],
                |row| row.get(0),
              )
              .optional()?;
            match stored {
              None => WriteOutcome::Conflict,
              Some(stored) => {
                let labels_json =
                  merge_labels(Some(&stored), labels.iter().copied())
                    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
                let next = expected + 1;
                let changed = tx.execute(
                  "UPDATE entities
                   SET kind = ?2, status = ?3, labels = ?4, body = ?5, version = ?6
                   WHERE key = ?1 AND version = ?7",
                  rusqlite::params![
                    key,
                    kind,
                    status,
                    labels_json,
                    body,
                    encode_version(next),
                    encode_version(expected),
                  ],
                )?;
                if changed == 1 {
                  WriteOutcome::Committed { version: next }
                } else {
                  WriteOutcome::Conflict
                }
              }
            }
          }
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    if outcome == WriteOutcome::Conflict {
      tracing::debug!(key = entity.key(), ?expected_version, "entity version conflict");
    }
    Ok(outcome)
  }

  async fn write_relationship(
    &self,
    relationship: &Relationship,
    expected_version: Option<u64>,
  ) -> Result<WriteOutcome> {
    let key = relationship.key().to_owned();
    let label = relationship.label.as_str();
    let (source, target) = relationship.nodes();
    let source_key = source.key().to_owned();
    let target_key = target.key().to_owned();
    let body = serde_json::to_string(relationship)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let outcome = match expected_version {
          None => match conn.execute(
            "INSERT INTO relationships
               (key, label, source_key, target_key, body, version)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            rusqlite::params![key, label, source_key, target_key, body],
          ) {
            Ok(_) => WriteOutcome::Committed { version: 1 },
            Err(e) if is_unique_violation(&e) => WriteOutcome::Conflict,
            Err(e) => return Err(e.into()),
          },
          Some(expected) => {
            let next = expected + 1;
            let changed = conn.execute(
              "UPDATE relationships
               SET source_key = ?2, target_key = ?3, body = ?4, version = ?5
               WHERE key = ?1 AND version = ?6",
              rusqlite::params![
                key,
                source_key,
                target_key,
                body,
                encode_version(next),
                encode_version(expected),
              ],
            )?;
            if changed == 1 {
              WriteOutcome::Committed { version: next }
            } else {
              WriteOutcome::Conflict
            }
          }
        };
        Ok(outcome)
      })
      .await?;

    if outcome == WriteOutcome::Conflict {
      tracing::debug!(
        key = relationship.key(),
        ?expected_version,
        "relationship version conflict"
      );
    }
    Ok(outcome)
  }

  async fn labels(&self) -> Result<Vec<String>> {
    let labels = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT value FROM entities, json_each(entities.labels)
           ORDER BY value",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(labels)
  }
}
