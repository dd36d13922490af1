//! Planning and applying a reconciliation against a [`GraphStore`].
//!
//! [`plan_entity`] and [`plan_relationship`] are pure: given what is stored
//! (if anything) and a fresh observation, they produce the value to persist
//! and the kind of write required. The async drivers wrap them in an
//! optimistic read-combine-write loop that re-reads and re-plans whenever the
//! store reports a version conflict.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  Error, Result,
  model::Entity,
  relationship::Relationship,
  store::{GraphStore, Versioned, WriteOutcome},
};

/// Conflict retries before a write gives up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// How an incoming entity is combined with a stored one.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
  /// Authoritative re-evaluation.
  #[default]
  Merge,
  /// Liveness refresh.
  Visit,
}

/// The write a plan requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Write {
  Insert,
  Update,
  /// The stored value already matches.
  None,
}

/// A reconciled value and what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan<T> {
  pub value:      T,
  pub write:      Write,
  /// Labels to attach in addition to the value's own.
  pub add_labels: Vec<&'static str>,
}

/// Combine `incoming` with `existing`.
///
/// With nothing stored the incoming value is inserted as-is. Otherwise the
/// stored value is merged or visited and an update is planned only if that
/// changed it. A kind mismatch leaves the stored value alone.
pub fn plan_entity(
  existing: Option<&Entity>,
  mut incoming: Entity,
  mode: Mode,
) -> Plan<Entity> {
  let Some(existing) = existing else {
    let add_labels = incoming.take_pending_labels();
    return Plan { value: incoming, write: Write::Insert, add_labels };
  };

  let mut value = existing.clone();
  match mode {
    Mode::Merge => value.merge(&incoming),
    Mode::Visit => value.visit(&incoming),
  }
  let add_labels = value.take_pending_labels();
  let write = if value == *existing && add_labels.is_empty() {
    Write::None
  } else {
    Write::Update
  };
  Plan { value, write, add_labels }
}

/// Combine `incoming` with the stored edge under the same key.
///
/// A collision is always absorbed by visiting the stored edge; a second
/// record is never planned for an existing key.
pub fn plan_relationship(
  existing: Option<&Relationship>,
  incoming: Relationship,
) -> Plan<Relationship> {
  let Some(existing) = existing else {
    return Plan {
      value:      incoming,
      write:      Write::Insert,
      add_labels: Vec::new(),
    };
  };

  let mut value = existing.clone();
  value.visit(&incoming);
  let write = if value == *existing { Write::None } else { Write::Update };
  Plan { value, write, add_labels: Vec::new() }
}

/// What a driver did.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
  pub value:    T,
  pub write:    Write,
  /// Stored version after the call.
  pub version:  u64,
  /// Conflicts absorbed before the write landed.
  pub attempts: u32,
}

/// Drives plans against a store with optimistic retries.
#[derive(Debug, Clone)]
pub struct Reconciler<'s, S> {
  store:       &'s S,
  max_retries: u32,
}

impl<'s, S: GraphStore> Reconciler<'s, S> {
  pub fn new(store: &'s S) -> Self {
    Self { store, max_retries: DEFAULT_MAX_RETRIES }
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  /// Reconcile one entity. Invalid entities are rejected before any read.
  pub async fn reconcile_entity(
    &self,
    incoming: Entity,
    mode: Mode,
  ) -> Result<Outcome<Entity>> {
    if !incoming.valid() {
      return Err(Error::MalformedKey {
        kind: incoming.kind().prefix(),
        key:  incoming.key().to_owned(),
      });
    }
    let key = incoming.key().to_owned();

    for attempt in 0..=self.max_retries {
      let existing = self.store.fetch_entity(&key).await.map_err(store_err)?;
      let (existing, expected) = split(existing);
      let plan = plan_entity(existing.as_ref(), incoming.clone(), mode);

      let outcome = match plan.write {
        Write::None => {
          tracing::debug!(%key, %mode, "entity unchanged");
          return Ok(Outcome {
            value: plan.value,
            write: Write::None,
            version: expected.unwrap_or_default(),
            attempts: attempt,
          });
        }
        Write::Insert | Write::Update => self
          .store
          .write_entity(&plan.value, expected, &plan.add_labels)
          .await
          .map_err(store_err)?,
      };

      match outcome {
        WriteOutcome::Committed { version } => {
          tracing::debug!(%key, %mode, write = %plan.write, version, "entity written");
          return Ok(Outcome {
            value: plan.value,
            write: plan.write,
            version,
            attempts: attempt,
          });
        }
        WriteOutcome::Conflict => {
          tracing::warn!(%key, attempt, "entity write conflicted, retrying");
        }
      }
    }

    Err(Error::RetriesExhausted { key, attempts: self.max_retries + 1 })
  }

  /// Reconcile one relationship. A collision visits the stored edge.
  pub async fn reconcile_relationship(
    &self,
    incoming: Relationship,
  ) -> Result<Outcome<Relationship>> {
    if !incoming.valid() {
      return Err(Error::MalformedKey {
        kind: "relationship",
        key:  incoming.key().to_owned(),
      });
    }
    let key = incoming.key().to_owned();

    for attempt in 0..=self.max_retries {
      let existing =
        self.store.fetch_relationship(&key).await.map_err(store_err)?;
      let (existing, expected) = split(existing);
      if existing.is_some() {
        tracing::debug!(%key, "relationship exists, visiting");
      }
      let plan = plan_relationship(existing.as_ref(), incoming.clone());

      if plan.write == Write::None {
        return Ok(Outcome {
          value: plan.value,
          write: Write::None,
          version: expected.unwrap_or_default(),
          attempts: attempt,
        });
      }

      match self
        .store
        .write_relationship(&plan.value, expected)
        .await
        .map_err(store_err)?
      {
        WriteOutcome::Committed { version } => {
          return Ok(Outcome {
            value: plan.value,
            write: plan.write,
            version,
            attempts: attempt,
          });
        }
        WriteOutcome::Conflict => {
          tracing::warn!(%key, attempt, "relationship write conflicted, retrying");
        }
      }
    }

    Err(Error::RetriesExhausted { key, attempts: self.max_retries + 1 })
  }
}

fn split<T>(stored: Option<Versioned<T>>) -> (Option<T>, Option<u64>) {
  match stored {
    Some(Versioned { value, version }) => (Some(value), Some(version)),
    None => (None, None),
  }
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(error: E) -> Error {
  Error::Store(Box::new(error))
}
