//! The `GraphStore` trait: what the reconciler needs from persistence.
//!
//! Backends (e.g. `cartograph-store-sqlite`) implement fetch-by-key and
//! write-with-optimistic-concurrency. The reconciler never holds a lock; it
//! reads a version, combines, and writes back conditional on that version.

use std::future::Future;

use crate::{model::Entity, relationship::Relationship};

/// A stored value and the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
  pub value:   T,
  pub version: u64,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// The write landed; the record is now at `version`.
  Committed { version: u64 },
  /// The record changed (or appeared) since it was read.
  Conflict,
}

impl WriteOutcome {
  pub fn is_committed(self) -> bool { matches!(self, Self::Committed { .. }) }
}

/// Abstraction over a graph store backend.
///
/// `expected_version` is `None` for an insert, which conflicts if the key
/// already exists, and `Some(v)` for an update, which conflicts unless the
/// stored record is still at `v`.
///
/// All methods return `Send` futures so the trait can be driven from a
/// multi-threaded runtime.
pub trait GraphStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch_entity<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Versioned<Entity>>, Self::Error>>
  + Send
  + 'a;

  fn fetch_relationship<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<
    Output = Result<Option<Versioned<Relationship>>, Self::Error>,
  > + Send
  + 'a;

  /// Write `entity`, attaching `add_labels` on top of the entity's own.
  fn write_entity<'a>(
    &'a self,
    entity: &'a Entity,
    expected_version: Option<u64>,
    add_labels: &'a [&'static str],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn write_relationship<'a>(
    &'a self,
    relationship: &'a Relationship,
    expected_version: Option<u64>,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Every label currently attached to a stored entity, sorted.
  fn labels(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
