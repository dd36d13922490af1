//! Node variants of the graph and the closed [`Entity`] sum type over them.
//!
//! Each variant implements [`Model`]: a static hook pipeline, key access,
//! structural validation, graph labels, status access, and the Merge/Visit
//! operators. [`Entity`] dispatches to the variant by pattern matching;
//! there is no runtime type registry.

pub mod asset;
pub mod job;
pub mod metadata;
pub mod organization;
pub mod person;
pub mod technology;
pub mod web;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

pub use self::{
  asset::{Asset, AssetClass},
  job::Job,
  metadata::Metadata,
  organization::Organization,
  person::Person,
  technology::Technology,
  web::{WebApplication, Webpage},
};
use crate::{
  Result,
  hook::{self, Hooked},
  key,
  lifecycle::Lifecycle,
  status::Status,
  ttl,
};

/// Label attached to nodes declared in scope by a user.
pub const SEED_LABEL: &str = "Seed";
/// Label attached to nodes subject to expiry.
pub const TTL_LABEL: &str = "TTL";

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The node variants. `Display` yields the graph label.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  Asset,
  WebApplication,
  Webpage,
  Person,
  Technology,
  Organization,
  Job,
}

impl EntityKind {
  /// The key prefix segment, e.g. `webapplication` in
  /// `#webapplication#https://example.com/`.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Asset => "asset",
      Self::WebApplication => "webapplication",
      Self::Webpage => "webpage",
      Self::Person => "person",
      Self::Technology => "technology",
      Self::Organization => "organization",
      Self::Job => "job",
    }
  }

  /// The primary graph label for this kind.
  pub fn label(self) -> &'static str {
    match self {
      Self::Asset => "Asset",
      Self::WebApplication => "WebApplication",
      Self::Webpage => "Webpage",
      Self::Person => "Person",
      Self::Technology => "Technology",
      Self::Organization => "Organization",
      Self::Job => "Job",
    }
  }
}

/// Every label a node may carry, for creating graph constraints.
pub fn all_labels() -> Vec<&'static str> {
  let mut labels: Vec<&'static str> =
    EntityKind::iter().map(EntityKind::label).collect();
  labels.push(SEED_LABEL);
  labels.push(TTL_LABEL);
  labels
}

// ─── Model ───────────────────────────────────────────────────────────────────

/// Capabilities shared by every node variant.
pub trait Model: Hooked {
  const KIND: EntityKind;

  fn key(&self) -> &str;

  /// Structural check of the stored key shape.
  fn valid(&self) -> bool { key::is_well_formed(Self::KIND, self.key()) }

  /// Graph labels to attach when persisting.
  fn labels(&self) -> Vec<&'static str>;

  fn status(&self) -> String;

  fn set_status(&mut self, status: &str) -> Result<()>;

  /// Authoritative combination; see [`Lifecycle::merge`].
  fn merge(&mut self, other: &Self);

  /// Liveness refresh; see [`Lifecycle::visit`].
  fn visit(&mut self, other: &Self);

  /// Labels the store must add to an already persisted node, cleared on
  /// return.
  fn take_pending_labels(&mut self) -> Vec<&'static str> { Vec::new() }
}

/// Labels for a lifecycle-bearing node: its kind, `TTL` when it can expire,
/// and `Seed` when user-declared.
pub(crate) fn lifecycle_labels(
  kind: EntityKind,
  lifecycle: &Lifecycle,
  expires: bool,
) -> Vec<&'static str> {
  let mut labels = vec![kind.label()];
  if expires {
    labels.push(TTL_LABEL);
  }
  if lifecycle.is_seed() {
    labels.push(SEED_LABEL);
  }
  labels
}

/// Parse and adopt a status code, then re-apply the TTL invariants.
pub(crate) fn set_lifecycle_status(
  lifecycle: &mut Lifecycle,
  status: &str,
) -> Result<()> {
  lifecycle.status = Status::parse(status)?;
  lifecycle.ttl =
    ttl::enforce(lifecycle.status, lifecycle.source, lifecycle.ttl);
  Ok(())
}

pub(crate) fn take_seed_label(lifecycle: &mut Lifecycle) -> Vec<&'static str> {
  if std::mem::take(&mut lifecycle.pending_seed_label) {
    vec![SEED_LABEL]
  } else {
    Vec::new()
  }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Any node of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
  Asset(Asset),
  WebApplication(WebApplication),
  Webpage(Webpage),
  Person(Person),
  Technology(Technology),
  Organization(Organization),
  Job(Job),
}

macro_rules! each_variant {
  ($entity:expr, $inner:ident => $body:expr) => {
    match $entity {
      Entity::Asset($inner) => $body,
      Entity::WebApplication($inner) => $body,
      Entity::Webpage($inner) => $body,
      Entity::Person($inner) => $body,
      Entity::Technology($inner) => $body,
      Entity::Organization($inner) => $body,
      Entity::Job($inner) => $body,
    }
  };
}

/// Apply `$op` when both sides are the same variant; otherwise log and leave
/// `$this` untouched.
macro_rules! same_variant {
  ($this:expr, $other:expr, $op:ident) => {
    match ($this, $other) {
      (Entity::Asset(a), Entity::Asset(b)) => a.$op(b),
      (Entity::WebApplication(a), Entity::WebApplication(b)) => a.$op(b),
      (Entity::Webpage(a), Entity::Webpage(b)) => a.$op(b),
      (Entity::Person(a), Entity::Person(b)) => a.$op(b),
      (Entity::Technology(a), Entity::Technology(b)) => a.$op(b),
      (Entity::Organization(a), Entity::Organization(b)) => a.$op(b),
      (Entity::Job(a), Entity::Job(b)) => a.$op(b),
      (this, other) => tracing::debug!(
        existing = %this.kind(),
        incoming = %other.kind(),
        op = stringify!($op),
        "ignoring combination of mismatched entity kinds"
      ),
    }
  };
}

impl Entity {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Asset(_) => EntityKind::Asset,
      Self::WebApplication(_) => EntityKind::WebApplication,
      Self::Webpage(_) => EntityKind::Webpage,
      Self::Person(_) => EntityKind::Person,
      Self::Technology(_) => EntityKind::Technology,
      Self::Organization(_) => EntityKind::Organization,
      Self::Job(_) => EntityKind::Job,
    }
  }

  pub fn key(&self) -> &str { each_variant!(self, e => e.key()) }

  pub fn valid(&self) -> bool { each_variant!(self, e => e.valid()) }

  pub fn labels(&self) -> Vec<&'static str> {
    each_variant!(self, e => e.labels())
  }

  pub fn status(&self) -> String { each_variant!(self, e => e.status()) }

  pub fn set_status(&mut self, status: &str) -> Result<()> {
    each_variant!(self, e => e.set_status(status))
  }

  pub fn defaulted(&mut self) { each_variant!(self, e => e.defaulted()) }

  /// Run the variant's hook pipeline.
  pub fn run_hooks(&mut self) -> Result<()> {
    each_variant!(self, e => hook::run(e))
  }

  /// Derive the key from the identity fields without running the rest of
  /// the pipeline. Missing fields yield empty key segments.
  pub fn derive_key(&mut self) -> Result<()> {
    each_variant!(self, e => hook::run_named(e, "derive-key"))
  }

  /// Default and hook in one step.
  pub fn prepare(&mut self) -> Result<()> {
    self.defaulted();
    self.run_hooks()
  }

  /// Merge `other` into `self`. Mismatched variants are a no-op.
  pub fn merge(&mut self, other: &Entity) { same_variant!(self, other, merge) }

  /// Visit `self` with `other`. Mismatched variants are a no-op.
  pub fn visit(&mut self, other: &Entity) { same_variant!(self, other, visit) }

  pub fn take_pending_labels(&mut self) -> Vec<&'static str> {
    each_variant!(self, e => e.take_pending_labels())
  }

  /// The shared lifecycle fields, for every variant but [`Job`].
  pub fn lifecycle(&self) -> Option<&Lifecycle> {
    match self {
      Self::Asset(e) => Some(&e.lifecycle),
      Self::WebApplication(e) => Some(&e.lifecycle),
      Self::Webpage(e) => Some(&e.lifecycle),
      Self::Person(e) => Some(&e.lifecycle),
      Self::Technology(e) => Some(&e.lifecycle),
      Self::Organization(e) => Some(&e.lifecycle),
      Self::Job(_) => None,
    }
  }

  pub fn lifecycle_mut(&mut self) -> Option<&mut Lifecycle> {
    match self {
      Self::Asset(e) => Some(&mut e.lifecycle),
      Self::WebApplication(e) => Some(&mut e.lifecycle),
      Self::Webpage(e) => Some(&mut e.lifecycle),
      Self::Person(e) => Some(&mut e.lifecycle),
      Self::Technology(e) => Some(&mut e.lifecycle),
      Self::Organization(e) => Some(&mut e.lifecycle),
      Self::Job(_) => None,
    }
  }
}

macro_rules! impl_from_variant {
  ($($variant:ident),* $(,)?) => {
    $(
      impl From<$variant> for Entity {
        fn from(value: $variant) -> Self { Self::$variant(value) }
      }
    )*
  };
}

impl_from_variant!(
  Asset,
  WebApplication,
  Webpage,
  Person,
  Technology,
  Organization,
  Job,
);
