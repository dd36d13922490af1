//! Edges between two entities.
//!
//! A relationship's identity is the `(source key, label, target key)` triple.
//! Two relationships built independently from equal-keyed endpoints always
//! derive the same key, so a collision is resolved by visiting the stored
//! edge rather than inserting a second one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  Error, Result,
  hook::{Hook, Hooked, default_now, trim_in_place},
  key,
  lifecycle::overwrite,
  model::Entity,
};

/// The fixed edge vocabulary.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
  EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
  Discovered,
  HasWebpage,
  ScannedBy,
  HasTechnology,
  HasOrganization,
  WorksFor,
  HasAttribute,
}

impl Label {
  /// Parse a wire label, rejecting anything outside the vocabulary.
  pub fn parse(raw: &str) -> Result<Self> {
    raw.parse().map_err(|_| Error::InvalidLabel(raw.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
  #[serde(default)]
  pub key:             String,
  pub label:           Label,
  pub source:          Box<Entity>,
  pub target:          Box<Entity>,
  /// The capability that observed the edge.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub capability:      String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub scan_type:       String,
  /// Where the raw evidence for this edge was stored.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub attachment_path: String,
  #[serde(default)]
  pub created:         Option<DateTime<Utc>>,
  #[serde(default)]
  pub visited:         Option<DateTime<Utc>>,
}

impl Relationship {
  /// An edge from `source` to `target` with its key already derived.
  ///
  /// Endpoints without a key get one derived from their identity fields;
  /// [`hook::prepare`](crate::hook::prepare) also defaults and hooks them.
  pub fn new(
    source: impl Into<Entity>,
    label: Label,
    target: impl Into<Entity>,
  ) -> Self {
    let mut source = Box::new(source.into());
    let mut target = Box::new(target.into());
    for endpoint in [&mut source, &mut target] {
      if endpoint.key().is_empty()
        && let Err(error) = endpoint.derive_key()
      {
        tracing::warn!(kind = %endpoint.kind(), %error, "endpoint key derivation failed");
      }
    }
    let mut relationship = Self {
      key: String::new(),
      label,
      source,
      target,
      capability: String::new(),
      scan_type: String::new(),
      attachment_path: String::new(),
      created: None,
      visited: None,
    };
    relationship.key = relationship.derive_key();
    relationship
  }

  pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
    self.capability = capability.into();
    self
  }

  pub fn with_attachment_path(mut self, path: impl Into<String>) -> Self {
    self.attachment_path = path.into();
    self
  }

  /// The key implied by the current endpoints and label.
  pub fn derive_key(&self) -> String {
    key::relationship(self.source.key(), self.label, self.target.key())
  }

  pub fn key(&self) -> &str { &self.key }

  /// The `(source, target)` endpoint pair.
  pub fn nodes(&self) -> (&Entity, &Entity) { (&self.source, &self.target) }

  /// Structurally well-formed, consistent with its endpoints, and both
  /// endpoints valid.
  pub fn valid(&self) -> bool {
    key::is_well_formed_relationship(&self.key, self.label)
      && self.key == self.derive_key()
      && self.source.valid()
      && self.target.valid()
  }

  pub fn labels(&self) -> Vec<&'static str> { vec![self.label.as_str()] }

  /// Refresh an existing edge from a colliding observation.
  ///
  /// The endpoints are replaced with the incoming ones so callers see fresh
  /// node data. The key is never touched. Attributes only move when the
  /// incoming side has a value.
  pub fn visit(&mut self, incoming: &Relationship) {
    if incoming.visited.is_some() {
      self.visited = incoming.visited;
    }
    overwrite(&mut self.capability, &incoming.capability);
    overwrite(&mut self.scan_type, &incoming.scan_type);
    overwrite(&mut self.attachment_path, &incoming.attachment_path);
    if self.created.is_none() {
      self.created = incoming.created;
    }
    self.replace_nodes(incoming);
  }

  /// Authoritative update of an existing edge.
  ///
  /// Endpoint entities are merged rather than replaced; attributes behave as
  /// in [`visit`](Self::visit).
  pub fn merge(&mut self, incoming: &Relationship) {
    self.source.merge(&incoming.source);
    self.target.merge(&incoming.target);
    overwrite(&mut self.capability, &incoming.capability);
    overwrite(&mut self.scan_type, &incoming.scan_type);
    overwrite(&mut self.attachment_path, &incoming.attachment_path);
    if incoming.visited.is_some() {
      self.visited = incoming.visited;
    }
    if self.created.is_none() {
      self.created = incoming.created;
    }
  }

  fn replace_nodes(&mut self, incoming: &Relationship) {
    if incoming.source.key() == self.source.key() {
      self.source.clone_from(&incoming.source);
    }
    if incoming.target.key() == self.target.key() {
      self.target.clone_from(&incoming.target);
    }
  }
}

fn prepare_endpoints(relationship: &mut Relationship) -> Result<()> {
  relationship.source.run_hooks()?;
  relationship.target.run_hooks()
}

fn derive_key(relationship: &mut Relationship) -> Result<()> {
  relationship.key = relationship.derive_key();
  Ok(())
}

fn trim_attributes(relationship: &mut Relationship) -> Result<()> {
  trim_in_place(&mut relationship.capability);
  trim_in_place(&mut relationship.scan_type);
  Ok(())
}

impl Hooked for Relationship {
  fn defaulted(&mut self) {
    self.source.defaulted();
    self.target.defaulted();
    default_now(&mut self.created);
    if self.visited.is_none() {
      self.visited = self.created;
    }
  }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Relationship>] = &[
      Hook::new("prepare-endpoints", prepare_endpoints),
      Hook::new("trim-attributes", trim_attributes),
      Hook::new("derive-key", derive_key),
    ];
    HOOKS
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::{
    hook::prepare,
    model::{Asset, Person, Webpage},
  };

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  fn edge() -> Relationship {
    prepare(Relationship::new(
      Asset::new("example.com", "www.example.com"),
      Label::HasWebpage,
      Webpage::new("https://www.example.com/login"),
    ))
    .unwrap()
  }

  #[test]
  fn independent_builds_collide_on_key() {
    let a = edge();
    let b = edge();
    assert_eq!(a.key(), b.key());
    assert_eq!(
      a.key(),
      "#asset#example.com#www.example.com#HAS_WEBPAGE#webpage#https://www.example.com/login"
    );
    assert!(a.valid());
  }

  #[test]
  fn empty_endpoints_still_carry_the_label_marker() {
    let r = Relationship::new(
      Asset::new("", ""),
      Label::Discovered,
      Person::default(),
    );
    assert!(r.key().contains("#DISCOVERED#"));
    assert!(!r.valid());
  }

  #[test]
  fn hook_failure_in_an_endpoint_aborts() {
    let raw = Relationship::new(
      Asset::new("example.com", "example.com"),
      Label::HasWebpage,
      Webpage::new("not a url"),
    );
    assert!(prepare(raw).is_err());
  }

  #[test]
  fn visit_keeps_attachment_path_when_incoming_is_empty() {
    let mut existing = edge().with_attachment_path("/original/path");
    let incoming = edge().with_capability("crawler");
    existing.visit(&incoming);
    assert_eq!(existing.attachment_path, "/original/path");
    assert_eq!(existing.capability, "crawler");
  }

  #[test]
  fn visit_refreshes_nodes_and_keeps_key() {
    let mut existing = edge();
    let key = existing.key.clone();

    let mut incoming = edge();
    incoming.visited = Some(at(1_000));
    if let Entity::Webpage(page) = incoming.target.as_mut() {
      page.title = "Sign in".into();
    }
    existing.visit(&incoming);

    assert_eq!(existing.key, key);
    assert_eq!(existing.visited, Some(at(1_000)));
    let Entity::Webpage(page) = existing.nodes().1 else {
      panic!("target changed kind");
    };
    assert_eq!(page.title, "Sign in");
  }

  #[test]
  fn visit_is_idempotent() {
    let mut r = edge().with_capability("crawler");
    let snapshot = r.clone();
    r.visit(&snapshot);
    assert_eq!(r, snapshot);
  }

  #[test]
  fn labels_serialize_in_screaming_snake_case() {
    assert_eq!(Label::WorksFor.as_str(), "WORKS_FOR");
    assert_eq!(
      serde_json::to_string(&Label::HasTechnology).unwrap(),
      "\"HAS_TECHNOLOGY\""
    );
    assert_eq!(Label::parse("SCANNED_BY").unwrap(), Label::ScannedBy);
    assert!(matches!(
      Label::parse("scanned_by"),
      Err(Error::InvalidLabel(raw)) if raw == "scanned_by"
    ));
  }
}
