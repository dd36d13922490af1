//! Organisations owning assets and employing people.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Model, lifecycle_labels, set_lifecycle_status};
use crate::{
  Error, Result,
  hook::{Hook, Hooked},
  key,
  lifecycle::{Lifecycle, backfill, overwrite},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  #[serde(flatten)]
  pub lifecycle:    Lifecycle,
  #[serde(default)]
  pub name:         String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub domain:       String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub industry:     String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub linkedin_url: String,
}

impl Organization {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }
}

/// Trim and collapse runs of whitespace.
fn normalize(org: &mut Organization) -> Result<()> {
  let collapsed = org.name.split_whitespace().collect::<Vec<_>>().join(" ");
  if collapsed != org.name {
    org.name = collapsed;
  }
  Ok(())
}

fn validate(org: &mut Organization) -> Result<()> {
  if org.name.is_empty() {
    return Err(Error::MissingField { kind: "organization", field: "name" });
  }
  Ok(())
}

fn derive_key(org: &mut Organization) -> Result<()> {
  org.lifecycle.key =
    key::compose_folded(EntityKind::Organization, &[&org.name]);
  Ok(())
}

impl Hooked for Organization {
  fn defaulted(&mut self) { self.lifecycle.defaulted(None); }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Organization>] = &[
      Hook::new("normalize", normalize),
      Hook::new("validate", validate),
      Hook::new("derive-key", derive_key),
    ];
    HOOKS
  }
}

impl Model for Organization {
  const KIND: EntityKind = EntityKind::Organization;

  fn key(&self) -> &str { &self.lifecycle.key }

  fn labels(&self) -> Vec<&'static str> {
    lifecycle_labels(Self::KIND, &self.lifecycle, false)
  }

  fn status(&self) -> String { self.lifecycle.status.to_string() }

  fn set_status(&mut self, status: &str) -> Result<()> {
    set_lifecycle_status(&mut self.lifecycle, status)
  }

  fn merge(&mut self, other: &Self) {
    self.lifecycle.merge(&other.lifecycle);
    overwrite(&mut self.domain, &other.domain);
    overwrite(&mut self.industry, &other.industry);
    overwrite(&mut self.linkedin_url, &other.linkedin_url);
  }

  fn visit(&mut self, other: &Self) {
    self.lifecycle.visit(&other.lifecycle);
    backfill(&mut self.domain, &other.domain);
    backfill(&mut self.industry, &other.industry);
    backfill(&mut self.linkedin_url, &other.linkedin_url);
  }
}
