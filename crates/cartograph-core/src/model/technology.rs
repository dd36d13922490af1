//! Technologies identified by their CPE 2.3 name.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Model, lifecycle_labels, set_lifecycle_status};
use crate::{
  Error, Result,
  hook::{Hook, Hooked, trim_in_place},
  key,
  lifecycle::{Lifecycle, backfill, overwrite},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
  #[serde(flatten)]
  pub lifecycle: Lifecycle,
  /// CPE 2.3 formatted string, e.g.
  /// `cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*`.
  #[serde(default)]
  pub cpe:       String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub name:      String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub vendor:    String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version:   String,
}

impl Technology {
  pub fn new(cpe: impl Into<String>) -> Self {
    Self { cpe: cpe.into(), ..Default::default() }
  }
}

/// Split a CPE formatted string on unescaped colons, unescaping components.
fn cpe_components(cpe: &str) -> Vec<String> {
  let mut parts = Vec::new();
  let mut current = String::new();
  let mut chars = cpe.chars();
  while let Some(c) = chars.next() {
    match c {
      '\\' => {
        if let Some(escaped) = chars.next() {
          current.push(escaped);
        }
      }
      ':' => parts.push(std::mem::take(&mut current)),
      _ => current.push(c),
    }
  }
  parts.push(current);
  parts
}

/// `*` (any) and `-` (not applicable) carry no value.
fn meaningful(component: Option<&String>) -> &str {
  match component.map(String::as_str) {
    Some("*" | "-") | None => "",
    Some(value) => value,
  }
}

fn validate(tech: &mut Technology) -> Result<()> {
  trim_in_place(&mut tech.cpe);
  if tech.cpe.is_empty() {
    return Err(Error::MissingField { kind: "technology", field: "cpe" });
  }
  if !key::is_cpe23(&tech.cpe) {
    return Err(Error::InvalidCpe(tech.cpe.clone()));
  }
  Ok(())
}

fn derive_key(tech: &mut Technology) -> Result<()> {
  tech.lifecycle.key = key::compose(EntityKind::Technology, &[&tech.cpe]);
  Ok(())
}

/// Fill vendor, name, and version from the CPE when unset.
fn default_from_cpe(tech: &mut Technology) -> Result<()> {
  let parts = cpe_components(&tech.cpe);
  // cpe : 2.3 : part : vendor : product : version : ...
  if tech.vendor.is_empty() {
    tech.vendor = meaningful(parts.get(3)).to_owned();
  }
  if tech.name.is_empty() {
    tech.name = meaningful(parts.get(4)).to_owned();
  }
  if tech.version.is_empty() {
    tech.version = meaningful(parts.get(5)).to_owned();
  }
  Ok(())
}

impl Hooked for Technology {
  fn defaulted(&mut self) { self.lifecycle.defaulted(None); }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Technology>] = &[
      Hook::new("validate", validate),
      Hook::new("derive-key", derive_key),
      Hook::new("default-from-cpe", default_from_cpe),
    ];
    HOOKS
  }
}

impl Model for Technology {
  const KIND: EntityKind = EntityKind::Technology;

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
    overwrite(&mut self.name, &other.name);
    overwrite(&mut self.vendor, &other.vendor);
    overwrite(&mut self.version, &other.version);
  }

  fn visit(&mut self, other: &Self) {
    self.lifecycle.visit(&other.lifecycle);
    backfill(&mut self.name, &other.name);
    backfill(&mut self.vendor, &other.vendor);
    backfill(&mut self.version, &other.version);
  }
}
