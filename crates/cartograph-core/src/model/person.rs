//! People connected to an organisation's attack surface.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Model, lifecycle_labels, set_lifecycle_status};
use crate::{
  Error, Result,
  hook::{Hook, Hooked, trim_in_place},
  key,
  lifecycle::{Lifecycle, backfill, overwrite},
};

/// A person, identified by `(email, name)`. Either may be empty, not both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  #[serde(flatten)]
  pub lifecycle:    Lifecycle,
  #[serde(default)]
  pub name:         String,
  #[serde(default)]
  pub email:        String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub title:        String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub phone:        String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub linkedin_url: String,
  /// Free-text employer as reported by the source.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub organization: String,
}

impl Person {
  pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
    Self { name: name.into(), email: email.into(), ..Default::default() }
  }
}

fn normalize(person: &mut Person) -> Result<()> {
  trim_in_place(&mut person.name);
  trim_in_place(&mut person.email);
  if person.email.chars().any(|c| c.is_uppercase()) {
    person.email = person.email.to_lowercase();
  }
  Ok(())
}

fn validate(person: &mut Person) -> Result<()> {
  if person.name.is_empty() && person.email.is_empty() {
    return Err(Error::MissingField { kind: "person", field: "name" });
  }
  Ok(())
}

fn derive_key(person: &mut Person) -> Result<()> {
  person.lifecycle.key =
    key::compose_folded(EntityKind::Person, &[&person.email, &person.name]);
  Ok(())
}

impl Hooked for Person {
  fn defaulted(&mut self) { self.lifecycle.defaulted(None); }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Person>] = &[
      Hook::new("normalize", normalize),
      Hook::new("validate", validate),
      Hook::new("derive-key", derive_key),
    ];
    HOOKS
  }
}

impl Model for Person {
  const KIND: EntityKind = EntityKind::Person;

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
    overwrite(&mut self.title, &other.title);
    overwrite(&mut self.phone, &other.phone);
    overwrite(&mut self.linkedin_url, &other.linkedin_url);
    overwrite(&mut self.organization, &other.organization);
  }

  fn visit(&mut self, other: &Self) {
    self.lifecycle.visit(&other.lifecycle);
    backfill(&mut self.title, &other.title);
    backfill(&mut self.phone, &other.phone);
    backfill(&mut self.linkedin_url, &other.linkedin_url);
    backfill(&mut self.organization, &other.organization);
  }
}
