//! Jobs: one capability run against one target.
//!
//! A job's timestamps follow its state. Requeueing clears both; entering
//! `Running` stamps `started` once; entering a terminal state stamps
//! `finished` once. Re-entering a state never moves an existing stamp.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityKind, Model};
use crate::{
  Error, Result,
  hook::{Hook, Hooked, default_now, trim_in_place},
  key,
  lifecycle::{backfill, overwrite},
  source::Source,
  status::{JobState, JobStatus},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
  #[serde(default)]
  pub key:        String,
  /// Target asset's `dns`.
  #[serde(default)]
  pub dns:        String,
  /// Target asset's `name`.
  #[serde(default)]
  pub name:       String,
  #[serde(default)]
  pub capability: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub group:      String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub identifier: String,
  #[serde(default)]
  pub status:     JobStatus,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub comment:    String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub config:     BTreeMap<String, String>,
  #[serde(default)]
  pub created:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub started:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub finished:   Option<DateTime<Utc>>,
}

impl Job {
  /// An unhooked job running `capability` against `(dns, name)`.
  pub fn new(
    dns: impl Into<String>,
    name: impl Into<String>,
    capability: impl Into<String>,
  ) -> Self {
    Self {
      dns: dns.into(),
      name: name.into(),
      capability: capability.into(),
      ..Default::default()
    }
  }

  pub fn state(&self) -> JobState { self.status.state }

  /// Move to `state` now.
  pub fn update(&mut self, state: JobState) { self.update_at(state, Utc::now()) }

  /// Move to `state` at `now`, stamping timestamps per the job state machine.
  pub fn update_at(&mut self, state: JobState, now: DateTime<Utc>) {
    self.status.state = state;
    self.updated = Some(now);
    if state == JobState::Queued {
      self.started = None;
      self.finished = None;
    } else if state.is_terminal() {
      if self.finished.is_none() {
        self.finished = Some(now);
      }
    } else if self.started.is_none() {
      self.started = Some(now);
    }
  }
}

fn resolve_shorthand(job: &mut Job) -> Result<()> {
  if !job.group.is_empty() {
    if job.dns.is_empty() {
      job.dns = std::mem::take(&mut job.group);
    } else {
      job.group.clear();
    }
  }
  if !job.identifier.is_empty() {
    if job.name.is_empty() {
      job.name = std::mem::take(&mut job.identifier);
    } else {
      job.identifier.clear();
    }
  }
  Ok(())
}

fn normalize(job: &mut Job) -> Result<()> {
  trim_in_place(&mut job.dns);
  trim_in_place(&mut job.name);
  trim_in_place(&mut job.capability);
  Ok(())
}

fn validate(job: &mut Job) -> Result<()> {
  for (field, value) in [
    ("dns", &job.dns),
    ("name", &job.name),
    ("capability", &job.capability),
  ] {
    if value.is_empty() {
      return Err(Error::MissingField { kind: "job", field });
    }
  }
  Ok(())
}

fn derive_key(job: &mut Job) -> Result<()> {
  job.key = key::compose_folded(
    EntityKind::Job,
    &[&job.dns, &job.name, &job.capability],
  );
  Ok(())
}

impl Hooked for Job {
  fn defaulted(&mut self) {
    default_now(&mut self.created);
    if self.updated.is_none() {
      self.updated = self.created;
    }
    if self.status.source.is_empty() {
      self.status.source = Source::Discovered.to_string();
    }
  }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Job>] = &[
      Hook::new("resolve-shorthand", resolve_shorthand),
      Hook::new("normalize", normalize),
      Hook::new("validate", validate),
      Hook::new("derive-key", derive_key),
    ];
    HOOKS
  }
}

impl Model for Job {
  const KIND: EntityKind = EntityKind::Job;

  fn key(&self) -> &str { &self.key }

  fn labels(&self) -> Vec<&'static str> { vec![Self::KIND.label()] }

  fn status(&self) -> String { self.status.to_string() }

  /// Parse `<code>[#<source>]` and transition. A missing source suffix
  /// keeps the current one.
  fn set_status(&mut self, status: &str) -> Result<()> {
    let parsed = JobStatus::parse(status)?;
    if !parsed.source.is_empty() {
      self.status.source = parsed.source;
    }
    self.update(parsed.state);
    Ok(())
  }

  fn merge(&mut self, other: &Self) {
    if other.status.state != self.status.state {
      self.update_at(other.status.state, other.updated.unwrap_or_else(Utc::now));
    }
    if other.updated.is_some() {
      self.updated = other.updated;
    }
    if !other.status.source.is_empty() {
      self.status.source.clone_from(&other.status.source);
    }
    overwrite(&mut self.comment, &other.comment);
    for (k, v) in &other.config {
      self.config.insert(k.clone(), v.clone());
    }
    if self.created.is_none() {
      self.created = other.created;
    }
  }

  fn visit(&mut self, other: &Self) {
    if other.updated.is_some() {
      self.updated = other.updated;
    }
    backfill(&mut self.comment, &other.comment);
    for (k, v) in &other.config {
      self.config.entry(k.clone()).or_insert_with(|| v.clone());
    }
    if self.created.is_none() {
      self.created = other.created;
    }
  }
}
