//! Lifecycle fields shared by every node variant, and the Merge/Visit
//! combination protocol over them.
//!
//! [`Lifecycle::merge`] applies an authoritative re-evaluation: status
//! changes are recorded in the history ledger and non-empty scalars win.
//! [`Lifecycle::visit`] is a liveness refresh for an entity that was merely
//! seen again: it back-fills gaps and never overwrites populated fields or
//! records history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  history::History,
  hook::default_now,
  source::Source,
  status::{MacroState, Status},
  ttl,
};

/// Key, status, provenance, and expiry for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
  /// Canonical identity; derived by hooks, never supplied directly.
  #[serde(default)]
  pub key:     String,
  #[serde(default)]
  pub status:  Status,
  #[serde(default)]
  pub source:  Source,
  /// Absolute Unix-seconds expiry; zero is permanent.
  #[serde(default)]
  pub ttl:     i64,
  /// The first discoverer. Set once.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub origin:  String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub comment: String,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
  #[serde(default)]
  pub visited: Option<DateTime<Utc>>,
  #[serde(default)]
  pub history: History,
  /// Set by a seed promotion; tells the store to attach the `Seed` label
  /// without re-deriving the key. Not persisted.
  #[serde(skip)]
  pub pending_seed_label: bool,
}

impl Lifecycle {
  /// Fill unset status, source, and timestamps. A freshly created active,
  /// non-permanent node also gets `ttl_hours` of lifetime.
  pub fn defaulted(&mut self, ttl_hours: Option<i64>) {
    let fresh = self.created.is_none();
    if !self.status.is_set() {
      self.status = Status::Active;
    }
    if self.source == Source::Unset {
      self.source = Source::Discovered;
    }
    default_now(&mut self.created);
    if self.visited.is_none() {
      self.visited = self.created;
    }
    if let Some(hours) = ttl_hours
      && fresh
      && self.ttl == 0
    {
      self.ttl = ttl::future(hours);
    }
    self.ttl = ttl::enforce(self.status, self.source, self.ttl);
  }

  pub fn is_seed(&self) -> bool { self.source == Source::Seed }

  // ── Merge ───────────────────────────────────────────────────────────────

  /// Fold an authoritative observation into `self`.
  ///
  /// History timestamps come from `incoming.visited`, so merging the same
  /// pair twice yields identical ledgers.
  pub fn merge(&mut self, incoming: &Lifecycle) {
    let at = incoming.visited.unwrap_or_else(Utc::now);

    if incoming.status.is_set() && incoming.status != self.status {
      // Adopting a first status is not a transition.
      if self.status.is_set() {
        self.history.record_transition(
          self.status,
          incoming.status,
          incoming.source,
          &incoming.comment,
          at,
        );
      }
      self.status = incoming.status;
    }

    if self.origin.is_empty() && !incoming.origin.is_empty() {
      self.origin.clone_from(&incoming.origin);
    }
    if !incoming.comment.is_empty() {
      self.comment.clone_from(&incoming.comment);
    }
    if self.created.is_none() {
      self.created = incoming.created;
    }
    if incoming.visited.is_some() {
      self.visited = incoming.visited;
    }

    if incoming.source == Source::Seed && self.source != Source::Seed {
      self.history.record_promotion(
        self.status,
        incoming.source,
        &incoming.comment,
        at,
      );
      self.source = Source::Seed;
      self.pending_seed_label = true;
    } else {
      self.source = self.source.reconcile(incoming.source);
    }

    if incoming.ttl != 0 {
      self.ttl = incoming.ttl;
    }
    self.ttl = ttl::enforce(self.status, self.source, self.ttl);
  }

  // ── Visit ───────────────────────────────────────────────────────────────

  /// Refresh `self` from an incidental re-sighting.
  pub fn visit(&mut self, incoming: &Lifecycle) {
    if incoming.visited.is_some() {
      self.visited = incoming.visited;
    }

    // Only a speculative self-discovered node is confirmed by a sighting.
    let confirmed = self.source == Source::Discovered
      && self.status.is_macro(MacroState::Pending)
      && incoming.status.is_active();
    if confirmed {
      self.status = incoming.status;
      // The zero TTL came from being pending, not from permanence.
      self.ttl = incoming.ttl;
    } else if self.status.is_active() && self.ttl != 0 {
      self.ttl = incoming.ttl;
    }

    if self.key.is_empty() {
      self.key.clone_from(&incoming.key);
    }
    if !self.status.is_set() {
      self.status = incoming.status;
    }
    if self.source == Source::Unset {
      self.source = incoming.source;
    }
    if self.origin.is_empty() {
      self.origin.clone_from(&incoming.origin);
    }
    if self.comment.is_empty() {
      self.comment.clone_from(&incoming.comment);
    }
    if self.created.is_none() {
      self.created = incoming.created;
    }

    self.ttl = ttl::enforce(self.status, self.source, self.ttl);
  }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

/// Merge rule for a scalar: a non-empty incoming value wins.
pub(crate) fn overwrite(field: &mut String, incoming: &str) {
  if !incoming.is_empty() && field.as_str() != incoming {
    incoming.clone_into(field);
  }
}

/// Visit rule for a scalar: fill only when empty.
pub(crate) fn backfill(field: &mut String, incoming: &str) {
  if field.is_empty() && !incoming.is_empty() {
    incoming.clone_into(field);
  }
}

/// Merge rule for a collection: union, keeping first-seen order.
pub(crate) fn union(field: &mut Vec<String>, incoming: &[String]) {
  for value in incoming {
    if !field.contains(value) {
      field.push(value.clone());
    }
  }
}

/// Visit rule for a collection: fill only when empty.
pub(crate) fn backfill_list(field: &mut Vec<String>, incoming: &[String]) {
  if field.is_empty() {
    field.extend_from_slice(incoming);
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  fn node(status: Status, source: Source, ttl: i64) -> Lifecycle {
    Lifecycle {
      key: "#asset#example.com#example.com".into(),
      status,
      source,
      ttl,
      created: Some(at(100)),
      visited: Some(at(100)),
      ..Default::default()
    }
  }

  // ── Merge ─────────────────────────────────────────────────────────────

  #[test]
  fn merge_records_status_change() {
    let mut existing = node(Status::Active, Source::Discovered, 5_000);
    let mut incoming = node(Status::Frozen, Source::Discovered, 0);
    incoming.comment = "rejected by user".into();
    incoming.visited = Some(at(200));

    existing.merge(&incoming);

    assert_eq!(existing.status, Status::Frozen);
    assert_eq!(existing.ttl, 0);
    assert_eq!(existing.history.len(), 1);
    let entry = &existing.history.entries()[0];
    assert_eq!(entry.from, Status::Active);
    assert_eq!(entry.to, Status::Frozen);
    assert_eq!(entry.comment, "rejected by user");
    assert_eq!(entry.updated, at(200));
  }

  #[test]
  fn merge_without_status_change_records_nothing() {
    let mut existing = node(Status::Active, Source::Discovered, 5_000);
    let incoming = node(Status::Active, Source::Discovered, 9_000);
    existing.merge(&incoming);
    assert!(existing.history.is_empty());
    assert_eq!(existing.ttl, 9_000);
  }

  #[test]
  fn merge_origin_is_first_writer_wins() {
    let mut existing = node(Status::Active, Source::Discovered, 1);
    let mut incoming = node(Status::Active, Source::Discovered, 1);
    incoming.origin = "subdomain".into();
    existing.merge(&incoming);
    assert_eq!(existing.origin, "subdomain");

    incoming.origin = "portscan".into();
    existing.merge(&incoming);
    assert_eq!(existing.origin, "subdomain");
  }

  #[test]
  fn merge_never_downgrades_seed_to_self() {
    let mut existing = node(Status::Active, Source::Seed, 0);
    let incoming = node(Status::Active, Source::Discovered, 5_000);
    existing.merge(&incoming);
    assert_eq!(existing.source, Source::Seed);
    assert_eq!(existing.ttl, 0);
  }

  #[test]
  fn seed_promotion_leaves_a_single_marker() {
    let mut existing = node(Status::Pending, Source::Discovered, 0);
    let incoming = node(Status::Active, Source::Seed, 5_000);

    existing.merge(&incoming);

    assert_eq!(existing.source, Source::Seed);
    assert_eq!(existing.status, Status::Active);
    assert!(existing.pending_seed_label);
    assert_eq!(existing.ttl, 0);
    let markers: Vec<_> = existing.history.promotions().collect();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].to, Status::Active);
  }

  #[test]
  fn account_observations_keep_a_seed_node_seeded() {
    let mut existing = node(Status::Active, Source::Discovered, 1_000);
    for source in [Source::Seed, Source::Account, Source::Seed, Source::Account, Source::Seed] {
      existing.merge(&node(Status::Active, source, 0));
      assert_eq!(existing.source, Source::Seed);
    }
    assert_eq!(existing.history.promotions().count(), 1);
  }

  #[test]
  fn merge_is_idempotent() {
    let mut existing = node(Status::Active, Source::Discovered, 5_000);
    existing.origin = "dns".into();
    let snapshot = existing.clone();
    existing.merge(&snapshot);
    assert_eq!(existing, snapshot);
  }

  // ── Visit ─────────────────────────────────────────────────────────────

  #[test]
  fn visit_refreshes_liveness_without_touching_state() {
    let mut existing = node(Status::Frozen, Source::Discovered, 0);
    let mut incoming = node(Status::Active, Source::Discovered, 5_000);
    incoming.visited = Some(at(300));

    existing.visit(&incoming);

    assert_eq!(existing.visited, Some(at(300)));
    assert_eq!(existing.status, Status::Frozen);
    assert_eq!(existing.ttl, 0);
    assert!(existing.history.is_empty());
  }

  #[test]
  fn visit_confirms_pending_self_discoveries() {
    let mut existing = node(Status::Pending, Source::Discovered, 0);
    let incoming = node(Status::ActiveHigh, Source::Discovered, 5_000);
    existing.visit(&incoming);
    assert_eq!(existing.status, Status::ActiveHigh);
    assert_eq!(existing.ttl, 5_000);
    assert!(existing.history.is_empty());
  }

  #[test]
  fn visit_does_not_confirm_seeded_pending_nodes() {
    let mut existing = node(Status::Pending, Source::Seed, 0);
    let incoming = node(Status::Active, Source::Discovered, 5_000);
    existing.visit(&incoming);
    assert_eq!(existing.status, Status::Pending);
  }

  #[test]
  fn visit_ttl_refresh_rules() {
    // Active with a finite TTL: refreshed.
    let mut finite = node(Status::Active, Source::Discovered, 1_000);
    finite.visit(&node(Status::Active, Source::Discovered, 2_000));
    assert_eq!(finite.ttl, 2_000);

    // Incoming permanence propagates.
    let mut finite = node(Status::Active, Source::Discovered, 1_000);
    finite.visit(&node(Status::Active, Source::Discovered, 0));
    assert_eq!(finite.ttl, 0);

    // A permanent record never picks up a finite TTL.
    let mut permanent = node(Status::Active, Source::Discovered, 0);
    permanent.visit(&node(Status::Active, Source::Discovered, 2_000));
    assert_eq!(permanent.ttl, 0);
  }

  #[test]
  fn visit_backfills_but_never_overwrites() {
    let mut existing = node(Status::Active, Source::Discovered, 1_000);
    existing.comment = "original".into();
    let mut incoming = node(Status::Active, Source::Discovered, 1_000);
    incoming.comment = "replacement".into();
    incoming.origin = "crawler".into();

    existing.visit(&incoming);

    assert_eq!(existing.comment, "original");
    assert_eq!(existing.origin, "crawler");
  }

  #[test]
  fn visit_never_promotes_source() {
    let mut existing = node(Status::Active, Source::Discovered, 1_000);
    existing.visit(&node(Status::Active, Source::Seed, 0));
    assert_eq!(existing.source, Source::Discovered);
    assert!(!existing.pending_seed_label);
  }

  #[test]
  fn visit_is_idempotent() {
    let mut existing = node(Status::Pending, Source::Discovered, 0);
    let snapshot = existing.clone();
    existing.visit(&snapshot);
    assert_eq!(existing, snapshot);
  }

  #[test]
  fn union_keeps_order_and_skips_duplicates() {
    let mut tags = vec!["a".to_owned(), "b".to_owned()];
    union(&mut tags, &["b".to_owned(), "c".to_owned()]);
    assert_eq!(tags, ["a", "b", "c"]);
  }
}
