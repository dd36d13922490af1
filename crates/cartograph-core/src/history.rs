//! The history ledger attached to every lifecycle-bearing entity.
//!
//! Entries are appended by [`crate::lifecycle::Lifecycle::merge`] and never
//! mutated afterwards. They are derived purely from the values being merged,
//! so re-applying a merge against a stale copy during a retry produces the
//! same entry instead of a second, divergent one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{source::Source, status::Status};

/// One recorded status transition or discovery event.
///
/// An entry with an unset `from` and a set `to` is a seed promotion marker;
/// ordinary transitions always carry both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub from:    Status,
  pub to:      Status,
  pub by:      Source,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub comment: String,
  pub updated: DateTime<Utc>,
}

impl HistoryEntry {
  pub fn is_promotion(&self) -> bool { !self.from.is_set() && self.to.is_set() }
}

/// Insertion-ordered ledger of [`HistoryEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
  entries: Vec<HistoryEntry>,
}

impl History {
  pub fn new() -> Self { Self::default() }

  /// Record an ordinary `from → to` transition.
  pub fn record_transition(
    &mut self,
    from: Status,
    to: Status,
    by: Source,
    comment: &str,
    at: DateTime<Utc>,
  ) {
    self.entries.push(HistoryEntry {
      from,
      to,
      by,
      comment: comment.to_owned(),
      updated: at,
    });
  }

  /// Record a seed promotion marker landing on `to`.
  pub fn record_promotion(
    &mut self,
    to: Status,
    by: Source,
    comment: &str,
    at: DateTime<Utc>,
  ) {
    self.record_transition(Status::Unset, to, by, comment, at);
  }

  pub fn entries(&self) -> &[HistoryEntry] { &self.entries }

  pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn last(&self) -> Option<&HistoryEntry> { self.entries.last() }

  pub fn promotions(&self) -> impl Iterator<Item = &HistoryEntry> {
    self.entries.iter().filter(|e| e.is_promotion())
  }

  /// Drop the oldest entries so at most `limit` remain, keeping order.
  pub fn retain_newest(&mut self, limit: usize) {
    if self.entries.len() > limit {
      let excess = self.entries.len() - limit;
      self.entries.drain(..excess);
    }
  }
}

impl<'a> IntoIterator for &'a History {
  type Item = &'a HistoryEntry;
  type IntoIter = std::slice::Iter<'a, HistoryEntry>;

  fn into_iter(self) -> Self::IntoIter { self.entries.iter() }
}

impl FromIterator<HistoryEntry> for History {
  fn from_iter<I: IntoIterator<Item = HistoryEntry>>(iter: I) -> Self {
    Self { entries: iter.into_iter().collect() }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  #[test]
  fn entries_keep_insertion_order() {
    let mut history = History::new();
    history.record_transition(
      Status::Pending,
      Status::Active,
      Source::Discovered,
      "",
      at(1),
    );
    history.record_transition(
      Status::Active,
      Status::Frozen,
      Source::Discovered,
      "out of scope",
      at(2),
    );

    let tos: Vec<Status> = history.iter().map(|e| e.to).collect();
    assert_eq!(tos, [Status::Active, Status::Frozen]);
    assert_eq!(history.last().unwrap().comment, "out of scope");
  }

  #[test]
  fn promotion_marker_is_distinguishable() {
    let mut history = History::new();
    history.record_transition(
      Status::Pending,
      Status::Active,
      Source::Seed,
      "",
      at(1),
    );
    history.record_promotion(Status::Active, Source::Seed, "", at(1));

    assert_eq!(history.promotions().count(), 1);
    assert!(!history.entries()[0].is_promotion());
    assert!(history.entries()[1].is_promotion());
  }

  #[test]
  fn retain_newest_drops_from_the_front() {
    let mut history: History = (0..5)
      .map(|i| HistoryEntry {
        from:    Status::Pending,
        to:      Status::Active,
        by:      Source::Discovered,
        comment: i.to_string(),
        updated: at(i),
      })
      .collect();
    history.retain_newest(2);

    let comments: Vec<&str> =
      history.iter().map(|e| e.comment.as_str()).collect();
    assert_eq!(comments, ["3", "4"]);
  }

  #[test]
  fn serializes_as_a_plain_list() {
    let mut history = History::new();
    history.record_promotion(Status::Active, Source::Seed, "", at(0));
    let json = serde_json::to_value(&history).unwrap();
    assert!(json.is_array());
    assert_eq!(json[0]["from"], "");
    assert_eq!(json[0]["to"], "A");
    assert_eq!(json[0]["by"], "seed");
  }
}
