//! Provenance of an observation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

/// Where an observation came from.
///
/// `seed` and `account` are *permanent* sources: an entity carrying one never
/// expires and is never downgraded by a later `self` observation.
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
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Source {
  #[default]
  #[serde(rename = "")]
  #[strum(serialize = "")]
  Unset,
  /// Found by the platform's own discovery.
  #[serde(rename = "self")]
  #[strum(serialize = "self")]
  Discovered,
  /// Declared in scope by a user.
  Seed,
  /// Imported from a linked account integration.
  Account,
}

impl Source {
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw).map_err(|_| Error::InvalidSource(raw.to_owned()))
  }

  pub fn is_permanent(self) -> bool { matches!(self, Self::Seed | Self::Account) }

  /// Precedence when two observations disagree: `seed` over `account` over
  /// `self`. `Unset` carries no opinion.
  pub fn rank(self) -> u8 {
    match self {
      Self::Unset => 0,
      Self::Discovered => 1,
      Self::Account => 2,
      Self::Seed => 3,
    }
  }

  /// The source an entity should carry after an authoritative observation
  /// from `incoming`: whichever of the two ranks higher.
  pub fn reconcile(self, incoming: Source) -> Source {
    if incoming.rank() > self.rank() { incoming } else { self }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn self_never_downgrades_permanent_sources() {
    assert_eq!(Source::Seed.reconcile(Source::Discovered), Source::Seed);
    assert_eq!(Source::Account.reconcile(Source::Discovered), Source::Account);
  }

  #[test]
  fn unset_is_no_opinion() {
    assert_eq!(Source::Seed.reconcile(Source::Unset), Source::Seed);
    assert_eq!(Source::Unset.reconcile(Source::Discovered), Source::Discovered);
  }

  #[test]
  fn permanent_sources_take_over() {
    assert_eq!(Source::Discovered.reconcile(Source::Seed), Source::Seed);
    assert_eq!(Source::Discovered.reconcile(Source::Account), Source::Account);
    assert_eq!(Source::Account.reconcile(Source::Seed), Source::Seed);
  }

  #[test]
  fn account_never_replaces_seed() {
    assert_eq!(Source::Seed.reconcile(Source::Account), Source::Seed);
  }

  #[test]
  fn wire_names() {
    assert_eq!(Source::Discovered.as_ref(), "self");
    assert_eq!(Source::parse("seed").unwrap(), Source::Seed);
    assert!(Source::parse("manual").is_err());
    assert_eq!(serde_json::to_string(&Source::Discovered).unwrap(), "\"self\"");
  }
}
