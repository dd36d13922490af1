//! Assets: hosts, addresses, ranges, and other things that can be scanned.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::{
  EntityKind, Metadata, Model, lifecycle_labels, set_lifecycle_status,
  take_seed_label,
};
use crate::{
  Error, Result,
  hook::{Hook, Hooked, trim_in_place},
  key,
  lifecycle::{Lifecycle, union},
  ttl::DEFAULT_TTL_HOURS,
};

// ─── Class ───────────────────────────────────────────────────────────────────

/// What an asset's `name` denotes, derived by the `classify` hook.
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
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetClass {
  #[default]
  #[serde(rename = "")]
  #[strum(serialize = "")]
  Unknown,
  Ipv4,
  Ipv6,
  Cidr,
  Domain,
  Tld,
}

impl AssetClass {
  /// Classify a name. Returns [`AssetClass::Unknown`] for anything that is
  /// not an address, range, or hostname, e.g. a cloud account number.
  pub fn of(name: &str) -> Self {
    if let Ok(ip) = name.parse::<IpAddr>() {
      return match ip {
        IpAddr::V4(_) => Self::Ipv4,
        IpAddr::V6(_) => Self::Ipv6,
      };
    }
    if parse_cidr(name).is_some() {
      return Self::Cidr;
    }
    if is_hostname(name) {
      return if name.contains('.') { Self::Domain } else { Self::Tld };
    }
    Self::Unknown
  }
}

fn parse_cidr(name: &str) -> Option<(IpAddr, u8)> {
  let (addr, bits) = name.split_once('/')?;
  let addr: IpAddr = addr.parse().ok()?;
  let bits: u8 = bits.parse().ok()?;
  let max = if addr.is_ipv4() { 32 } else { 128 };
  (bits <= max).then_some((addr, bits))
}

fn is_hostname(name: &str) -> bool {
  !name.is_empty()
    && name.len() <= 253
    && name.split('.').all(|label| {
      !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
    && name.chars().any(|c| c.is_ascii_alphabetic())
}

/// Whether `ip` is in a private, loopback, link-local, or unique-local range.
fn is_private_ip(ip: IpAddr) -> bool {
  match ip {
    IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
    IpAddr::V6(v6) => {
      let first = v6.segments()[0];
      v6.is_loopback()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
    }
  }
}

// ─── Asset ───────────────────────────────────────────────────────────────────

/// A scannable thing, identified by `(dns, name)`: a domain and one of its
/// names or addresses, or an account and one of its identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
  #[serde(flatten)]
  pub lifecycle:  Lifecycle,
  #[serde(default)]
  pub dns:        String,
  #[serde(default)]
  pub name:       String,
  /// Shorthand for `dns`; resolved and cleared by hooks.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub group:      String,
  /// Shorthand for `name`; resolved and cleared by hooks.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub identifier: String,
  #[serde(default)]
  pub class:      AssetClass,
  #[serde(default)]
  pub private:    bool,
  #[serde(default, skip_serializing_if = "Metadata::is_empty")]
  pub metadata:   Metadata,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags:       Vec<String>,
}

impl Asset {
  /// An unhooked asset; run [`crate::hook::prepare`] before use.
  pub fn new(dns: impl Into<String>, name: impl Into<String>) -> Self {
    Self { dns: dns.into(), name: name.into(), ..Default::default() }
  }

  /// An unhooked asset from the group/identifier shorthand.
  pub fn from_group(
    group: impl Into<String>,
    identifier: impl Into<String>,
  ) -> Self {
    Self {
      group: group.into(),
      identifier: identifier.into(),
      ..Default::default()
    }
  }

  /// The key for `(dns, name)` without constructing an asset.
  pub fn key_for(dns: &str, name: &str) -> String {
    key::compose_folded(EntityKind::Asset, &[dns, name])
  }
}

// ── Hooks ────────────────────────────────────────────────────────────────────

/// Move `group`/`identifier` into `dns`/`name`. A bare name is its own dns.
fn resolve_shorthand(asset: &mut Asset) -> Result<()> {
  if !asset.group.is_empty() {
    if asset.dns.is_empty() {
      asset.dns = std::mem::take(&mut asset.group);
    } else {
      asset.group.clear();
    }
  }
  if !asset.identifier.is_empty() {
    if asset.name.is_empty() {
      asset.name = std::mem::take(&mut asset.identifier);
    } else {
      asset.identifier.clear();
    }
  }
  if asset.dns.is_empty() && !asset.name.is_empty() {
    asset.dns = asset.name.clone();
  }
  Ok(())
}

/// Trim whitespace and a trailing root dot.
fn normalize(asset: &mut Asset) -> Result<()> {
  for field in [&mut asset.dns, &mut asset.name] {
    trim_in_place(field);
    let bare = field.trim_end_matches('.').len();
    if bare > 0 && bare < field.len() {
      field.truncate(bare);
    }
  }
  Ok(())
}

fn validate(asset: &mut Asset) -> Result<()> {
  if asset.dns.is_empty() {
    return Err(Error::MissingField { kind: "asset", field: "dns" });
  }
  if asset.name.is_empty() {
    return Err(Error::MissingField { kind: "asset", field: "name" });
  }
  asset.metadata.asn()?;
  Ok(())
}

fn derive_key(asset: &mut Asset) -> Result<()> {
  asset.lifecycle.key = Asset::key_for(&asset.dns, &asset.name);
  Ok(())
}

/// Derive `class` and `private` from `name`. Recomputed every pass since
/// both are pure functions of the name; an unclassifiable name keeps
/// whatever class was already set.
fn classify(asset: &mut Asset) -> Result<()> {
  let class = AssetClass::of(&asset.name);
  if class == AssetClass::Unknown {
    return Ok(());
  }
  asset.class = class;
  asset.private = match class {
    AssetClass::Ipv4 | AssetClass::Ipv6 => {
      asset.name.parse().map(is_private_ip).unwrap_or(false)
    }
    AssetClass::Cidr => parse_cidr(&asset.name)
      .map(|(addr, _)| is_private_ip(addr))
      .unwrap_or(false),
    _ => false,
  };
  Ok(())
}

impl Hooked for Asset {
  fn defaulted(&mut self) {
    self.lifecycle.defaulted(Some(DEFAULT_TTL_HOURS));
  }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Asset>] = &[
      Hook::new("resolve-shorthand", resolve_shorthand),
      Hook::new("normalize", normalize),
      Hook::new("validate", validate),
      Hook::new("derive-key", derive_key),
      Hook::new("classify", classify),
    ];
    HOOKS
  }
}

impl Model for Asset {
  const KIND: EntityKind = EntityKind::Asset;

  fn key(&self) -> &str { &self.lifecycle.key }

  fn labels(&self) -> Vec<&'static str> {
    lifecycle_labels(Self::KIND, &self.lifecycle, true)
  }

  fn status(&self) -> String { self.lifecycle.status.to_string() }

  fn set_status(&mut self, status: &str) -> Result<()> {
    set_lifecycle_status(&mut self.lifecycle, status)
  }

  fn merge(&mut self, other: &Self) {
    self.lifecycle.merge(&other.lifecycle);
    if other.class != AssetClass::Unknown {
      self.class = other.class;
      self.private = other.private;
    }
    self.metadata.merge(&other.metadata);
    union(&mut self.tags, &other.tags);
  }

  fn visit(&mut self, other: &Self) {
    self.lifecycle.visit(&other.lifecycle);
    if self.class == AssetClass::Unknown {
      self.class = other.class;
      self.private = other.private;
    }
    self.metadata.visit(&other.metadata);
    if self.tags.is_empty() {
      self.tags.clone_from(&other.tags);
    }
  }

  fn take_pending_labels(&mut self) -> Vec<&'static str> {
    take_seed_label(&mut self.lifecycle)
  }
}
