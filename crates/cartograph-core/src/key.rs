//! Key derivation and structural key validation.
//!
//! Every entity key has the shape `#<kind>#<field>#<field>...`. A key is a
//! pure function of the entity's identity fields, so two observations of the
//! same thing always collide on the same key. Keys longer than
//! [`MAX_KEY_LEN`] bytes are truncated rather than rejected; past that length
//! uniqueness is no longer guaranteed.
//!
//! Validation is deliberately independent of derivation: [`is_well_formed`]
//! checks the stored shape of a key without access to the identity fields,
//! which lets a store detect corrupted rows.

use std::sync::LazyLock;

use regex::Regex;

use crate::{model::EntityKind, relationship::Label};

/// Upper bound on the byte length of any entity or relationship key.
pub const MAX_KEY_LEN: usize = 2048;

// ─── Derivation ──────────────────────────────────────────────────────────────

/// Build `#<kind>#<field>#<field>...` and truncate it to [`MAX_KEY_LEN`].
///
/// Empty fields are kept as empty segments, so the result is always
/// syntactically a key even when identity fields are missing.
pub fn compose(kind: EntityKind, fields: &[&str]) -> String {
  let prefix = kind.prefix();
  let capacity = 1
    + prefix.len()
    + fields.iter().map(|f| f.len() + 1).sum::<usize>();

  let mut key = String::with_capacity(capacity);
  key.push('#');
  key.push_str(prefix);
  for field in fields {
    key.push('#');
    key.push_str(field);
  }
  truncate(key)
}

/// Like [`compose`], but lowercases every field first.
///
/// Only the key is folded; display fields on the entity keep their case.
pub fn compose_folded(kind: EntityKind, fields: &[&str]) -> String {
  let folded: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
  let refs: Vec<&str> = folded.iter().map(String::as_str).collect();
  compose(kind, &refs)
}

/// Relationship key: `<source>#<LABEL><target>`.
///
/// There is no separator between the label and the target key. Target keys
/// begin with `#`, so the marker reads `#LABEL#`. Persisted relationship
/// keys depend on this exact layout.
pub fn relationship(source: &str, label: Label, target: &str) -> String {
  let label = label.as_ref();
  let mut key =
    String::with_capacity(source.len() + label.len() + target.len() + 1);
  key.push_str(source);
  key.push('#');
  key.push_str(label);
  key.push_str(target);
  truncate(key)
}

/// Cut `key` down to at most [`MAX_KEY_LEN`] bytes on a char boundary.
pub fn truncate(mut key: String) -> String {
  if key.len() > MAX_KEY_LEN {
    let mut end = MAX_KEY_LEN;
    while !key.is_char_boundary(end) {
      end -= 1;
    }
    key.truncate(end);
  }
  key
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// CPE 2.3 formatted string: `cpe:2.3:<part>` followed by ten components,
/// any of which may contain backslash-escaped characters.
const CPE_23: &str = r"cpe:2\.3:[aho*\-](?::(?:[^:\\]|\\.)+){10}";

static ASSET: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^#asset#[^#]+#.+$").unwrap());

static WEBAPPLICATION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^#webapplication#https?://[^\s/?#]+\S*$").unwrap()
});

static WEBPAGE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^#webpage#https?://[^\s/?#]+\S*$").unwrap()
});

static PERSON: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^#person#(?:[^#]+#.*|[^#]*#.+)$").unwrap()
});

static TECHNOLOGY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!("^#technology#{CPE_23}$")).unwrap()
});

static ORGANIZATION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^#organization#.+$").unwrap());

static JOB: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^#job#[^#]+#.+#[^#]+$").unwrap());

static RELATIONSHIP: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^#.*#[A-Z_]+#.*$").unwrap());

/// Whether `key` has the stored shape expected for `kind`.
pub fn is_well_formed(kind: EntityKind, key: &str) -> bool {
  if key.len() > MAX_KEY_LEN {
    return false;
  }
  if is_truncated(key) {
    return key
      .strip_prefix('#')
      .and_then(|rest| rest.strip_prefix(kind.prefix()))
      .is_some_and(|rest| rest.starts_with('#'));
  }
  let pattern = match kind {
    EntityKind::Asset => &ASSET,
    EntityKind::WebApplication => &WEBAPPLICATION,
    EntityKind::Webpage => &WEBPAGE,
    EntityKind::Person => &PERSON,
    EntityKind::Technology => &TECHNOLOGY,
    EntityKind::Organization => &ORGANIZATION,
    EntityKind::Job => &JOB,
  };
  pattern.is_match(key)
}

/// Whether `key` has the shape of a relationship key carrying `label`.
///
/// A truncated key may have lost its label marker, so only its leading `#`
/// is checked.
pub fn is_well_formed_relationship(key: &str, label: Label) -> bool {
  if key.len() > MAX_KEY_LEN {
    return false;
  }
  if is_truncated(key) {
    return key.starts_with('#');
  }
  RELATIONSHIP.is_match(key) && key.contains(&format!("#{}#", label.as_ref()))
}

/// Whether `key` may have been cut by [`truncate`]. A char-boundary cut
/// drops at most three bytes below [`MAX_KEY_LEN`].
pub fn is_truncated(key: &str) -> bool { key.len() + 3 >= MAX_KEY_LEN }

/// Whether `cpe` is a CPE 2.3 formatted-string binding.
pub fn is_cpe23(cpe: &str) -> bool {
  static CPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{CPE_23}$")).unwrap());
  CPE.is_match(cpe)
}
