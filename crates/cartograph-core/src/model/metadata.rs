//! Registration and network-ownership details attached to assets.
//!
//! Every field is merged explicitly: a non-empty incoming scalar wins on
//! [`Metadata::merge`] and fills a gap on [`Metadata::visit`]; list fields
//! are unioned on merge.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  lifecycle::{backfill, backfill_list, overwrite, union},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
  #[serde(skip_serializing_if = "String::is_empty")]
  pub asn_number: String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub asn_name:   String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub asn_range:  String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub asn_path:   String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub country:    String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub city:       String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub registrar:  String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub registrant: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub emails:     Vec<String>,
}

impl Metadata {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn merge(&mut self, incoming: &Metadata) {
    overwrite(&mut self.asn_number, &incoming.asn_number);
    overwrite(&mut self.asn_name, &incoming.asn_name);
    overwrite(&mut self.asn_range, &incoming.asn_range);
    overwrite(&mut self.asn_path, &incoming.asn_path);
    overwrite(&mut self.country, &incoming.country);
    overwrite(&mut self.city, &incoming.city);
    overwrite(&mut self.registrar, &incoming.registrar);
    overwrite(&mut self.registrant, &incoming.registrant);
    union(&mut self.emails, &incoming.emails);
  }

  pub fn visit(&mut self, incoming: &Metadata) {
    backfill(&mut self.asn_number, &incoming.asn_number);
    backfill(&mut self.asn_name, &incoming.asn_name);
    backfill(&mut self.asn_range, &incoming.asn_range);
    backfill(&mut self.asn_path, &incoming.asn_path);
    backfill(&mut self.country, &incoming.country);
    backfill(&mut self.city, &incoming.city);
    backfill(&mut self.registrar, &incoming.registrar);
    backfill(&mut self.registrant, &incoming.registrant);
    backfill_list(&mut self.emails, &incoming.emails);
  }

  /// The AS number, if set. Accepts an optional `AS` prefix.
  pub fn asn(&self) -> Result<Option<u32>> {
    if self.asn_number.is_empty() {
      return Ok(None);
    }
    let digits = self
      .asn_number
      .strip_prefix("AS")
      .or_else(|| self.asn_number.strip_prefix("as"))
      .unwrap_or(&self.asn_number);
    digits.parse().map(Some).map_err(|_| Error::NumberParse {
      field: "asn_number",
      value: self.asn_number.clone(),
    })
  }
}
