//! Lifecycle status codes for assets and jobs.
//!
//! An asset status is a short code whose first character is the macro-state
//! (`A`ctive, `P`ending, `F`rozen, `D`eleted) and whose remaining characters,
//! if any, qualify it. Only the codes enumerated in [`Status`] are accepted.
//!
//! Jobs use a separate code set (`JQ`, `JR`, `JP`, `JF`) encoded together with
//! the source that queued them, e.g. `JQ#portscan`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

// ─── Asset status ────────────────────────────────────────────────────────────

/// The macro-state encoded by the first character of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroState {
  Active,
  Pending,
  Frozen,
  Deleted,
}

/// The qualifier encoded by the characters after the macro-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubState {
  High,
  Low,
  Passive,
  Rejected,
}

/// Whitelisted asset status codes. The empty code means "not yet set".
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
pub enum Status {
  #[default]
  #[serde(rename = "")]
  #[strum(serialize = "")]
  Unset,
  #[serde(rename = "A")]
  #[strum(serialize = "A")]
  Active,
  #[serde(rename = "AH")]
  #[strum(serialize = "AH")]
  ActiveHigh,
  #[serde(rename = "AL")]
  #[strum(serialize = "AL")]
  ActiveLow,
  #[serde(rename = "AP")]
  #[strum(serialize = "AP")]
  ActivePassive,
  #[serde(rename = "P")]
  #[strum(serialize = "P")]
  Pending,
  #[serde(rename = "F")]
  #[strum(serialize = "F")]
  Frozen,
  #[serde(rename = "FR")]
  #[strum(serialize = "FR")]
  FrozenRejected,
  #[serde(rename = "D")]
  #[strum(serialize = "D")]
  Deleted,
}

impl Status {
  /// Parse a wire code, rejecting anything outside the whitelist.
  pub fn parse(code: &str) -> Result<Self> {
    Self::from_str(code).map_err(|_| Error::InvalidStatus(code.to_owned()))
  }

  pub fn is_set(self) -> bool { self != Self::Unset }

  pub fn macro_state(self) -> Option<MacroState> {
    match self {
      Self::Unset => None,
      Self::Active | Self::ActiveHigh | Self::ActiveLow | Self::ActivePassive => {
        Some(MacroState::Active)
      }
      Self::Pending => Some(MacroState::Pending),
      Self::Frozen | Self::FrozenRejected => Some(MacroState::Frozen),
      Self::Deleted => Some(MacroState::Deleted),
    }
  }

  pub fn sub_state(self) -> Option<SubState> {
    match self {
      Self::ActiveHigh => Some(SubState::High),
      Self::ActiveLow => Some(SubState::Low),
      Self::ActivePassive => Some(SubState::Passive),
      Self::FrozenRejected => Some(SubState::Rejected),
      _ => None,
    }
  }

  pub fn is_macro(self, state: MacroState) -> bool {
    self.macro_state() == Some(state)
  }

  pub fn is_active(self) -> bool { self.is_macro(MacroState::Active) }
}

// ─── Job status ──────────────────────────────────────────────────────────────

/// The execution state of a job.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
pub enum JobState {
  #[default]
  #[strum(serialize = "JQ")]
  Queued,
  #[strum(serialize = "JR")]
  Running,
  #[strum(serialize = "JP")]
  Pass,
  #[strum(serialize = "JF")]
  Fail,
}

impl JobState {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Pass | Self::Fail) }
}

/// A job status as stored: `<code>#<source>`, e.g. `JR#seed`.
///
/// The suffix records who queued the job and survives state changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobStatus {
  pub state:  JobState,
  pub source: String,
}

impl JobStatus {
  pub fn new(state: JobState, source: impl Into<String>) -> Self {
    Self { state, source: source.into() }
  }

  /// Parse `<code>` or `<code>#<source>`.
  pub fn parse(raw: &str) -> Result<Self> {
    let (code, source) = raw.split_once('#').unwrap_or((raw, ""));
    let state = JobState::from_str(code)
      .map_err(|_| Error::InvalidStatus(raw.to_owned()))?;
    Ok(Self { state, source: source.to_owned() })
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.state, self.source)
  }
}

impl TryFrom<String> for JobStatus {
  type Error = Error;

  fn try_from(raw: String) -> Result<Self> { Self::parse(&raw) }
}

impl From<JobStatus> for String {
  fn from(status: JobStatus) -> Self { status.to_string() }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn every_status_code_round_trips_through_parse() {
    for status in Status::iter() {
      assert_eq!(Status::parse(status.as_ref()).unwrap(), status);
    }
  }

  #[test]
  fn unknown_codes_are_rejected() {
    assert!(matches!(Status::parse("X"), Err(Error::InvalidStatus(_))));
    assert!(matches!(Status::parse("AX"), Err(Error::InvalidStatus(_))));
    assert!(matches!(Status::parse("a"), Err(Error::InvalidStatus(_))));
  }

  #[test]
  fn macro_state_is_the_first_character() {
    for status in Status::iter().filter(|s| s.is_set()) {
      let expected = match &status.as_ref()[..1] {
        "A" => MacroState::Active,
        "P" => MacroState::Pending,
        "F" => MacroState::Frozen,
        "D" => MacroState::Deleted,
        other => panic!("unexpected macro code {other}"),
      };
      assert_eq!(status.macro_state(), Some(expected));
    }
    assert_eq!(Status::Unset.macro_state(), None);
  }

  #[test]
  fn only_pass_and_fail_are_terminal() {
    let terminal: Vec<_> = JobState::iter().filter(|s| s.is_terminal()).collect();
    assert_eq!(terminal, [JobState::Pass, JobState::Fail]);
  }

  #[test]
  fn sub_states() {
    assert_eq!(Status::ActivePassive.sub_state(), Some(SubState::Passive));
    assert_eq!(Status::FrozenRejected.sub_state(), Some(SubState::Rejected));
    assert_eq!(Status::Active.sub_state(), None);
  }

  #[test]
  fn status_serializes_as_code() {
    let json = serde_json::to_string(&Status::ActiveHigh).unwrap();
    assert_eq!(json, "\"AH\"");
    let back: Status = serde_json::from_str("\"\"").unwrap();
    assert_eq!(back, Status::Unset);
  }

  #[test]
  fn job_status_keeps_its_source_suffix() {
    let status = JobStatus::parse("JR#portscan").unwrap();
    assert_eq!(status.state, JobState::Running);
    assert_eq!(status.source, "portscan");
    assert_eq!(status.to_string(), "JR#portscan");

    let json = serde_json::to_string(&status).unwrap();
    assert_eq!(json, "\"JR#portscan\"");
    assert!(serde_json::from_str::<JobStatus>("\"JX#self\"").is_err());
  }
}
