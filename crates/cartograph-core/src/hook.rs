//! The lifecycle hook runner.
//!
//! Every model type declares an ordered, static list of hooks that turn a
//! raw value into a well-formed one: resolve shorthand fields, normalise
//! identity fields, derive the key, default auxiliary fields. The runner
//! applies them in order and stops at the first failure.
//!
//! Hooks must be idempotent. Construction helpers run the pipeline, apply
//! caller mutations, and run it again, so each hook checks whether its work
//! is already done before touching anything.

use chrono::Utc;

use crate::{Error, Result};

/// A named normalisation step over `T`.
pub struct Hook<T> {
  pub name: &'static str,
  pub run:  fn(&mut T) -> Result<()>,
}

impl<T> Hook<T> {
  pub const fn new(name: &'static str, run: fn(&mut T) -> Result<()>) -> Self {
    Self { name, run }
  }
}

/// A value that carries a hook pipeline.
pub trait Hooked: Sized + 'static {
  /// Populate zero-valued fields before hooks run. Never overwrites a field
  /// that already has a value.
  fn defaulted(&mut self);

  /// The ordered hook pipeline for this type.
  fn hooks() -> &'static [Hook<Self>];
}

/// Run `T`'s hooks over `value` in order.
///
/// The first failing hook aborts the pipeline; `value` is then left partially
/// normalised and must not be persisted.
pub fn run<T: Hooked>(value: &mut T) -> Result<()> {
  for hook in T::hooks() {
    (hook.run)(value).map_err(|e| Error::Hook {
      hook:   hook.name,
      source: Box::new(e),
    })?;
  }
  Ok(())
}

/// Default, hook, apply `configure`, and hook again.
pub fn construct<T: Hooked>(
  mut value: T,
  configure: impl FnOnce(&mut T),
) -> Result<T> {
  value.defaulted();
  run(&mut value)?;
  configure(&mut value);
  run(&mut value)?;
  Ok(value)
}

/// Default and hook `value` with no further mutation.
pub fn prepare<T: Hooked>(value: T) -> Result<T> { construct(value, |_| {}) }

/// Run only the hook called `name`. Unknown names are a no-op.
pub fn run_named<T: Hooked>(value: &mut T, name: &'static str) -> Result<()> {
  match T::hooks().iter().find(|hook| hook.name == name) {
    Some(hook) => (hook.run)(value).map_err(|e| Error::Hook {
      hook:   hook.name,
      source: Box::new(e),
    }),
    None => Ok(()),
  }
}

// ─── Shared hook helpers ─────────────────────────────────────────────────────

/// Trim surrounding whitespace in place; no-op when already trimmed.
pub(crate) fn trim_in_place(field: &mut String) {
  let trimmed = field.trim();
  if trimmed.len() != field.len() {
    *field = trimmed.to_owned();
  }
}

/// Fill an unset timestamp with now.
pub(crate) fn default_now(
  field: &mut Option<chrono::DateTime<Utc>>,
) {
  if field.is_none() {
    *field = Some(Utc::now());
  }
}
