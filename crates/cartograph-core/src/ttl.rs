//! Time-to-live arithmetic.
//!
//! A TTL is an absolute Unix-seconds instant after which an entity may be
//! expired by the store. Zero means permanent.

use chrono::{DateTime, Duration, Utc};

use crate::{source::Source, status::Status};

/// Lifetime given to freshly discovered assets.
pub const DEFAULT_TTL_HOURS: i64 = 7 * 24;

/// The instant `hours` from now, as a TTL.
pub fn future(hours: i64) -> i64 { future_from(Utc::now(), hours) }

pub fn future_from(now: DateTime<Utc>, hours: i64) -> i64 {
  (now + Duration::hours(hours)).timestamp()
}

pub fn is_expired(ttl: i64, now: DateTime<Utc>) -> bool {
  ttl != 0 && ttl <= now.timestamp()
}

/// Apply the TTL invariants: only active, non-permanent entities may expire.
pub fn enforce(status: Status, source: Source, ttl: i64) -> i64 {
  if !status.is_active() || source.is_permanent() {
    0
  } else {
    ttl
  }
}
