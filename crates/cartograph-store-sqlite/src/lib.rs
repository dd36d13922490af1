//! SQLite backend for the cartograph entity graph.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Writes are optimistic: each row
//! carries a version and an update only lands if the version is unchanged.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_HISTORY_LIMIT, SqliteStore};
