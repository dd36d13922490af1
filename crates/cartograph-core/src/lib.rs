//! Reconciliation core for the cartograph entity graph.
//!
//! Derives stable identity keys for entities and relationships, and combines
//! a freshly observed value with whatever is already persisted. The crate is
//! free of database and network dependencies; storage backends implement
//! [`store::GraphStore`] and call into the planner in [`reconcile`].

pub mod error;
pub mod history;
pub mod hook;
pub mod index;
pub mod key;
pub mod lifecycle;
pub mod model;
pub mod reconcile;
pub mod relationship;
pub mod source;
pub mod status;
pub mod store;
pub mod ttl;

pub use error::{Error, Result};
pub use model::{Entity, EntityKind, Model};
pub use relationship::{Label, Relationship};
