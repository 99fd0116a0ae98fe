//! Reference store: pair, token and bundle records plus their persistence.
//!
//! The pricing core only sees the [`ReferenceStore`] trait. The indexer keeps
//! everything in a [`MemoryStore`] and checkpoints it as a JSON [`Snapshot`].

pub mod models;
mod snapshot;
mod store;

pub use snapshot::Snapshot;
pub use store::{MemoryStore, ReferenceStore};
