//! SQLite backend for the archive.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every store operation runs as one
//! SQLite transaction on that thread, together with the blob store calls it
//! needs.

mod encode;
mod guard;
mod objects;
mod persons;
mod schema;
mod store;

pub mod blobs;
pub mod error;

pub use blobs::FsBlobStore;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
