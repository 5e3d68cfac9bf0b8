//! Core types and trait definitions for the archive.
//!
//! No database or filesystem code lives here. The crate owns the validation
//! rules every save goes through (dating exclusivity, person association,
//! person life dates) and the traits that storage backends implement.

// Native `async fn` in trait impls; the trait itself spells out `Send`.
#![allow(async_fn_in_trait)]

pub mod association;
pub mod blob;
pub mod category;
pub mod dating;
pub mod error;
pub mod object;
pub mod person;
pub mod store;

pub use error::{Entity, Error, ErrorClass, Result, ValidationErrors};
