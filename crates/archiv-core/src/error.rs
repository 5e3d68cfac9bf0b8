//! Error types for `archiv-core`.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::blob::BlobError;

// ─── Field-scoped validation ─────────────────────────────────────────────────

/// Validation messages collected per field, so that every problem in one
/// submission is reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
  fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  /// Record `message` against `field`.
  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self
      .fields
      .entry(field.to_owned())
      .or_default()
      .push(message.into());
  }

  /// Fold another set of messages into this one.
  pub fn merge(&mut self, other: ValidationErrors) {
    for (field, messages) in other.fields {
      self.fields.entry(field).or_default().extend(messages);
    }
  }

  /// Merge the error side of `result`, passing the success value through.
  pub fn absorb<T>(&mut self, result: Result<T, ValidationErrors>) -> Option<T> {
    match result {
      Ok(value) => Some(value),
      Err(errors) => {
        self.merge(errors);
        None
      }
    }
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  /// Messages recorded for `field`, empty if none.
  pub fn field(&self, field: &str) -> &[String] {
    self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn contains(&self, field: &str, message: &str) -> bool {
    self.field(field).iter().any(|m| m == message)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
    self.fields.iter().map(|(f, m)| (f.as_str(), m.as_slice()))
  }

  /// `Ok(value)` if nothing was recorded, otherwise `Err(self)`.
  pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.fields {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{field}: {message}")?;
        first = false;
      }
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

// ─── Error ───────────────────────────────────────────────────────────────────

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Entity {
  #[strum(to_string = "person")]
  Person,
  #[strum(to_string = "category")]
  Category,
  #[strum(to_string = "archived object")]
  Object,
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Field-scoped; re-present the input with the messages.
  Validation,
  /// A delete was blocked by a dependent reference.
  ReferentialIntegrity,
  NotFound,
  /// Persistence or blob failure; fatal to the operation only.
  Storage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationErrors),

  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("category {name:?} is used by {documents} document(s) and cannot be deleted")]
  CategoryInUse {
    category_id: Uuid,
    name:        String,
    documents:   u64,
  },

  #[error("archived object {0} is in use and cannot be deleted")]
  ObjectInUse(Uuid),

  #[error("blob store error: {0}")]
  Blob(#[from] BlobError),
}

impl Error {
  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  pub fn class(&self) -> ErrorClass {
    match self {
      Self::Validation(_) => ErrorClass::Validation,
      Self::NotFound { .. } => ErrorClass::NotFound,
      Self::CategoryInUse { .. } | Self::ObjectInUse(_) => {
        ErrorClass::ReferentialIntegrity
      }
      Self::Blob(_) => ErrorClass::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
