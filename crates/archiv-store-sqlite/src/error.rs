//! Error type for `archiv-store-sqlite`.

use archiv_core::{ErrorClass, ValidationErrors, blob::BlobError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Core(#[from] archiv_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value that does not decode into its domain type.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl Error {
  /// Where this failure falls in the caller-facing taxonomy. Everything that
  /// is not a domain error counts as a storage failure.
  pub fn class(&self) -> ErrorClass {
    match self {
      Self::Core(e) => e.class(),
      _ => ErrorClass::Storage,
    }
  }

  /// The per-field messages, if this is a validation failure.
  pub fn validation(&self) -> Option<&ValidationErrors> {
    match self {
      Self::Core(archiv_core::Error::Validation(errors)) => Some(errors),
      _ => None,
    }
  }
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Core(errors.into()) }
}

impl From<BlobError> for Error {
  fn from(error: BlobError) -> Self { Self::Core(error.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
