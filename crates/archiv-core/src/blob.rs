//! Stored files attached to archived objects.
//!
//! Binary content never lives in the database. A [`BlobRef`] record points at
//! bytes held by a [`BlobStore`]; each archived object owns at most one.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard},
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A reference to one externally stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
  pub blob_id:      Uuid,
  /// Name of the file as uploaded.
  pub file_name:    String,
  /// Location inside the blob store, relative to its root.
  pub path:         String,
  /// SHA-256 hex digest of the content.
  pub content_hash: String,
  pub size:         u64,
  pub stored_at:    DateTime<Utc>,
}

/// A file submitted together with an archived object.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name: String,
  pub bytes:     Bytes,
}

impl Upload {
  pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
    Self { file_name: file_name.into(), bytes: bytes.into() }
  }
}

#[derive(Debug, Error)]
pub enum BlobError {
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("blob store unavailable: {0}")]
  Unavailable(String),
}

/// Where uploaded bytes go.
///
/// Synchronous and object-safe: the SQLite backend calls it from
/// inside a transaction on its connection thread, so the file operation and
/// the row writes share one unit of work.
pub trait BlobStore: Send + Sync {
  /// Persist the upload and return the reference to record.
  fn store(&self, upload: &Upload) -> Result<BlobRef, BlobError>;

  /// Delete the bytes behind `blob`.
  ///
  /// Releasing bytes that are already gone succeeds, so a record whose file
  /// vanished can still be deleted or replaced.
  fn release(&self, blob: &BlobRef) -> Result<(), BlobError>;
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// A [`BlobStore`] that keeps content in a map; for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
  blobs: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
  pub fn new() -> Self { Self::default() }

  pub fn contains(&self, blob: &BlobRef) -> bool {
    self.lock().contains_key(&blob.path)
  }

  pub fn get(&self, blob: &BlobRef) -> Option<Bytes> {
    self.lock().get(&blob.path).cloned()
  }

  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.lock().is_empty() }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
    // A poisoned map is still a consistent map.
    self.blobs.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl BlobStore for MemoryBlobStore {
  fn store(&self, upload: &Upload) -> Result<BlobRef, BlobError> {
    let blob_id = Uuid::new_v4();
    let blob = BlobRef {
      blob_id,
      file_name: upload.file_name.clone(),
      path: format!("memory/{blob_id}"),
      content_hash: String::new(),
      size: upload.bytes.len() as u64,
      stored_at: Utc::now(),
    };
    self.lock().insert(blob.path.clone(), upload.bytes.clone());
    Ok(blob)
  }

  fn release(&self, blob: &BlobRef) -> Result<(), BlobError> {
    if self.lock().remove(&blob.path).is_none() {
      tracing::warn!(path = %blob.path, "released blob was already gone");
    }
    Ok(())
  }
}
