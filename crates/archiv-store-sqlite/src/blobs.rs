//! [`FsBlobStore`]: uploaded files kept on the local filesystem.
//!
//! Files land under `<root>/archived_files/` with a name that is unique per
//! upload, so two uploads of the same file name never collide. The database
//! records the path relative to the root together with a SHA-256 digest.

use std::{
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use archiv_core::blob::{BlobError, BlobRef, BlobStore, Upload};
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Subdirectory of the blob root that holds the archived files.
pub const FILES_DIR: &str = "archived_files";

#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  /// Use `root` as the blob root. Directories are created on first write.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Absolute location of the bytes behind `blob`.
  pub fn locate(&self, blob: &BlobRef) -> PathBuf { self.root.join(&blob.path) }
}

impl BlobStore for FsBlobStore {
  fn store(&self, upload: &Upload) -> Result<BlobRef, BlobError> {
    let blob_id = Uuid::new_v4();
    let relative = format!("{FILES_DIR}/{blob_id}-{}", sanitize(&upload.file_name));
    let target = self.root.join(&relative);

    fs::create_dir_all(self.root.join(FILES_DIR))?;
    let mut file = fs::File::create_new(&target)?;
    if let Err(error) = file.write_all(&upload.bytes).and_then(|()| file.sync_all()) {
      drop(file);
      if let Err(cleanup) = fs::remove_file(&target) {
        tracing::warn!(path = %relative, error = %cleanup, "could not remove partial file");
      }
      return Err(error.into());
    }

    let blob = BlobRef {
      blob_id,
      file_name: upload.file_name.clone(),
      path: relative,
      content_hash: hex::encode(Sha256::digest(&upload.bytes)),
      size: upload.bytes.len() as u64,
      stored_at: Utc::now(),
    };
    tracing::debug!(blob_id = %blob.blob_id, path = %blob.path, size = blob.size, "file stored");
    Ok(blob)
  }

  fn release(&self, blob: &BlobRef) -> Result<(), BlobError> {
    match fs::remove_file(self.locate(blob)) {
      Ok(()) => {
        tracing::debug!(blob_id = %blob.blob_id, path = %blob.path, "file released");
        Ok(())
      }
      // Already gone: the record is what matters.
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        tracing::warn!(blob_id = %blob.blob_id, path = %blob.path, "released file was already missing");
        Ok(())
      }
      Err(e) => Err(e.into()),
    }
  }
}

/// Keep the uploaded name recognisable but confined to one path segment.
fn sanitize(file_name: &str) -> String {
  let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
  let cleaned: String = base
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }
    })
    .collect();
  let cleaned = cleaned.trim_start_matches('.');
  if cleaned.is_empty() { "file".to_owned() } else { cleaned.to_owned() }
}
