//! Guarded deletions.
//!
//! A category may only go once no document refers to it; the check and the
//! delete share one transaction, so a refusal has no effect at all. An
//! archived object takes its file with it: rows first, then the file record,
//! then the bytes, all before the commit. If the row delete is refused the
//! bytes are never touched.

use archiv_core::{Entity, blob::BlobStore};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::encode_uuid,
  objects::{self, BlobEffects},
};

pub fn delete_category(conn: &mut Connection, category_id: Uuid) -> Result<()> {
  let id_str = encode_uuid(category_id);
  let tx = conn.transaction()?;

  let name: String = tx
    .query_row(
      "SELECT name FROM categories WHERE category_id = ?1",
      params![id_str],
      |row| row.get(0),
    )
    .optional()?
    .ok_or(archiv_core::Error::not_found(Entity::Category, category_id))?;

  let documents: i64 = tx.query_row(
    "SELECT COUNT(*) FROM documents WHERE category_id = ?1",
    params![id_str],
    |row| row.get(0),
  )?;
  if documents > 0 {
    return Err(
      archiv_core::Error::CategoryInUse {
        category_id,
        name,
        documents: documents.unsigned_abs(),
      }
      .into(),
    );
  }

  tx.execute("DELETE FROM categories WHERE category_id = ?1", params![id_str])?;
  tx.commit()?;

  tracing::info!(%category_id, %name, "category deleted");
  Ok(())
}

pub fn delete_object(conn: &mut Connection, blobs: &dyn BlobStore, object_id: Uuid) -> Result<()> {
  let mut effects = BlobEffects::default();

  let result = remove_object(conn, blobs, object_id, &mut effects);
  if result.is_err() {
    effects.undo(conn, blobs, object_id);
  }
  result
}

fn remove_object(
  conn: &mut Connection,
  blobs: &dyn BlobStore,
  object_id: Uuid,
  effects: &mut BlobEffects,
) -> Result<()> {
  let tx = conn.transaction()?;
  let object = objects::load(&tx, object_id)?
    .ok_or(archiv_core::Error::not_found(Entity::Object, object_id))?;
  let id_str = encode_uuid(object_id);

  // Variant rows and associations cascade with the base row.
  tx.execute("DELETE FROM archived_objects WHERE object_id = ?1", params![id_str])
    .map_err(|e| in_use(e, object_id))?;

  if let Some(blob) = &object.blob {
    tx.execute("DELETE FROM blobs WHERE blob_id = ?1", params![encode_uuid(blob.blob_id)])?;
    blobs.release(blob)?;
    effects.released = Some(blob.clone());
  }

  tx.commit()?;
  tracing::info!(%object_id, kind = %object.kind(), "archived object deleted");
  Ok(())
}

/// A foreign-key refusal on delete means something outside this store still
/// points at the row.
fn in_use(error: rusqlite::Error, object_id: Uuid) -> Error {
  match &error {
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
    {
      tracing::warn!(%object_id, "delete refused, object still referenced");
      archiv_core::Error::ObjectInUse(object_id).into()
    }
    _ => error.into(),
  }
}
