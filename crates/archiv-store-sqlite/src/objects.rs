//! Archived-object reads and writes.
//!
//! All functions here are synchronous and run on the connection thread. A
//! write opens one transaction, validates everything before the first
//! statement, and touches the blob store last, right before commit. Whatever
//! the blob store did for a transaction that then failed is recorded in
//! [`BlobEffects`] and undone once the transaction has rolled back.

use std::collections::{HashMap, HashSet};

use archiv_core::{
  Entity, ValidationErrors,
  association::Associations,
  blob::{BlobRef, BlobStore, Upload},
  dating::DatingPolicy,
  object::{
    ArchivedObject, CheckedObject, DetailsInput, ObjectDetails, ObjectFields,
    ObjectKind, VariantCounts,
  },
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{OBJECT_SELECT, RawObject, decode_uuid, encode_date, encode_dt, encode_uuid},
};

// ─── Blob effects ────────────────────────────────────────────────────────────

/// Blob-store calls made inside a transaction that has not committed yet.
#[derive(Default)]
pub struct BlobEffects {
  /// Bytes stored for a new file.
  pub stored:   Option<BlobRef>,
  /// Bytes of the previously attached file, already released.
  pub released: Option<BlobRef>,
}

impl BlobEffects {
  /// Undo after a rollback: drop newly stored bytes, and detach a released
  /// file so the object never points at bytes that no longer exist.
  pub fn undo(self, conn: &mut Connection, blobs: &dyn BlobStore, object_id: Uuid) {
    if let Some(blob) = self.stored {
      release_quietly(blobs, &blob);
    }
    if let Some(blob) = self.released
      && let Err(error) = detach_released(conn, object_id, &blob)
    {
      tracing::error!(
        %object_id,
        blob_id = %blob.blob_id,
        %error,
        "failed to detach a released file"
      );
    }
  }
}

pub fn release_quietly(blobs: &dyn BlobStore, blob: &BlobRef) {
  if let Err(error) = blobs.release(blob) {
    tracing::warn!(blob_id = %blob.blob_id, path = %blob.path, %error, "could not release stored file");
  }
}

fn detach_released(conn: &mut Connection, object_id: Uuid, blob: &BlobRef) -> Result<()> {
  let object_id_str = encode_uuid(object_id);
  let blob_id_str = encode_uuid(blob.blob_id);

  let tx = conn.transaction()?;
  tx.execute(
    "UPDATE archived_objects SET blob_id = NULL WHERE object_id = ?1 AND blob_id = ?2",
    params![object_id_str, blob_id_str],
  )?;
  tx.execute("DELETE FROM blobs WHERE blob_id = ?1", params![blob_id_str])?;
  tx.commit()?;

  tracing::warn!(%object_id, blob_id = %blob.blob_id, "object left without a file after a failed save");
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn exists(conn: &Connection, sql: &str, id: Uuid) -> Result<bool> {
  Ok(
    conn
      .query_row(sql, params![encode_uuid(id)], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

pub fn load(conn: &Connection, id: Uuid) -> Result<Option<ArchivedObject>> {
  let id_str = encode_uuid(id);

  let raw = conn
    .query_row(
      &format!("{OBJECT_SELECT} WHERE o.object_id = ?1"),
      params![id_str],
      RawObject::from_row,
    )
    .optional()?;
  let Some(raw) = raw else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT person_id FROM object_people WHERE object_id = ?1 ORDER BY rowid",
  )?;
  let people = stmt
    .query_map(params![id_str], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .iter()
    .map(|s| decode_uuid(s))
    .collect::<Result<Vec<_>>>()?;

  raw.into_object(people).map(Some)
}

pub fn list(conn: &Connection, kind: Option<ObjectKind>) -> Result<Vec<ArchivedObject>> {
  let kind_str = kind.map(ObjectKind::discriminant);
  let secondary = match kind {
    Some(ObjectKind::Document) => "d.language",
    Some(ObjectKind::Photograph) => "p.photo_type",
    None => "o.kind",
  };

  let mut stmt = conn.prepare(&format!(
    "{OBJECT_SELECT}
     WHERE ?1 IS NULL OR o.kind = ?1
     ORDER BY o.archived_on DESC, {secondary} ASC, o.object_id ASC"
  ))?;
  let raws = stmt
    .query_map(params![kind_str], RawObject::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(
    "SELECT op.object_id, op.person_id
     FROM object_people op
     JOIN archived_objects o ON o.object_id = op.object_id
     WHERE ?1 IS NULL OR o.kind = ?1
     ORDER BY op.rowid",
  )?;
  let pairs = stmt
    .query_map(params![kind_str], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut people: HashMap<String, Vec<Uuid>> = HashMap::new();
  for (object_id, person_id) in pairs {
    people.entry(object_id).or_default().push(decode_uuid(&person_id)?);
  }

  raws
    .into_iter()
    .map(|raw| {
      let associated = people.remove(&raw.object_id).unwrap_or_default();
      raw.into_object(associated)
    })
    .collect()
}

pub fn count_by_variant(conn: &Connection) -> Result<VariantCounts> {
  let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM archived_objects GROUP BY kind")?;
  let rows = stmt
    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut counts = VariantCounts::default();
  for (kind, count) in rows {
    let count = u64::try_from(count).unwrap_or_default();
    match crate::encode::decode_kind(&kind)? {
      ObjectKind::Document => counts.document = count,
      ObjectKind::Photograph => counts.photograph = count,
    }
  }
  Ok(counts)
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Field checks plus the lookups that need the database: every selected
/// person and the chosen category must exist. All messages are collected.
fn check_fields(
  conn: &Connection,
  fields: &ObjectFields,
  policy: &DatingPolicy,
  today: NaiveDate,
  mut errors: ValidationErrors,
) -> Result<CheckedObject> {
  let checked = errors.absorb(fields.check(policy, today));

  let mut seen = HashSet::new();
  for person_id in fields.people.iter().filter(|id| seen.insert(**id)) {
    if !exists(conn, "SELECT 1 FROM persons WHERE person_id = ?1", *person_id)? {
      errors.add("people", format!("unknown person {person_id}"));
    }
  }

  if let DetailsInput::Document(document) = &fields.details
    && let Some(category_id) = document.category_id
    && !exists(conn, "SELECT 1 FROM categories WHERE category_id = ?1", category_id)?
  {
    errors.add("category_id", format!("unknown category {category_id}"));
  }

  match checked {
    Some(checked) if errors.is_empty() => Ok(checked),
    _ => Err(errors.into()),
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn create(
  conn: &mut Connection,
  blobs: &dyn BlobStore,
  policy: &DatingPolicy,
  fields: ObjectFields,
  today: NaiveDate,
) -> Result<ArchivedObject> {
  let object_id = Uuid::new_v4();
  let mut effects = BlobEffects::default();

  let result = insert_object(conn, blobs, policy, object_id, &fields, today, &mut effects);
  if result.is_err() {
    effects.undo(conn, blobs, object_id);
  }
  result
}

pub fn update(
  conn: &mut Connection,
  blobs: &dyn BlobStore,
  policy: &DatingPolicy,
  object_id: Uuid,
  fields: ObjectFields,
  today: NaiveDate,
) -> Result<ArchivedObject> {
  let mut effects = BlobEffects::default();

  let result = rewrite_object(conn, blobs, policy, object_id, &fields, today, &mut effects);
  if result.is_err() {
    effects.undo(conn, blobs, object_id);
  }
  result
}

fn insert_object(
  conn: &mut Connection,
  blobs: &dyn BlobStore,
  policy: &DatingPolicy,
  object_id: Uuid,
  fields: &ObjectFields,
  today: NaiveDate,
  effects: &mut BlobEffects,
) -> Result<ArchivedObject> {
  let tx = conn.transaction()?;
  let checked = check_fields(&tx, fields, policy, today, ValidationErrors::new())?;

  let id_str = encode_uuid(object_id);
  let archived_on = checked.archived_on.unwrap_or(today);
  let columns = checked.dating.to_columns();

  tx.execute(
    "INSERT INTO archived_objects (
       object_id, kind, archived_on, description,
       precise_date, year, century, primary_person_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      id_str,
      checked.details.kind().discriminant(),
      encode_date(archived_on),
      checked.description,
      columns.precise_date.map(encode_date),
      columns.year,
      columns.century.map(|c| c.code()),
      checked.associations.primary.map(encode_uuid),
    ],
  )?;
  write_details(&tx, &id_str, &checked.details)?;
  write_people(&tx, &id_str, &checked.associations)?;

  let blob = match &fields.upload {
    Some(upload) => Some(attach_upload(&tx, blobs, &id_str, upload, effects)?),
    None => None,
  };

  tx.commit()?;
  tracing::info!(%object_id, kind = %checked.details.kind(), "archived object created");

  Ok(assemble(object_id, archived_on, checked, blob))
}

fn rewrite_object(
  conn: &mut Connection,
  blobs: &dyn BlobStore,
  policy: &DatingPolicy,
  object_id: Uuid,
  fields: &ObjectFields,
  today: NaiveDate,
  effects: &mut BlobEffects,
) -> Result<ArchivedObject> {
  let tx = conn.transaction()?;
  let existing =
    load(&tx, object_id)?.ok_or(archiv_core::Error::not_found(Entity::Object, object_id))?;

  let mut errors = ValidationErrors::new();
  if fields.kind() != existing.kind() {
    errors.add(
      "kind",
      format!("a {} cannot be changed into a {}", existing.kind(), fields.kind()),
    );
  }
  let checked = check_fields(&tx, fields, policy, today, errors)?;

  let id_str = encode_uuid(object_id);
  let archived_on = checked.archived_on.unwrap_or(existing.archived_on);
  let columns = checked.dating.to_columns();

  tx.execute(
    "UPDATE archived_objects SET
       kind = ?2, archived_on = ?3, description = ?4,
       precise_date = ?5, year = ?6, century = ?7, primary_person_id = ?8
     WHERE object_id = ?1",
    params![
      id_str,
      checked.details.kind().discriminant(),
      encode_date(archived_on),
      checked.description,
      columns.precise_date.map(encode_date),
      columns.year,
      columns.century.map(|c| c.code()),
      checked.associations.primary.map(encode_uuid),
    ],
  )?;
  write_details(&tx, &id_str, &checked.details)?;
  write_people(&tx, &id_str, &checked.associations)?;

  // The old file goes first: an object never owns two files, not even
  // inside the transaction.
  let blob = match &fields.upload {
    Some(upload) => {
      if let Some(old) = &existing.blob {
        release_attached(&tx, blobs, &id_str, old, effects)?;
      }
      Some(attach_upload(&tx, blobs, &id_str, upload, effects)?)
    }
    None => existing.blob,
  };

  tx.commit()?;
  if let Some(old) = &effects.released {
    tracing::info!(%object_id, old_blob_id = %old.blob_id, "attached file replaced");
  }

  Ok(assemble(object_id, archived_on, checked, blob))
}

fn assemble(
  object_id: Uuid,
  archived_on: NaiveDate,
  checked: CheckedObject,
  blob: Option<BlobRef>,
) -> ArchivedObject {
  ArchivedObject {
    object_id,
    archived_on,
    description: checked.description,
    dating: checked.dating,
    primary_person: checked.associations.primary,
    people: checked.associations.people,
    blob,
    details: checked.details,
  }
}

/// Rewrite the variant row. Both tables are cleared first so the row always
/// matches the discriminator written to the base row.
fn write_details(tx: &Transaction<'_>, id_str: &str, details: &ObjectDetails) -> Result<()> {
  tx.execute("DELETE FROM documents WHERE object_id = ?1", params![id_str])?;
  tx.execute("DELETE FROM photographs WHERE object_id = ?1", params![id_str])?;

  match details {
    ObjectDetails::Document(document) => tx.execute(
      "INSERT INTO documents (object_id, category_id, language) VALUES (?1, ?2, ?3)",
      params![id_str, document.category_id.map(encode_uuid), document.language.code()],
    )?,
    ObjectDetails::Photograph(photo) => tx.execute(
      "INSERT INTO photographs (object_id, photo_type, height_cm, width_cm)
       VALUES (?1, ?2, ?3, ?4)",
      params![id_str, photo.photo_type, photo.height_cm, photo.width_cm],
    )?,
  };
  Ok(())
}

fn write_people(tx: &Transaction<'_>, id_str: &str, associations: &Associations) -> Result<()> {
  tx.execute("DELETE FROM object_people WHERE object_id = ?1", params![id_str])?;

  let mut stmt =
    tx.prepare("INSERT INTO object_people (object_id, person_id) VALUES (?1, ?2)")?;
  for person_id in &associations.people {
    stmt.execute(params![id_str, encode_uuid(*person_id)])?;
  }
  Ok(())
}

fn attach_upload(
  tx: &Transaction<'_>,
  blobs: &dyn BlobStore,
  id_str: &str,
  upload: &Upload,
  effects: &mut BlobEffects,
) -> Result<BlobRef> {
  let blob = blobs.store(upload)?;
  effects.stored = Some(blob.clone());

  let size = i64::try_from(blob.size)
    .map_err(|_| Error::Corrupt(format!("file too large: {} bytes", blob.size)))?;
  tx.execute(
    "INSERT INTO blobs (blob_id, file_name, path, content_hash, size, stored_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(blob.blob_id),
      blob.file_name,
      blob.path,
      blob.content_hash,
      size,
      encode_dt(blob.stored_at),
    ],
  )?;
  tx.execute(
    "UPDATE archived_objects SET blob_id = ?1 WHERE object_id = ?2",
    params![encode_uuid(blob.blob_id), id_str],
  )?;
  Ok(blob)
}

/// Detach and delete the current file record, then release its bytes.
fn release_attached(
  tx: &Transaction<'_>,
  blobs: &dyn BlobStore,
  id_str: &str,
  old: &BlobRef,
  effects: &mut BlobEffects,
) -> Result<()> {
  tx.execute(
    "UPDATE archived_objects SET blob_id = NULL WHERE object_id = ?1",
    params![id_str],
  )?;
  tx.execute("DELETE FROM blobs WHERE blob_id = ?1", params![encode_uuid(old.blob_id)])?;
  blobs.release(old)?;
  effects.released = Some(old.clone());
  Ok(())
}
