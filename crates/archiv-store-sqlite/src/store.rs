//! [`SqliteStore`], the SQLite implementation of [`ArchiveStore`].

use std::{path::Path, sync::Arc};

use archiv_core::{
  blob::BlobStore,
  category::{Category, NewCategory},
  dating::DatingPolicy,
  object::{ArchivedObject, ObjectFields, ObjectKind, VariantCounts},
  person::{NewPerson, Person},
  store::ArchiveStore,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result, guard, objects, persons, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An archive backed by a single SQLite file and a [`BlobStore`] for the
/// attached files.
///
/// Cloning is cheap; the connection and the blob store are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  blobs:  Arc<dyn BlobStore>,
  policy: DatingPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, blobs: Arc<dyn BlobStore>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, blobs, policy: DatingPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory(blobs: Arc<dyn BlobStore>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, blobs, policy: DatingPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the date bounds applied on every write.
  pub fn with_policy(mut self, policy: DatingPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn policy(&self) -> &DatingPolicy { &self.policy }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread with everything a write needs.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection, &dyn BlobStore, &DatingPolicy, NaiveDate) -> Result<T>
      + Send
      + 'static,
  {
    let blobs = Arc::clone(&self.blobs);
    let policy = self.policy;
    let today = Utc::now().date_naive();

    self
      .conn
      .call(move |conn| Ok(f(conn, &*blobs, &policy, today)))
      .await?
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

impl ArchiveStore for SqliteStore {
  type Error = Error;

  // ── Archived objects ──────────────────────────────────────────────────

  async fn create_object(&self, fields: ObjectFields) -> Result<ArchivedObject> {
    self
      .run(move |conn, blobs, policy, today| objects::create(conn, blobs, policy, fields, today))
      .await
  }

  async fn update_object(&self, id: Uuid, fields: ObjectFields) -> Result<ArchivedObject> {
    self
      .run(move |conn, blobs, policy, today| {
        objects::update(conn, blobs, policy, id, fields, today)
      })
      .await
  }

  async fn delete_object(&self, id: Uuid) -> Result<()> {
    self.run(move |conn, blobs, _, _| guard::delete_object(conn, blobs, id)).await
  }

  async fn get_object(&self, id: Uuid) -> Result<Option<ArchivedObject>> {
    self.run(move |conn, _, _, _| objects::load(conn, id)).await
  }

  async fn list_objects(&self, kind: Option<ObjectKind>) -> Result<Vec<ArchivedObject>> {
    self.run(move |conn, _, _, _| objects::list(conn, kind)).await
  }

  async fn count_by_variant(&self) -> Result<VariantCounts> {
    self.run(|conn, _, _, _| objects::count_by_variant(conn)).await
  }

  // ── Categories ────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    self.run(move |conn, _, _, _| persons::create_category(conn, input)).await
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    self.run(move |conn, _, _, _| persons::get_category(conn, id)).await
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    self.run(|conn, _, _, _| persons::list_categories(conn)).await
  }

  async fn delete_category(&self, id: Uuid) -> Result<()> {
    self.run(move |conn, _, _, _| guard::delete_category(conn, id)).await
  }

  // ── Persons ───────────────────────────────────────────────────────────

  async fn create_person(&self, input: NewPerson) -> Result<Person> {
    self
      .run(move |conn, _, policy, today| persons::create_person(conn, policy, input, today))
      .await
  }

  async fn update_person(&self, id: Uuid, input: NewPerson) -> Result<Person> {
    self
      .run(move |conn, _, policy, today| {
        persons::update_person(conn, policy, id, input, today)
      })
      .await
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    self.run(move |conn, _, _, _| persons::get_person(conn, id)).await
  }

  async fn list_persons(&self) -> Result<Vec<Person>> {
    self.run(|conn, _, _, _| persons::list_persons(conn)).await
  }

  async fn delete_person(&self, id: Uuid) -> Result<()> {
    self.run(move |conn, _, _, _| persons::delete_person(conn, id)).await
  }

  async fn count_persons(&self) -> Result<u64> {
    self.run(|conn, _, _, _| persons::count_persons(conn)).await
  }
}
