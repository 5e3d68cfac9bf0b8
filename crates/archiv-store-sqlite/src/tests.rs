//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use archiv_core::{
  ErrorClass,
  blob::{BlobError, BlobRef, BlobStore, MemoryBlobStore, Upload},
  category::NewCategory,
  dating::{Century, Dating, DatingInput, DatingMode},
  object::{
    DetailsInput, DocumentInput, Language, ObjectDetails, ObjectFields, ObjectKind,
    PhotographInput,
  },
  person::{NewPerson, Person},
  store::ArchiveStore,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Error, FsBlobStore, SqliteStore};

async fn store() -> (SqliteStore, Arc<MemoryBlobStore>) {
  let blobs = Arc::new(MemoryBlobStore::new());
  let store = SqliteStore::open_in_memory(blobs.clone())
    .await
    .expect("in-memory store");
  (store, blobs)
}

async fn person(s: &SqliteStore, given: &str, family: &str) -> Person {
  s.create_person(NewPerson::new(given, family)).await.unwrap()
}

fn document(dating: DatingInput) -> ObjectFields {
  ObjectFields::new(dating, DetailsInput::Document(DocumentInput::default()))
}

fn photograph(dating: DatingInput, height_cm: u32, width_cm: u32) -> ObjectFields {
  ObjectFields::new(
    dating,
    DetailsInput::Photograph(PhotographInput {
      photo_type: "portrait".into(),
      height_cm:  Some(height_cm),
      width_cm:   Some(width_cm),
    }),
  )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

async fn table_rows(s: &SqliteStore, table: &'static str) -> i64 {
  s.connection()
    .call(move |conn| {
      Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
    })
    .await
    .unwrap()
}

// ─── Creating objects ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_document_sets_primary_and_associations() {
  let (s, _) = store().await;
  let a = person(&s, "Anna", "Nováková").await;
  let b = person(&s, "Bohumil", "Novák").await;

  let mut fields = document(DatingInput::year(1950));
  fields.details = DetailsInput::Document(DocumentInput {
    category_id: None,
    language:    Some(Language::Czech),
  });
  fields.people = vec![a.person_id, b.person_id];

  let object = s.create_object(fields).await.unwrap();
  assert_eq!(object.kind(), ObjectKind::Document);
  assert_eq!(object.primary_person, Some(a.person_id));
  assert_eq!(object.people, vec![a.person_id, b.person_id]);
  assert_eq!(object.dating, Dating::Year(1950));

  let fetched = s.get_object(object.object_id).await.unwrap().unwrap();
  assert_eq!(fetched, object);
  assert_eq!(fetched.kind().discriminant(), "document");
  assert_eq!(fetched.datation_display(), "1950");
}

#[tokio::test]
async fn create_defaults_archived_on_to_today() {
  let (s, _) = store().await;
  let object = s.create_object(document(DatingInput::year(1950))).await.unwrap();
  assert_eq!(object.archived_on, chrono::Utc::now().date_naive());
}

#[tokio::test]
async fn duplicate_selection_is_stored_once() {
  let (s, _) = store().await;
  let a = person(&s, "Anna", "Nováková").await;
  let b = person(&s, "Bohumil", "Novák").await;

  let mut fields = document(DatingInput::year(1950));
  fields.people = vec![b.person_id, a.person_id, b.person_id];

  let object = s.create_object(fields).await.unwrap();
  assert_eq!(object.primary_person, Some(b.person_id));
  assert_eq!(object.people, vec![b.person_id, a.person_id]);
  assert_eq!(table_rows(&s, "object_people").await, 2);
}

#[tokio::test]
async fn empty_selection_clears_primary() {
  let (s, _) = store().await;
  let object = s
    .create_object(photograph(DatingInput::century(Century::Nineteenth), 10, 15))
    .await
    .unwrap();
  assert_eq!(object.primary_person, None);
  assert!(object.people.is_empty());
}

#[tokio::test]
async fn photograph_with_stray_year_is_rejected_without_writes() {
  let (s, blobs) = store().await;

  let mut dating = DatingInput::century(Century::Nineteenth);
  dating.year = Some(1850);
  let mut fields = photograph(dating, 10, 15);
  fields.upload = Some(Upload::new("scan.jpg", &b"jpeg"[..]));

  let err = s.create_object(fields).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Validation);
  assert!(err.validation().unwrap().contains("dating", "only one dating field may be filled"));

  assert_eq!(s.count_by_variant().await.unwrap().photograph, 0);
  assert_eq!(table_rows(&s, "blobs").await, 0);
  assert!(blobs.is_empty());
}

#[tokio::test]
async fn validation_reports_every_field_at_once() {
  let (s, _) = store().await;

  let mut fields = ObjectFields::new(
    DatingInput { mode: DatingMode::None, ..Default::default() },
    DetailsInput::Photograph(PhotographInput {
      photo_type: String::new(),
      height_cm:  None,
      width_cm:   Some(0),
    }),
  );
  fields.people = vec![Uuid::new_v4()];

  let err = s.create_object(fields).await.unwrap_err();
  let errors = err.validation().unwrap();
  assert!(errors.contains("dating", "dating method required"));
  assert!(errors.contains("height_cm", "this field is required"));
  assert!(errors.contains("width_cm", "ensure this value is greater than or equal to 1"));
  assert_eq!(errors.field("people").len(), 1);
}

#[tokio::test]
async fn unknown_category_is_a_field_error() {
  let (s, _) = store().await;
  let mut fields = document(DatingInput::year(1950));
  fields.details = DetailsInput::Document(DocumentInput {
    category_id: Some(Uuid::new_v4()),
    language:    None,
  });

  let err = s.create_object(fields).await.unwrap_err();
  assert_eq!(err.validation().unwrap().field("category_id").len(), 1);
}

#[tokio::test]
async fn future_precise_date_is_rejected() {
  let (s, _) = store().await;
  let err = s
    .create_object(document(DatingInput::precise(date(2999, 1, 1))))
    .await
    .unwrap_err();
  assert!(err.validation().unwrap().contains("precise_date", "cannot be in the future"));
}

// ─── Updating objects ────────────────────────────────────────────────────────

#[tokio::test]
async fn resaving_edit_fields_is_stable() {
  let (s, _) = store().await;
  let a = person(&s, "Anna", "Nováková").await;
  let b = person(&s, "Bohumil", "Novák").await;
  let c = person(&s, "Cyril", "Dvořák").await;

  let mut fields = document(DatingInput::precise(date(1916, 3, 7)));
  fields.people = vec![b.person_id, c.person_id, a.person_id];
  fields.description = "letter from the front".into();
  let object = s.create_object(fields).await.unwrap();

  let resaved = s
    .update_object(object.object_id, object.edit_fields())
    .await
    .unwrap();
  assert_eq!(resaved, object);
  assert_eq!(s.get_object(object.object_id).await.unwrap().unwrap(), object);
}

#[tokio::test]
async fn update_switches_dating_and_clears_other_columns() {
  let (s, _) = store().await;
  let object = s.create_object(document(DatingInput::year(1950))).await.unwrap();

  let mut fields = object.edit_fields();
  fields.dating = DatingInput::century(Century::Twentieth);
  let updated = s.update_object(object.object_id, fields).await.unwrap();
  assert_eq!(updated.dating, Dating::Century(Century::Twentieth));
  assert_eq!(updated.datation_display(), "20. století");

  let year: Option<i32> = s
    .connection()
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT year FROM archived_objects WHERE object_id = ?1",
        [object.object_id.to_string()],
        |row| row.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(year, None);
}

#[tokio::test]
async fn update_cannot_change_variant() {
  let (s, _) = store().await;
  let object = s.create_object(document(DatingInput::year(1950))).await.unwrap();

  let err = s
    .update_object(object.object_id, photograph(DatingInput::year(1950), 9, 13))
    .await
    .unwrap_err();
  assert_eq!(err.validation().unwrap().field("kind").len(), 1);
  assert_eq!(s.get_object(object.object_id).await.unwrap().unwrap(), object);
}

#[tokio::test]
async fn update_missing_object_is_not_found() {
  let (s, _) = store().await;
  let err = s
    .update_object(Uuid::new_v4(), document(DatingInput::year(1950)))
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn replacing_the_file_leaves_exactly_one_blob() {
  let (s, blobs) = store().await;

  let mut fields = photograph(DatingInput::year(1930), 10, 15);
  fields.upload = Some(Upload::new("old.jpg", &b"old"[..]));
  let object = s.create_object(fields).await.unwrap();
  let old = object.blob.clone().unwrap();

  let mut fields = object.edit_fields();
  fields.upload = Some(Upload::new("new.jpg", &b"new"[..]));
  let updated = s.update_object(object.object_id, fields).await.unwrap();
  let new = updated.blob.clone().unwrap();

  assert_ne!(old.blob_id, new.blob_id);
  assert!(!blobs.contains(&old));
  assert_eq!(blobs.get(&new).as_deref(), Some(&b"new"[..]));
  assert_eq!(blobs.len(), 1);
  assert_eq!(table_rows(&s, "blobs").await, 1);

  let fetched = s.get_object(object.object_id).await.unwrap().unwrap();
  assert_eq!(fetched.blob, Some(new));
}

#[tokio::test]
async fn update_without_upload_keeps_the_file() {
  let (s, blobs) = store().await;

  let mut fields = photograph(DatingInput::year(1930), 10, 15);
  fields.upload = Some(Upload::new("scan.jpg", &b"scan"[..]));
  let object = s.create_object(fields).await.unwrap();

  let mut fields = object.edit_fields();
  fields.description = "studio portrait".into();
  let updated = s.update_object(object.object_id, fields).await.unwrap();
  assert_eq!(updated.blob, object.blob);
  assert_eq!(blobs.len(), 1);
}

// ─── Failing blob store ──────────────────────────────────────────────────────

/// Memory store whose `store` can be switched off.
#[derive(Default)]
struct FlakyBlobStore {
  inner:       MemoryBlobStore,
  fail_stores: AtomicBool,
}

impl BlobStore for FlakyBlobStore {
  fn store(&self, upload: &Upload) -> Result<BlobRef, BlobError> {
    if self.fail_stores.load(Ordering::SeqCst) {
      return Err(BlobError::Unavailable("disk full".into()));
    }
    self.inner.store(upload)
  }

  fn release(&self, blob: &BlobRef) -> Result<(), BlobError> { self.inner.release(blob) }
}

#[tokio::test]
async fn failed_store_on_create_writes_nothing() {
  let blobs = Arc::new(FlakyBlobStore::default());
  blobs.fail_stores.store(true, Ordering::SeqCst);
  let s = SqliteStore::open_in_memory(blobs.clone()).await.unwrap();

  let mut fields = document(DatingInput::year(1950));
  fields.upload = Some(Upload::new("a.pdf", &b"pdf"[..]));
  let err = s.create_object(fields).await.unwrap_err();

  assert_eq!(err.class(), ErrorClass::Storage);
  assert!(s.list_objects(None).await.unwrap().is_empty());
  assert_eq!(table_rows(&s, "object_people").await, 0);
}

#[tokio::test]
async fn failed_replacement_never_points_at_released_bytes() {
  let blobs = Arc::new(FlakyBlobStore::default());
  let s = SqliteStore::open_in_memory(blobs.clone()).await.unwrap();

  let mut fields = document(DatingInput::year(1950));
  fields.upload = Some(Upload::new("a.pdf", &b"first"[..]));
  let object = s.create_object(fields).await.unwrap();
  let old = object.blob.clone().unwrap();

  blobs.fail_stores.store(true, Ordering::SeqCst);
  let mut fields = object.edit_fields();
  fields.description = "changed".into();
  fields.upload = Some(Upload::new("b.pdf", &b"second"[..]));
  assert!(s.update_object(object.object_id, fields).await.is_err());

  // The row edits rolled back; only the released file is gone.
  let fetched = s.get_object(object.object_id).await.unwrap().unwrap();
  assert_eq!(fetched.description, "");
  assert_eq!(fetched.blob, None);
  assert!(!blobs.inner.contains(&old));
  assert_eq!(table_rows(&s, "blobs").await, 0);
}

// ─── Deleting objects ────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_object_removes_file_and_record() {
  let (s, blobs) = store().await;
  let a = person(&s, "Anna", "Nováková").await;

  let mut fields = photograph(DatingInput::year(1930), 10, 15);
  fields.upload = Some(Upload::new("scan.jpg", &b"scan"[..]));
  fields.people = vec![a.person_id];
  let object = s.create_object(fields).await.unwrap();

  s.delete_object(object.object_id).await.unwrap();

  assert!(s.get_object(object.object_id).await.unwrap().is_none());
  assert!(blobs.is_empty());
  assert_eq!(table_rows(&s, "blobs").await, 0);
  assert_eq!(table_rows(&s, "photographs").await, 0);
  assert_eq!(table_rows(&s, "object_people").await, 0);
  assert_eq!(s.count_persons().await.unwrap(), 1);
}

#[tokio::test]
async fn object_whose_file_vanished_can_still_be_deleted() {
  let (s, blobs) = store().await;

  let mut fields = document(DatingInput::year(1950));
  fields.upload = Some(Upload::new("scan.pdf", &b"%PDF"[..]));
  let object = s.create_object(fields).await.unwrap();
  blobs.release(object.blob.as_ref().unwrap()).unwrap();

  s.delete_object(object.object_id).await.unwrap();

  assert!(s.get_object(object.object_id).await.unwrap().is_none());
  assert_eq!(table_rows(&s, "blobs").await, 0);
}

#[tokio::test]
async fn object_whose_file_vanished_can_get_a_new_one() {
  let (s, blobs) = store().await;

  let mut fields = document(DatingInput::year(1950));
  fields.upload = Some(Upload::new("old.pdf", &b"old"[..]));
  let object = s.create_object(fields).await.unwrap();
  blobs.release(object.blob.as_ref().unwrap()).unwrap();

  let mut fields = object.edit_fields();
  fields.upload = Some(Upload::new("new.pdf", &b"new"[..]));
  let updated = s.update_object(object.object_id, fields).await.unwrap();

  let new = updated.blob.unwrap();
  assert_eq!(blobs.get(&new).as_deref(), Some(&b"new"[..]));
  assert_eq!(table_rows(&s, "blobs").await, 1);
}

#[tokio::test]
async fn delete_missing_object_is_not_found() {
  let (s, _) = store().await;
  let err = s.delete_object(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn referenced_object_is_in_use_and_keeps_its_file() {
  let (s, blobs) = store().await;

  let mut fields = document(DatingInput::year(1950));
  fields.upload = Some(Upload::new("deed.pdf", &b"deed"[..]));
  let object = s.create_object(fields).await.unwrap();
  let blob = object.blob.clone().unwrap();

  let object_id = object.object_id.to_string();
  s.connection()
    .call(move |conn| {
      conn.execute_batch(
        "CREATE TABLE loans (
           object_id TEXT NOT NULL REFERENCES archived_objects(object_id)
         );",
      )?;
      conn.execute("INSERT INTO loans (object_id) VALUES (?1)", [object_id])?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.delete_object(object.object_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(archiv_core::Error::ObjectInUse(id)) if id == object.object_id
  ));
  assert_eq!(err.class(), ErrorClass::ReferentialIntegrity);

  let fetched = s.get_object(object.object_id).await.unwrap().unwrap();
  assert_eq!(fetched.blob, Some(blob.clone()));
  assert!(blobs.contains(&blob));
  assert_eq!(table_rows(&s, "blobs").await, 1);
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
  let (s, _) = store().await;
  let letters = s
    .create_category(NewCategory::new("Letters", "private correspondence"))
    .await
    .unwrap();

  let mut fields = document(DatingInput::year(1950));
  fields.details = DetailsInput::Document(DocumentInput {
    category_id: Some(letters.category_id),
    language:    Some(Language::German),
  });
  let object = s.create_object(fields).await.unwrap();
  assert_eq!(object.category_id(), Some(letters.category_id));

  let err = s.delete_category(letters.category_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(archiv_core::Error::CategoryInUse { documents: 1, .. })
  ));
  assert_eq!(err.class(), ErrorClass::ReferentialIntegrity);
  assert!(s.get_category(letters.category_id).await.unwrap().is_some());

  s.delete_object(object.object_id).await.unwrap();
  s.delete_category(letters.category_id).await.unwrap();
  assert!(s.get_category(letters.category_id).await.unwrap().is_none());
}

#[tokio::test]
async fn unreferenced_category_is_deleted() {
  let (s, _) = store().await;
  let maps = s.create_category(NewCategory::new("Maps", "")).await.unwrap();
  s.delete_category(maps.category_id).await.unwrap();
  assert!(s.list_categories().await.unwrap().is_empty());

  let err = s.delete_category(maps.category_id).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn categories_are_listed_by_name() {
  let (s, _) = store().await;
  s.create_category(NewCategory::new("  Wills ", "")).await.unwrap();
  s.create_category(NewCategory::new("Deeds", "")).await.unwrap();

  let names: Vec<_> = s
    .list_categories()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.name)
    .collect();
  assert_eq!(names, ["Deeds", "Wills"]);

  let err = s.create_category(NewCategory::new("   ", "")).await.unwrap_err();
  assert_eq!(err.validation().unwrap().field("name").len(), 1);
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn person_born_in_the_future_is_rejected() {
  let (s, _) = store().await;
  let mut input = NewPerson::new("Anna", "Nováková");
  input.born = Some(date(2999, 1, 1));

  let err = s.create_person(input).await.unwrap_err();
  assert!(err.validation().unwrap().contains("born", "cannot be in the future"));
  assert_eq!(s.count_persons().await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_person_clears_references() {
  let (s, _) = store().await;
  let a = person(&s, "Anna", "Nováková").await;
  let b = person(&s, "Bohumil", "Novák").await;

  let mut fields = document(DatingInput::year(1950));
  fields.people = vec![a.person_id, b.person_id];
  let object = s.create_object(fields).await.unwrap();

  s.delete_person(a.person_id).await.unwrap();

  let fetched = s.get_object(object.object_id).await.unwrap().unwrap();
  assert_eq!(fetched.primary_person, None);
  assert_eq!(fetched.people, vec![b.person_id]);
  assert_eq!(fetched.edit_selection(), vec![b.person_id]);
  assert_eq!(s.count_persons().await.unwrap(), 1);
}

#[tokio::test]
async fn update_person_round_trips() {
  let (s, _) = store().await;
  let a = person(&s, "Anna", "Nováková").await;

  let mut input = a.to_input();
  input.born = Some(date(1890, 5, 1));
  input.died = Some(date(1960, 2, 3));
  let updated = s.update_person(a.person_id, input).await.unwrap();
  assert_eq!(updated.born, Some(date(1890, 5, 1)));
  assert_eq!(s.get_person(a.person_id).await.unwrap().unwrap(), updated);

  let err = s
    .update_person(Uuid::new_v4(), NewPerson::new("X", "Y"))
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn persons_are_listed_by_family_then_given_name() {
  let (s, _) = store().await;
  person(&s, "Jan", "Svoboda").await;
  person(&s, "Eva", "Dvořáková").await;
  person(&s, "Adam", "Svoboda").await;

  let names: Vec<_> = s
    .list_persons()
    .await
    .unwrap()
    .iter()
    .map(Person::full_name)
    .collect();
  assert_eq!(names, ["Eva Dvořáková", "Adam Svoboda", "Jan Svoboda"]);
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_and_count_by_variant() {
  let (s, _) = store().await;

  let mut older = document(DatingInput::year(1900));
  older.archived_on = Some(date(2020, 1, 1));
  let older = s.create_object(older).await.unwrap();

  let mut newer = photograph(DatingInput::year(1900), 10, 15);
  newer.archived_on = Some(date(2024, 6, 1));
  let newer = s.create_object(newer).await.unwrap();

  let all = s.list_objects(None).await.unwrap();
  let ids: Vec<_> = all.iter().map(|o| o.object_id).collect();
  assert_eq!(ids, [newer.object_id, older.object_id]);

  let photos = s.list_objects(Some(ObjectKind::Photograph)).await.unwrap();
  assert_eq!(photos.len(), 1);
  assert!(matches!(photos[0].details, ObjectDetails::Photograph(_)));

  let counts = s.count_by_variant().await.unwrap();
  assert_eq!((counts.document, counts.photograph), (1, 1));
}

#[tokio::test]
async fn same_day_objects_sort_by_variant_key() {
  let (s, _) = store().await;
  let a = person(&s, "Anna", "Nováková").await;
  let archived_on = Some(date(2024, 6, 1));

  let mut ids = Vec::new();
  for language in [Language::English, Language::German] {
    let mut fields = ObjectFields::new(
      DatingInput::year(1920),
      DetailsInput::Document(DocumentInput { category_id: None, language: Some(language) }),
    );
    fields.archived_on = archived_on;
    fields.people = vec![a.person_id];
    ids.push(s.create_object(fields).await.unwrap().object_id);
  }
  for photo_type in ["svatební", "portrét"] {
    let mut fields = ObjectFields::new(
      DatingInput::year(1920),
      DetailsInput::Photograph(PhotographInput {
        photo_type: photo_type.into(),
        height_cm:  Some(9),
        width_cm:   Some(13),
      }),
    );
    fields.archived_on = archived_on;
    ids.push(s.create_object(fields).await.unwrap().object_id);
  }

  let documents = s.list_objects(Some(ObjectKind::Document)).await.unwrap();
  let listed: Vec<_> = documents.iter().map(|o| o.object_id).collect();
  assert_eq!(listed, [ids[1], ids[0]]);
  assert!(documents.iter().all(|o| o.people == [a.person_id]));

  let photos = s.list_objects(Some(ObjectKind::Photograph)).await.unwrap();
  let listed: Vec<_> = photos.iter().map(|o| o.object_id).collect();
  assert_eq!(listed, [ids[3], ids[2]]);
  assert!(photos.iter().all(|o| o.people.is_empty()));
}

// ─── Filesystem blobs ────────────────────────────────────────────────────────

#[tokio::test]
async fn file_backed_store_owns_its_files() {
  let dir = tempfile::tempdir().unwrap();
  let files = Arc::new(FsBlobStore::new(dir.path().join("media")));
  let s = SqliteStore::open(dir.path().join("archive.db"), files.clone())
    .await
    .unwrap();

  let mut fields = document(DatingInput::year(1950));
  fields.upload = Some(Upload::new("smlouva.pdf", &b"%PDF"[..]));
  let object = s.create_object(fields).await.unwrap();
  let blob = object.blob.clone().unwrap();
  assert!(files.locate(&blob).exists());

  s.delete_object(object.object_id).await.unwrap();
  assert!(!files.locate(&blob).exists());
}
