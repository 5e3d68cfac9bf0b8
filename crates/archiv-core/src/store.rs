//! The `ArchiveStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `archiv-store-sqlite`).
//! Front ends depend on this abstraction, not on any concrete backend.
//!
//! Every mutating method is one unit of work: all validation runs before the
//! first write, and either every write of the call lands or none does.

use std::future::Future;

use uuid::Uuid;

use crate::{
  category::{Category, NewCategory},
  object::{ArchivedObject, ObjectFields, ObjectKind, VariantCounts},
  person::{NewPerson, Person},
};

/// Abstraction over an archive backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait ArchiveStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Archived objects ──────────────────────────────────────────────────

  /// Create a document or photograph, as selected by `fields.details`.
  ///
  /// The first selected person becomes the primary person; an attached
  /// upload is stored and owned by the new object.
  fn create_object(
    &self,
    fields: ObjectFields,
  ) -> impl Future<Output = Result<ArchivedObject, Self::Error>> + Send + '_;

  /// Replace the content of an existing object through the same validated
  /// path as creation. The variant cannot change. A new upload releases the
  /// previously attached file before the new one is stored.
  fn update_object(
    &self,
    id: Uuid,
    fields: ObjectFields,
  ) -> impl Future<Output = Result<ArchivedObject, Self::Error>> + Send + '_;

  /// Delete an object together with the file it owns.
  fn delete_object(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve an object by UUID. Returns `None` if not found.
  fn get_object(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ArchivedObject>, Self::Error>> + Send + '_;

  /// List objects, newest archival date first, optionally one variant only.
  fn list_objects(
    &self,
    kind: Option<ObjectKind>,
  ) -> impl Future<Output = Result<Vec<ArchivedObject>, Self::Error>> + Send + '_;

  fn count_by_variant(
    &self,
  ) -> impl Future<Output = Result<VariantCounts, Self::Error>> + Send + '_;

  // ── Categories ────────────────────────────────────────────────────────

  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn get_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// All categories ordered by name.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Delete a category no document refers to. Refused, without any effect,
  /// while a document still does.
  fn delete_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Persons ───────────────────────────────────────────────────────────

  fn create_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn update_person(
    &self,
    id: Uuid,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// All persons ordered by family name, then given name.
  fn list_persons(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Delete a person. Never blocked: objects referring to the person lose
  /// the reference instead.
  fn delete_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn count_persons(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
