//! Persons and categories: plain rows, validated in `archiv-core`.

use archiv_core::{
  Entity,
  category::{Category, NewCategory},
  dating::DatingPolicy,
  person::{NewPerson, Person},
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CATEGORY_COLUMNS, PERSON_COLUMNS, RawCategory, RawPerson, encode_date, encode_uuid,
  },
};

// ─── Persons ─────────────────────────────────────────────────────────────────

pub fn create_person(
  conn: &Connection,
  policy: &DatingPolicy,
  input: NewPerson,
  today: NaiveDate,
) -> Result<Person> {
  let input = input.validate(policy, today)?;
  let person_id = Uuid::new_v4();

  conn.execute(
    "INSERT INTO persons (person_id, given_name, family_name, born, died, sex)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(person_id),
      input.given_name,
      input.family_name,
      input.born.map(encode_date),
      input.died.map(encode_date),
      input.sex.map(|s| s.code()),
    ],
  )?;

  Ok(into_person(person_id, input))
}

pub fn update_person(
  conn: &Connection,
  policy: &DatingPolicy,
  person_id: Uuid,
  input: NewPerson,
  today: NaiveDate,
) -> Result<Person> {
  let input = input.validate(policy, today)?;

  let changed = conn.execute(
    "UPDATE persons SET given_name = ?2, family_name = ?3, born = ?4, died = ?5, sex = ?6
     WHERE person_id = ?1",
    params![
      encode_uuid(person_id),
      input.given_name,
      input.family_name,
      input.born.map(encode_date),
      input.died.map(encode_date),
      input.sex.map(|s| s.code()),
    ],
  )?;
  if changed == 0 {
    return Err(archiv_core::Error::not_found(Entity::Person, person_id).into());
  }

  Ok(into_person(person_id, input))
}

fn into_person(person_id: Uuid, input: NewPerson) -> Person {
  Person {
    person_id,
    given_name: input.given_name,
    family_name: input.family_name,
    born: input.born,
    died: input.died,
    sex: input.sex,
  }
}

pub fn get_person(conn: &Connection, person_id: Uuid) -> Result<Option<Person>> {
  conn
    .query_row(
      &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE person_id = ?1"),
      params![encode_uuid(person_id)],
      RawPerson::from_row,
    )
    .optional()?
    .map(RawPerson::into_person)
    .transpose()
}

pub fn list_persons(conn: &Connection) -> Result<Vec<Person>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PERSON_COLUMNS} FROM persons ORDER BY family_name, given_name, person_id"
  ))?;
  let raws = stmt
    .query_map([], RawPerson::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawPerson::into_person).collect()
}

/// Never blocked. The schema clears `primary_person_id` and drops the
/// association rows of every object that referred to the person.
pub fn delete_person(conn: &Connection, person_id: Uuid) -> Result<()> {
  let deleted = conn.execute(
    "DELETE FROM persons WHERE person_id = ?1",
    params![encode_uuid(person_id)],
  )?;
  if deleted == 0 {
    return Err(archiv_core::Error::not_found(Entity::Person, person_id).into());
  }
  tracing::info!(%person_id, "person deleted");
  Ok(())
}

pub fn count_persons(conn: &Connection) -> Result<u64> {
  let count: i64 = conn.query_row("SELECT COUNT(*) FROM persons", [], |row| row.get(0))?;
  Ok(count.unsigned_abs())
}

// ─── Categories ──────────────────────────────────────────────────────────────

pub fn create_category(conn: &Connection, input: NewCategory) -> Result<Category> {
  let input = input.validate()?;
  let category = Category {
    category_id: Uuid::new_v4(),
    name:        input.name,
    description: input.description,
  };

  conn.execute(
    "INSERT INTO categories (category_id, name, description) VALUES (?1, ?2, ?3)",
    params![encode_uuid(category.category_id), category.name, category.description],
  )?;
  Ok(category)
}

pub fn get_category(conn: &Connection, category_id: Uuid) -> Result<Option<Category>> {
  conn
    .query_row(
      &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1"),
      params![encode_uuid(category_id)],
      RawCategory::from_row,
    )
    .optional()?
    .map(RawCategory::into_category)
    .transpose()
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name, category_id"
  ))?;
  let raws = stmt
    .query_map([], RawCategory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCategory::into_category).collect()
}
