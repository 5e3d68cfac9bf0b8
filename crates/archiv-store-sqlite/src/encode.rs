//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`.
//! Enumerations are stored as their short codes. UUIDs are stored as
//! hyphenated lowercase strings.

use archiv_core::{
  blob::BlobRef,
  category::Category,
  dating::{Century, Dating, DatingColumns},
  object::{
    ArchivedObject, DocumentDetails, Language, ObjectDetails, ObjectKind,
    PhotographDetails,
  },
  person::{Person, Sex},
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(date: NaiveDate) -> String { date.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Codes ───────────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<ObjectKind> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown object kind: {s:?}")))
}

pub fn decode_language(s: &str) -> Result<Language> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown language: {s:?}")))
}

pub fn decode_century(s: &str) -> Result<Century> {
  Century::from_code(s).ok_or_else(|| Error::Corrupt(format!("unknown century: {s:?}")))
}

pub fn decode_sex(s: &str) -> Result<Sex> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown sex code: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `persons` row.
pub struct RawPerson {
  pub person_id:   String,
  pub given_name:  String,
  pub family_name: String,
  pub born:        Option<String>,
  pub died:        Option<String>,
  pub sex:         Option<String>,
}

pub const PERSON_COLUMNS: &str =
  "person_id, given_name, family_name, born, died, sex";

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:   row.get(0)?,
      given_name:  row.get(1)?,
      family_name: row.get(2)?,
      born:        row.get(3)?,
      died:        row.get(4)?,
      sex:         row.get(5)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      person_id:   decode_uuid(&self.person_id)?,
      given_name:  self.given_name,
      family_name: self.family_name,
      born:        self.born.as_deref().map(decode_date).transpose()?,
      died:        self.died.as_deref().map(decode_date).transpose()?,
      sex:         self.sex.as_deref().map(decode_sex).transpose()?,
    })
  }
}

/// Raw values read from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub description: String,
}

pub const CATEGORY_COLUMNS: &str = "category_id, name, description";

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
      description: self.description,
    })
  }
}

/// Raw values read from a `blobs` row.
pub struct RawBlob {
  pub blob_id:      String,
  pub file_name:    String,
  pub path:         String,
  pub content_hash: String,
  pub size:         i64,
  pub stored_at:    String,
}

impl RawBlob {
  pub fn into_blob(self) -> Result<BlobRef> {
    Ok(BlobRef {
      blob_id:      decode_uuid(&self.blob_id)?,
      file_name:    self.file_name,
      path:         self.path,
      content_hash: self.content_hash,
      size:         u64::try_from(self.size)
        .map_err(|_| Error::Corrupt(format!("negative blob size {}", self.size)))?,
      stored_at:    decode_dt(&self.stored_at)?,
    })
  }
}

/// Base row joined with both variant tables and the attached blob.
pub const OBJECT_SELECT: &str = "
  SELECT
    o.object_id, o.kind, o.archived_on, o.description,
    o.precise_date, o.year, o.century, o.primary_person_id,
    d.category_id, d.language,
    p.photo_type, p.height_cm, p.width_cm,
    b.blob_id, b.file_name, b.path, b.content_hash, b.size, b.stored_at
  FROM archived_objects o
  LEFT JOIN documents   d ON d.object_id = o.object_id
  LEFT JOIN photographs p ON p.object_id = o.object_id
  LEFT JOIN blobs       b ON b.blob_id   = o.blob_id";

/// Raw values read with [`OBJECT_SELECT`].
pub struct RawObject {
  // archived_objects columns
  pub object_id:         String,
  pub kind:              String,
  pub archived_on:       String,
  pub description:       String,
  pub precise_date:      Option<String>,
  pub year:              Option<i32>,
  pub century:           Option<String>,
  pub primary_person_id: Option<String>,
  // documents join
  pub category_id:       Option<String>,
  pub language:          Option<String>,
  // photographs join
  pub photo_type:        Option<String>,
  pub height_cm:         Option<i64>,
  pub width_cm:          Option<i64>,
  // blobs join
  pub blob:              Option<RawBlob>,
}

impl RawObject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let blob_id: Option<String> = row.get(13)?;
    let blob = match blob_id {
      Some(blob_id) => Some(RawBlob {
        blob_id,
        file_name:    row.get(14)?,
        path:         row.get(15)?,
        content_hash: row.get(16)?,
        size:         row.get(17)?,
        stored_at:    row.get(18)?,
      }),
      None => None,
    };

    Ok(Self {
      object_id: row.get(0)?,
      kind: row.get(1)?,
      archived_on: row.get(2)?,
      description: row.get(3)?,
      precise_date: row.get(4)?,
      year: row.get(5)?,
      century: row.get(6)?,
      primary_person_id: row.get(7)?,
      category_id: row.get(8)?,
      language: row.get(9)?,
      photo_type: row.get(10)?,
      height_cm: row.get(11)?,
      width_cm: row.get(12)?,
      blob,
    })
  }

  /// Assemble the domain object; `people` comes from `object_people`.
  pub fn into_object(self, people: Vec<Uuid>) -> Result<ArchivedObject> {
    let object_id = decode_uuid(&self.object_id)?;

    let columns = DatingColumns {
      precise_date: self.precise_date.as_deref().map(decode_date).transpose()?,
      year:         self.year,
      century:      self.century.as_deref().map(decode_century).transpose()?,
    };
    let dating = Dating::from_columns(columns).ok_or_else(|| {
      Error::Corrupt(format!("object {object_id} must carry exactly one dating value"))
    })?;

    let details = match decode_kind(&self.kind)? {
      ObjectKind::Document => {
        let language = self.language.ok_or_else(|| {
          Error::Corrupt(format!("document {object_id} has no documents row"))
        })?;
        ObjectDetails::Document(DocumentDetails {
          category_id: self.category_id.as_deref().map(decode_uuid).transpose()?,
          language:    decode_language(&language)?,
        })
      }
      ObjectKind::Photograph => {
        let (Some(photo_type), Some(height), Some(width)) =
          (self.photo_type, self.height_cm, self.width_cm)
        else {
          return Err(Error::Corrupt(format!(
            "photograph {object_id} has no photographs row"
          )));
        };
        ObjectDetails::Photograph(PhotographDetails {
          photo_type,
          height_cm: decode_dimension(height)?,
          width_cm: decode_dimension(width)?,
        })
      }
    };

    Ok(ArchivedObject {
      object_id,
      archived_on: decode_date(&self.archived_on)?,
      description: self.description,
      dating,
      primary_person: self.primary_person_id.as_deref().map(decode_uuid).transpose()?,
      people,
      blob: self.blob.map(RawBlob::into_blob).transpose()?,
      details,
    })
  }
}

fn decode_dimension(cm: i64) -> Result<u32> {
  u32::try_from(cm).map_err(|_| Error::Corrupt(format!("dimension out of range: {cm}")))
}
