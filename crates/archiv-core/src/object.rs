//! Archived objects: documents and photographs.
//!
//! Every object shares one base record (archival date, description, dating,
//! people, attached file). The variant-specific part lives in
//! [`ObjectDetails`], a tagged union whose variant *is* the discriminator:
//! [`ArchivedObject::kind`] is derived from it, never stored independently, so
//! a save can't write a tag that disagrees with the payload.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  association::{Associations, edit_selection, resolve_selection},
  blob::{BlobRef, Upload},
  dating::{Dating, DatingInput, DatingPolicy, MSG_REQUIRED, display_dating},
  error::ValidationErrors,
};

pub const MAX_PHOTO_TYPE_LEN: usize = 50;

// ─── Discriminator ───────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ObjectKind {
  Document,
  Photograph,
}

impl ObjectKind {
  /// The value stored in the `kind` column.
  pub fn discriminant(self) -> &'static str { self.into() }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Language a document is written in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::IntoStaticStr,
  strum::EnumIter,
)]
pub enum Language {
  #[default]
  #[serde(rename = "cs")]
  #[strum(serialize = "cs")]
  Czech,
  #[serde(rename = "sk")]
  #[strum(serialize = "sk")]
  Slovak,
  #[serde(rename = "en")]
  #[strum(serialize = "en")]
  English,
  #[serde(rename = "de")]
  #[strum(serialize = "de")]
  German,
  #[serde(rename = "pl")]
  #[strum(serialize = "pl")]
  Polish,
  #[serde(rename = "fr")]
  #[strum(serialize = "fr")]
  French,
  #[serde(rename = "la")]
  #[strum(serialize = "la")]
  Latin,
  #[serde(rename = "ru")]
  #[strum(serialize = "ru")]
  Russian,
  #[serde(rename = "jin")]
  #[strum(serialize = "jin")]
  Other,
}

impl Language {
  pub fn code(self) -> &'static str { self.into() }

  pub fn label(self) -> &'static str {
    match self {
      Self::Czech => "Čeština",
      Self::Slovak => "Slovenština",
      Self::English => "Angličtina",
      Self::German => "Němčina",
      Self::Polish => "Polština",
      Self::French => "Francouzština",
      Self::Latin => "Latina",
      Self::Russian => "Ruština",
      Self::Other => "Jiný",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDetails {
  /// Weak reference; cleared when the category goes away.
  pub category_id: Option<Uuid>,
  pub language:    Language,
}

// ─── Photograph ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotographDetails {
  /// Free text, e.g. "portrait", "landscape".
  pub photo_type: String,
  pub height_cm:  u32,
  pub width_cm:   u32,
}

// ─── ArchivedObject ──────────────────────────────────────────────────────────

/// Variant-specific payload of an archived object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectDetails {
  Document(DocumentDetails),
  Photograph(PhotographDetails),
}

impl ObjectDetails {
  pub fn kind(&self) -> ObjectKind {
    match self {
      Self::Document(_) => ObjectKind::Document,
      Self::Photograph(_) => ObjectKind::Photograph,
    }
  }

  pub fn to_input(&self) -> DetailsInput {
    match self {
      Self::Document(d) => DetailsInput::Document(DocumentInput {
        category_id: d.category_id,
        language:    Some(d.language),
      }),
      Self::Photograph(p) => DetailsInput::Photograph(PhotographInput {
        photo_type: p.photo_type.clone(),
        height_cm:  Some(p.height_cm),
        width_cm:   Some(p.width_cm),
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedObject {
  pub object_id:      Uuid,
  pub archived_on:    NaiveDate,
  pub description:    String,
  pub dating:         Dating,
  /// Always a member of `people` after a save.
  pub primary_person: Option<Uuid>,
  /// Association set; storage order carries no meaning.
  pub people:         Vec<Uuid>,
  pub blob:           Option<BlobRef>,
  pub details:        ObjectDetails,
}

impl ArchivedObject {
  pub fn kind(&self) -> ObjectKind { self.details.kind() }

  pub fn datation_display(&self) -> String { display_dating(Some(&self.dating)) }

  /// The person selection to present when editing: primary person first.
  pub fn edit_selection(&self) -> Vec<Uuid> {
    edit_selection(self.primary_person, &self.people)
  }

  /// Fields that, resubmitted unchanged, reproduce this object.
  pub fn edit_fields(&self) -> ObjectFields {
    ObjectFields {
      archived_on: Some(self.archived_on),
      description: self.description.clone(),
      dating:      self.dating.to_input(),
      people:      self.edit_selection(),
      upload:      None,
      details:     self.details.to_input(),
    }
  }

  pub fn category_id(&self) -> Option<Uuid> {
    match &self.details {
      ObjectDetails::Document(d) => d.category_id,
      ObjectDetails::Photograph(_) => None,
    }
  }
}

/// Per-variant counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCounts {
  pub document:   u64,
  pub photograph: u64,
}

// ─── Input ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInput {
  pub category_id: Option<Uuid>,
  /// Defaults to Czech.
  pub language:    Option<Language>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotographInput {
  #[serde(default)]
  pub photo_type: String,
  pub height_cm:  Option<u32>,
  pub width_cm:   Option<u32>,
}

/// Variant-specific input; its variant selects what gets created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetailsInput {
  Document(DocumentInput),
  Photograph(PhotographInput),
}

impl DetailsInput {
  pub fn kind(&self) -> ObjectKind {
    match self {
      Self::Document(_) => ObjectKind::Document,
      Self::Photograph(_) => ObjectKind::Photograph,
    }
  }

  pub fn validate(&self) -> Result<ObjectDetails, ValidationErrors> {
    match self {
      Self::Document(d) => Ok(ObjectDetails::Document(DocumentDetails {
        category_id: d.category_id,
        language:    d.language.unwrap_or_default(),
      })),
      Self::Photograph(p) => {
        let mut errors = ValidationErrors::new();
        let photo_type = p.photo_type.trim().to_owned();
        if photo_type.chars().count() > MAX_PHOTO_TYPE_LEN {
          errors.add(
            "photo_type",
            format!("ensure this value has at most {MAX_PHOTO_TYPE_LEN} characters"),
          );
        }
        let height_cm = positive_dimension("height_cm", p.height_cm, &mut errors);
        let width_cm = positive_dimension("width_cm", p.width_cm, &mut errors);
        errors.into_result(ObjectDetails::Photograph(PhotographDetails {
          photo_type,
          height_cm,
          width_cm,
        }))
      }
    }
  }
}

fn positive_dimension(field: &str, value: Option<u32>, errors: &mut ValidationErrors) -> u32 {
  match value {
    None => {
      errors.add(field, MSG_REQUIRED);
      0
    }
    Some(0) => {
      errors.add(field, "ensure this value is greater than or equal to 1");
      0
    }
    Some(cm) => cm,
  }
}

/// Everything a caller submits to create or update an archived object.
#[derive(Debug, Clone)]
pub struct ObjectFields {
  /// Defaults to today on create; left unchanged on update when `None`.
  pub archived_on: Option<NaiveDate>,
  pub description: String,
  pub dating:      DatingInput,
  /// Ordered selection; the first entry becomes the primary person.
  pub people:      Vec<Uuid>,
  /// A new file replacing whatever is attached.
  pub upload:      Option<Upload>,
  pub details:     DetailsInput,
}

impl ObjectFields {
  pub fn new(dating: DatingInput, details: DetailsInput) -> Self {
    Self {
      archived_on: None,
      description: String::new(),
      dating,
      people: Vec::new(),
      upload: None,
      details,
    }
  }

  pub fn kind(&self) -> ObjectKind { self.details.kind() }

  /// Run every check that needs no storage lookups, collecting all messages.
  pub fn check(
    &self,
    policy: &DatingPolicy,
    today: NaiveDate,
  ) -> Result<CheckedObject, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let dating = errors.absorb(policy.resolve(&self.dating, today));
    let details = errors.absorb(self.details.validate());

    match (dating, details) {
      (Some(dating), Some(details)) if errors.is_empty() => Ok(CheckedObject {
        archived_on: self.archived_on,
        description: self.description.clone(),
        dating,
        associations: resolve_selection(&self.people),
        details,
      }),
      _ => Err(errors),
    }
  }
}

/// Validated, normalized object content ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedObject {
  pub archived_on:  Option<NaiveDate>,
  pub description:  String,
  pub dating:       Dating,
  pub associations: Associations,
  pub details:      ObjectDetails,
}

#[cfg(test)]
mod tests {
  use crate::dating::{Century, MSG_ONLY_ONE};

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 10, 19).unwrap() }

  fn photo(height_cm: Option<u32>, width_cm: Option<u32>) -> DetailsInput {
    DetailsInput::Photograph(PhotographInput {
      photo_type: "portrét".into(),
      height_cm,
      width_cm,
    })
  }

  #[test]
  fn document_defaults_to_czech() {
    let details = DetailsInput::Document(DocumentInput::default()).validate().unwrap();
    assert_eq!(
      details,
      ObjectDetails::Document(DocumentDetails { category_id: None, language: Language::Czech })
    );
    assert_eq!(Language::default().code(), "cs");
    assert_eq!("jin".parse::<Language>().unwrap(), Language::Other);
  }

  #[test]
  fn photograph_dimensions_are_required_and_positive() {
    let errors = photo(None, Some(0)).validate().unwrap_err();
    assert!(errors.contains("height_cm", MSG_REQUIRED));
    assert!(errors.contains("width_cm", "ensure this value is greater than or equal to 1"));
    assert!(photo(Some(10), Some(15)).validate().is_ok());
  }

  #[test]
  fn check_reports_dating_and_details_together() {
    let fields = ObjectFields::new(
      DatingInput { year: Some(1850), ..DatingInput::century(Century::Nineteenth) },
      photo(Some(10), None),
    );
    let errors = fields.check(&DatingPolicy::default(), today()).unwrap_err();
    assert!(errors.contains("dating", MSG_ONLY_ONE));
    assert!(errors.contains("width_cm", MSG_REQUIRED));
  }

  #[test]
  fn check_resolves_people() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut fields = ObjectFields::new(
      DatingInput::year(1950),
      DetailsInput::Document(DocumentInput::default()),
    );
    fields.people = vec![a, b, a];

    let checked = fields.check(&DatingPolicy::default(), today()).unwrap();
    assert_eq!(checked.associations.primary, Some(a));
    assert_eq!(checked.associations.people, [a, b]);
    assert_eq!(checked.details.kind(), ObjectKind::Document);
  }

  #[test]
  fn edit_fields_round_trip() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let object = ArchivedObject {
      object_id:      Uuid::new_v4(),
      archived_on:    today(),
      description:    "Dopis z fronty".into(),
      dating:         Dating::Year(1916),
      primary_person: Some(b),
      people:         vec![a, b],
      blob:           None,
      details:        ObjectDetails::Photograph(PhotographDetails {
        photo_type: "skupinová".into(),
        height_cm:  9,
        width_cm:   13,
      }),
    };

    let fields = object.edit_fields();
    assert_eq!(fields.people, [b, a]);

    let checked = fields.check(&DatingPolicy::default(), today()).unwrap();
    assert_eq!(checked.dating, object.dating);
    assert_eq!(checked.details, object.details);
    assert_eq!(checked.associations.primary, object.primary_person);
    assert_eq!(object.datation_display(), "1916");
    assert_eq!(object.kind().discriminant(), "photograph");
  }
}
