//! People an archived object can be linked to.
//!
//! Persons are persisted independently. Objects reference them weakly: when a
//! person is deleted, the objects keep existing and simply lose the link.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{dating::DatingPolicy, error::ValidationErrors};

/// Longest given or family name accepted.
pub const MAX_NAME_LEN: usize = 100;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum Sex {
  #[serde(rename = "M")]
  #[strum(serialize = "M")]
  Male,
  #[serde(rename = "F")]
  #[strum(serialize = "F")]
  Female,
}

impl Sex {
  pub fn code(self) -> &'static str { self.into() }

  pub fn label(self) -> &'static str {
    match self {
      Self::Male => "Muž",
      Self::Female => "Žena",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub person_id:   Uuid,
  pub given_name:  String,
  pub family_name: String,
  pub born:        Option<NaiveDate>,
  pub died:        Option<NaiveDate>,
  pub sex:         Option<Sex>,
}

impl Person {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.given_name, self.family_name)
  }

  /// The fields of this person as editable input.
  pub fn to_input(&self) -> NewPerson {
    NewPerson {
      given_name:  self.given_name.clone(),
      family_name: self.family_name.clone(),
      born:        self.born,
      died:        self.died,
      sex:         self.sex,
    }
  }
}

/// Input to [`crate::store::ArchiveStore::create_person`] and
/// [`crate::store::ArchiveStore::update_person`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
  pub given_name:  String,
  pub family_name: String,
  #[serde(default)]
  pub born:        Option<NaiveDate>,
  #[serde(default)]
  pub died:        Option<NaiveDate>,
  #[serde(default)]
  pub sex:         Option<Sex>,
}

impl NewPerson {
  pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
    Self {
      given_name: given_name.into(),
      family_name: family_name.into(),
      ..Default::default()
    }
  }

  /// Check names and life dates, returning the normalized (trimmed) input.
  ///
  /// Life dates must not lie in the future or before the policy's minimum
  /// year; a death date must come strictly after the birth date.
  pub fn validate(
    mut self,
    policy: &DatingPolicy,
    today: NaiveDate,
  ) -> Result<Self, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    self.given_name = required_name("given_name", &self.given_name, &mut errors);
    self.family_name = required_name("family_name", &self.family_name, &mut errors);

    let born_ok = match self.born {
      Some(born) => policy.check_past_date("born", born, today, &mut errors),
      None => true,
    };

    if let Some(died) = self.died {
      let died_ok = policy.check_past_date("died", died, today, &mut errors);
      if let (Some(born), true, true) = (self.born, born_ok, died_ok) {
        if died == born {
          errors.add("died", "date of death cannot equal the date of birth");
        } else if died < born {
          errors.add("died", "date of death cannot precede the date of birth");
        }
      }
    }

    errors.into_result(self)
  }
}

fn required_name(field: &str, value: &str, errors: &mut ValidationErrors) -> String {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    errors.add(field, crate::dating::MSG_REQUIRED);
  } else if trimmed.chars().count() > MAX_NAME_LEN {
    errors.add(field, format!("ensure this value has at most {MAX_NAME_LEN} characters"));
  }
  trimmed.to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 10, 19).unwrap() }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn validate(input: NewPerson) -> Result<NewPerson, ValidationErrors> {
    input.validate(&DatingPolicy::default(), today())
  }

  #[test]
  fn names_are_trimmed_and_required() {
    let ok = validate(NewPerson::new("  Jan ", "Novák")).unwrap();
    assert_eq!(ok.given_name, "Jan");

    let errors = validate(NewPerson::new(" ", "")).unwrap_err();
    assert!(errors.contains("given_name", "this field is required"));
    assert!(errors.contains("family_name", "this field is required"));
  }

  #[test]
  fn future_birth_is_rejected() {
    let input = NewPerson { born: Some(date(2030, 1, 1)), ..NewPerson::new("Jan", "Novák") };
    let errors = validate(input).unwrap_err();
    assert!(errors.contains("born", "cannot be in the future"));
  }

  #[test]
  fn dates_before_min_year_are_rejected() {
    let input = NewPerson {
      born: Some(date(998, 1, 1)),
      died: Some(date(999, 1, 1)),
      ..NewPerson::new("Jan", "Novák")
    };
    let errors = validate(input).unwrap_err();
    assert!(errors.contains("born", "year must not be before 1000"));
    assert!(errors.contains("died", "year must not be before 1000"));
  }

  #[test]
  fn death_must_follow_birth() {
    let base = NewPerson::new("Jan", "Novák");

    let same = NewPerson { born: Some(date(1900, 1, 1)), died: Some(date(1900, 1, 1)), ..base.clone() };
    assert!(validate(same).unwrap_err().contains("died", "date of death cannot equal the date of birth"));

    let before = NewPerson { born: Some(date(1900, 1, 1)), died: Some(date(1899, 1, 1)), ..base.clone() };
    assert!(validate(before).unwrap_err().contains("died", "date of death cannot precede the date of birth"));

    let fine = NewPerson { born: Some(date(1900, 1, 1)), died: Some(date(1970, 3, 2)), ..base };
    assert!(validate(fine).is_ok());
  }

  #[test]
  fn death_without_birth_only_checks_bounds() {
    let input = NewPerson { died: Some(date(1950, 1, 1)), ..NewPerson::new("Jan", "Novák") };
    assert!(validate(input).is_ok());
  }

  #[test]
  fn full_name_joins_given_and_family() {
    let person = Person {
      person_id:   Uuid::nil(),
      given_name:  "Marie".into(),
      family_name: "Curie".into(),
      born:        None,
      died:        None,
      sex:         Some(Sex::Female),
    };
    assert_eq!(person.full_name(), "Marie Curie");
    assert_eq!(person.sex.map(Sex::code), Some("F"));
  }
}
