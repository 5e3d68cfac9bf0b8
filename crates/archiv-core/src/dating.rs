//! Dating of archived objects.
//!
//! An object is dated by exactly one of three representations: a precise
//! calendar date, a bare year, or a century. In memory that is the [`Dating`]
//! enum, so the "none" and "several" states cannot exist. Callers submit a
//! [`DatingInput`] (the selected mode plus whatever they typed into each of
//! the three fields) and [`DatingPolicy::resolve`] turns it into a `Dating`
//! or a set of field-scoped validation messages.
//!
//! The three nullable columns only exist at the persistence boundary, see
//! [`Dating::to_columns`] and [`Dating::from_columns`].

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

/// Earliest year any date in the archive may fall in.
pub const MIN_YEAR: i32 = 1000;

/// How many years past the current one a bare year may point.
pub const YEARS_AHEAD: i32 = 5;

/// Rendered when an object carries no dating at all.
pub const UNDATED_PLACEHOLDER: &str = "neuvedeno";

pub const MSG_MODE_REQUIRED: &str = "dating method required";
pub const MSG_ONLY_ONE: &str = "only one dating field may be filled";
pub const MSG_REQUIRED: &str = "this field is required";
pub const MSG_IN_FUTURE: &str = "cannot be in the future";

// ─── Century ─────────────────────────────────────────────────────────────────

/// The centuries the archive can attribute an object to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::IntoStaticStr,
  strum::EnumIter,
)]
pub enum Century {
  #[serde(rename = "15")]
  #[strum(serialize = "15")]
  Fifteenth,
  #[serde(rename = "16")]
  #[strum(serialize = "16")]
  Sixteenth,
  #[serde(rename = "17")]
  #[strum(serialize = "17")]
  Seventeenth,
  #[serde(rename = "18")]
  #[strum(serialize = "18")]
  Eighteenth,
  #[serde(rename = "19")]
  #[strum(serialize = "19")]
  Nineteenth,
  #[serde(rename = "20")]
  #[strum(serialize = "20")]
  Twentieth,
  #[serde(rename = "21")]
  #[strum(serialize = "21")]
  TwentyFirst,
}

impl Century {
  /// Two-digit code stored in the database, e.g. `"19"`.
  pub fn code(self) -> &'static str { self.into() }

  /// Localized label, e.g. `"19. století"`.
  pub fn label(self) -> &'static str {
    match self {
      Self::Fifteenth => "15. století",
      Self::Sixteenth => "16. století",
      Self::Seventeenth => "17. století",
      Self::Eighteenth => "18. století",
      Self::Nineteenth => "19. století",
      Self::Twentieth => "20. století",
      Self::TwentyFirst => "21. století",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> { code.parse().ok() }
}

// ─── Dating ──────────────────────────────────────────────────────────────────

/// The one dating representation an archived object carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Dating {
  Precise(NaiveDate),
  Year(i32),
  Century(Century),
}

/// The three nullable persistence columns a [`Dating`] is flattened into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatingColumns {
  pub precise_date: Option<NaiveDate>,
  pub year:         Option<i32>,
  pub century:      Option<Century>,
}

impl Dating {
  pub fn mode(&self) -> DatingMode {
    match self {
      Self::Precise(_) => DatingMode::PreciseDate,
      Self::Year(_) => DatingMode::Year,
      Self::Century(_) => DatingMode::Century,
    }
  }

  /// Exactly one column is set; the other two are always `None`.
  pub fn to_columns(self) -> DatingColumns {
    match self {
      Self::Precise(date) => DatingColumns { precise_date: Some(date), ..Default::default() },
      Self::Year(year) => DatingColumns { year: Some(year), ..Default::default() },
      Self::Century(century) => DatingColumns { century: Some(century), ..Default::default() },
    }
  }

  /// Rebuild from stored columns. `None` unless exactly one is set.
  pub fn from_columns(columns: DatingColumns) -> Option<Self> {
    match (columns.precise_date, columns.year, columns.century) {
      (Some(date), None, None) => Some(Self::Precise(date)),
      (None, Some(year), None) => Some(Self::Year(year)),
      (None, None, Some(century)) => Some(Self::Century(century)),
      _ => None,
    }
  }

  /// Caller-facing input that resolves back to this dating.
  pub fn to_input(self) -> DatingInput {
    let columns = self.to_columns();
    DatingInput {
      mode:         self.mode(),
      precise_date: columns.precise_date,
      year:         columns.year,
      century:      columns.century,
    }
  }
}

impl fmt::Display for Dating {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Precise(date) => write!(f, "{}", date.format("%d.%m.%Y")),
      Self::Year(year) => write!(f, "{year}"),
      Self::Century(century) => f.write_str(century.label()),
    }
  }
}

/// `DD.MM.YYYY`, the bare year, the century label, or the placeholder.
pub fn display_dating(dating: Option<&Dating>) -> String {
  dating.map_or_else(|| UNDATED_PLACEHOLDER.to_owned(), Dating::to_string)
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Which representation the caller chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatingMode {
  PreciseDate,
  Year,
  Century,
  #[default]
  None,
}

/// Raw dating input as submitted: a mode and all three candidate values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatingInput {
  #[serde(default)]
  pub mode:         DatingMode,
  pub precise_date: Option<NaiveDate>,
  pub year:         Option<i32>,
  pub century:      Option<Century>,
}

impl DatingInput {
  pub fn precise(date: NaiveDate) -> Self {
    Self { mode: DatingMode::PreciseDate, precise_date: Some(date), ..Default::default() }
  }

  pub fn year(year: i32) -> Self {
    Self { mode: DatingMode::Year, year: Some(year), ..Default::default() }
  }

  pub fn century(century: Century) -> Self {
    Self { mode: DatingMode::Century, century: Some(century), ..Default::default() }
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Bounds applied to every date the archive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatingPolicy {
  pub min_year:    i32,
  pub years_ahead: i32,
}

impl Default for DatingPolicy {
  fn default() -> Self { Self { min_year: MIN_YEAR, years_ahead: YEARS_AHEAD } }
}

impl DatingPolicy {
  /// Highest bare year accepted when today is `today`.
  pub fn max_year(&self, today: NaiveDate) -> i32 {
    today.year().saturating_add(self.years_ahead)
  }

  /// Validate `input` and produce the single dating it selects.
  ///
  /// Under-specification (no mode, or the chosen field empty) and
  /// over-specification (any other field filled) are both rejected; the
  /// policy never picks one field over another on its own.
  pub fn resolve(
    &self,
    input: &DatingInput,
    today: NaiveDate,
  ) -> Result<Dating, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let (selected, strays) = match input.mode {
      DatingMode::None => {
        errors.add("dating", MSG_MODE_REQUIRED);
        return Err(errors);
      }
      DatingMode::PreciseDate => (
        self.check_precise(input.precise_date, today, &mut errors),
        input.year.is_some() || input.century.is_some(),
      ),
      DatingMode::Year => (
        self.check_year(input.year, today, &mut errors),
        input.precise_date.is_some() || input.century.is_some(),
      ),
      DatingMode::Century => {
        let dating = input.century.map(Dating::Century);
        if dating.is_none() {
          errors.add("century", MSG_REQUIRED);
        }
        (dating, input.precise_date.is_some() || input.year.is_some())
      }
    };

    if strays {
      errors.add("dating", MSG_ONLY_ONE);
    }

    match selected {
      Some(dating) if errors.is_empty() => Ok(dating),
      _ => Err(errors),
    }
  }

  /// Shared by person life dates: not in the future, not before `min_year`.
  pub fn check_past_date(
    &self,
    field: &str,
    date: NaiveDate,
    today: NaiveDate,
    errors: &mut ValidationErrors,
  ) -> bool {
    let mut ok = true;
    if date > today {
      errors.add(field, MSG_IN_FUTURE);
      ok = false;
    }
    if date.year() < self.min_year {
      errors.add(field, format!("year must not be before {}", self.min_year));
      ok = false;
    }
    ok
  }

  fn check_precise(
    &self,
    date: Option<NaiveDate>,
    today: NaiveDate,
    errors: &mut ValidationErrors,
  ) -> Option<Dating> {
    let Some(date) = date else {
      errors.add("precise_date", MSG_REQUIRED);
      return None;
    };
    self
      .check_past_date("precise_date", date, today, errors)
      .then_some(Dating::Precise(date))
  }

  fn check_year(
    &self,
    year: Option<i32>,
    today: NaiveDate,
    errors: &mut ValidationErrors,
  ) -> Option<Dating> {
    let Some(year) = year else {
      errors.add("year", MSG_REQUIRED);
      return None;
    };
    let max = self.max_year(today);
    if !(self.min_year..=max).contains(&year) {
      errors.add(
        "year",
        format!("ensure this value is between {} and {max}", self.min_year),
      );
      return None;
    }
    Some(Dating::Year(year))
  }
}
