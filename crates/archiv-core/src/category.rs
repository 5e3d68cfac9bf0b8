//! Document categories.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationErrors;

pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// A classification that only documents can carry. Names are unique by
/// convention, not by constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
  pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

impl NewCategory {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self { name: name.into(), description: description.into() }
  }

  pub fn validate(mut self) -> Result<Self, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    self.name = self.name.trim().to_owned();
    if self.name.is_empty() {
      errors.add("name", crate::dating::MSG_REQUIRED);
    } else if self.name.chars().count() > MAX_CATEGORY_NAME_LEN {
      errors.add(
        "name",
        format!("ensure this value has at most {MAX_CATEGORY_NAME_LEN} characters"),
      );
    }
    errors.into_result(self)
  }
}
