//! Reconciling the person selection with the primary person.
//!
//! Callers present an ordered multi-select of people. The first entry is the
//! object's primary person; the whole (deduplicated) list is its association
//! set. Both directions are pure functions so the round trip
//! `edit_selection(resolve_selection(s)) == dedup(s)` can be checked without a
//! database.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stored side of a person selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Associations {
  /// Always the first entry of `people` when set.
  pub primary: Option<Uuid>,
  /// Deduplicated, in selection order.
  pub people:  Vec<Uuid>,
}

impl Associations {
  pub fn is_empty(&self) -> bool { self.people.is_empty() }
}

/// Derive the primary person and association set from an ordered selection.
pub fn resolve_selection(selection: &[Uuid]) -> Associations {
  let people = dedup(selection.iter().copied());
  Associations { primary: people.first().copied(), people }
}

/// Rebuild the ordered selection to present when editing an existing object:
/// the primary person first, followed by the remaining associated people.
pub fn edit_selection(primary: Option<Uuid>, people: &[Uuid]) -> Vec<Uuid> {
  dedup(primary.into_iter().chain(people.iter().copied()))
}

fn dedup(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
  let mut seen = HashSet::new();
  ids.filter(|id| seen.insert(*id)).collect()
}
