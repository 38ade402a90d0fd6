//! Relationship record as seen from one person.

use super::person::PersonId;
use serde::{Deserialize, Serialize};

/// Suggested relationship types offered to callers; any non-empty type is accepted.
pub const DEFAULT_RELATIONSHIP_TYPES: [&str; 6] = [
    "Family",
    "Friend",
    "Colleague",
    "Classmate",
    "Neighbor",
    "Business",
];

/// Directed view of a relationship stored on its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub related_person_id: PersonId,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Relationship {
    pub fn new(related_person_id: impl Into<PersonId>, kind: impl Into<String>) -> Self {
        Self {
            related_person_id: related_person_id.into(),
            kind: kind.into(),
        }
    }
}
