//! Directory domain model: people, custom fields, photo albums and
//! relationship records.
//!
//! # Responsibility
//! - Define canonical data structures used by the entity store.
//! - Provide write-time validation for user-supplied values.
//!
//! # Invariants
//! - Every person is identified by a stable, never reused `PersonId`.
//! - Every person owns the three reserved albums.
//! - Custom field values are typed by the owning field's declared type.

pub mod album;
pub mod custom_field;
pub mod person;
pub mod relationship;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Write-time validation failures for model values.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyFirstName,
    EmptyFieldName,
    MissingSelectOptions(String),
    UnknownCustomField(String),
    TypeMismatch {
        field_id: String,
        expected: custom_field::FieldType,
        actual: custom_field::FieldType,
    },
    OptionNotAllowed {
        field_id: String,
        value: String,
    },
    MalformedDate {
        field_id: String,
        value: String,
    },
    NonFiniteNumber(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFirstName => write!(f, "first name must not be empty"),
            Self::EmptyFieldName => write!(f, "custom field name must not be empty"),
            Self::MissingSelectOptions(name) => {
                write!(f, "single-select field `{name}` needs at least one option")
            }
            Self::UnknownCustomField(id) => write!(f, "custom field does not exist: {id}"),
            Self::TypeMismatch {
                field_id,
                expected,
                actual,
            } => write!(
                f,
                "custom field {field_id} expects a {} value, got {}",
                expected.as_str(),
                actual.as_str()
            ),
            Self::OptionNotAllowed { field_id, value } => {
                write!(f, "`{value}` is not an option of custom field {field_id}")
            }
            Self::MalformedDate { field_id, value } => {
                write!(f, "custom field {field_id} expects YYYY-MM-DD, got `{value}`")
            }
            Self::NonFiniteNumber(field_id) => {
                write!(f, "custom field {field_id} requires a finite number")
            }
        }
    }
}

impl Error for ValidationError {}
