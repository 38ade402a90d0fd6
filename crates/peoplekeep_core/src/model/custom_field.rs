//! User-defined custom field definitions and typed values.
//!
//! # Responsibility
//! - Define the declared type of each custom field.
//! - Validate values against their field at write time.
//! - Coerce untyped persisted values into typed values on load.
//!
//! # Invariants
//! - `options` is non-empty exactly for single-select fields.
//! - A `FieldValue` variant always matches its field's `FieldType`.

use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type CustomFieldId = String;

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid iso date regex")
});

/// Declared type of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    #[serde(alias = "checkbox")]
    Boolean,
    #[serde(alias = "select")]
    SingleSelect,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::SingleSelect => "single_select",
        }
    }
}

/// Typed custom field value stored on a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(String),
    Boolean(bool),
    Select(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Number(_) => FieldType::Number,
            Self::Date(_) => FieldType::Date,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Select(_) => FieldType::SingleSelect,
        }
    }
}

/// Persisted custom field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: CustomFieldId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, alias = "isRequired")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Caller input for creating a custom field; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFieldDraft {
    pub name: String,
    pub kind: FieldType,
    pub required: bool,
    pub options: Vec<String>,
}

impl CustomFieldDraft {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

impl CustomField {
    /// Builds a validated definition from caller input.
    ///
    /// Names and options are trimmed; blank and duplicate options are
    /// dropped. Options are discarded for non-select types.
    pub fn from_draft(id: CustomFieldId, draft: CustomFieldDraft) -> Result<Self, ValidationError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyFieldName);
        }

        let mut options: Vec<String> = Vec::new();
        if draft.kind == FieldType::SingleSelect {
            for option in draft.options {
                let option = option.trim();
                if !option.is_empty() && !options.iter().any(|known| known == option) {
                    options.push(option.to_string());
                }
            }
            if options.is_empty() {
                return Err(ValidationError::MissingSelectOptions(name));
            }
        }

        Ok(Self {
            id,
            name,
            kind: draft.kind,
            required: draft.required,
            options,
        })
    }

    /// Validates one value against this field's declared type and options.
    pub fn validate_value(&self, value: &FieldValue) -> Result<(), ValidationError> {
        if value.field_type() != self.kind {
            return Err(ValidationError::TypeMismatch {
                field_id: self.id.clone(),
                expected: self.kind,
                actual: value.field_type(),
            });
        }

        match value {
            FieldValue::Number(number) if !number.is_finite() => {
                Err(ValidationError::NonFiniteNumber(self.id.clone()))
            }
            FieldValue::Date(date) if !is_iso_date(date) => Err(ValidationError::MalformedDate {
                field_id: self.id.clone(),
                value: date.clone(),
            }),
            FieldValue::Select(choice) if !self.options.iter().any(|option| option == choice) => {
                Err(ValidationError::OptionNotAllowed {
                    field_id: self.id.clone(),
                    value: choice.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Converts an untyped persisted value into a typed value.
    ///
    /// Returns `None` when the raw value cannot represent this field's type.
    pub fn coerce_raw(&self, raw: &Value) -> Option<FieldValue> {
        let value = match (self.kind, raw) {
            (FieldType::Text, Value::String(text)) => FieldValue::Text(text.clone()),
            (FieldType::Text, Value::Number(number)) => FieldValue::Text(number.to_string()),
            (FieldType::Number, Value::Number(number)) => FieldValue::Number(number.as_f64()?),
            (FieldType::Number, Value::String(text)) => {
                FieldValue::Number(text.trim().parse::<f64>().ok()?)
            }
            (FieldType::Date, Value::String(text)) => FieldValue::Date(text.trim().to_string()),
            (FieldType::Boolean, Value::Bool(flag)) => FieldValue::Boolean(*flag),
            (FieldType::Boolean, Value::String(text)) => match text.trim() {
                "true" => FieldValue::Boolean(true),
                "false" => FieldValue::Boolean(false),
                _ => return None,
            },
            (FieldType::SingleSelect, Value::String(text)) => FieldValue::Select(text.clone()),
            _ => return None,
        };

        self.validate_value(&value).ok().map(|()| value)
    }
}

fn is_iso_date(value: &str) -> bool {
    let Some(caps) = ISO_DATE_RE.captures(value) else {
        return false;
    };
    let month = caps[2].parse::<u32>().unwrap_or(0);
    let day = caps[3].parse::<u32>().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}
