//! Built-in field requirement settings.
//!
//! Requirements are a form-level check: the store reports unmet
//! requirements but does not refuse writes because of them.

use crate::model::custom_field::{CustomField, CustomFieldId};
use crate::model::person::Person;
use serde::{Deserialize, Serialize};

/// Which built-in person fields a form must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldRequirements {
    pub email: bool,
    pub phone: bool,
    pub address: bool,
    pub birth_date: bool,
    pub last_name: bool,
    pub nickname: bool,
}

impl Default for FieldRequirements {
    fn default() -> Self {
        Self {
            email: true,
            phone: false,
            address: false,
            birth_date: false,
            last_name: false,
            nickname: false,
        }
    }
}

/// Built-in person field that can be marked required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementField {
    Email,
    Phone,
    Address,
    BirthDate,
    LastName,
    Nickname,
}

impl RequirementField {
    pub const ALL: [RequirementField; 6] = [
        Self::Email,
        Self::Phone,
        Self::Address,
        Self::BirthDate,
        Self::LastName,
        Self::Nickname,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::BirthDate => "birthDate",
            Self::LastName => "lastName",
            Self::Nickname => "nickname",
        }
    }

    fn value(self, person: &Person) -> Option<&str> {
        match self {
            Self::Email => person.email.as_deref(),
            Self::Phone => person.phone.as_deref(),
            Self::Address => person.address.as_deref(),
            Self::BirthDate => person.birth_date.as_deref(),
            Self::LastName => person.last_name.as_deref(),
            Self::Nickname => person.nickname.as_deref(),
        }
    }
}

/// One requirement a person does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingField {
    Builtin(RequirementField),
    Custom(CustomFieldId),
}

impl FieldRequirements {
    pub fn is_required(&self, field: RequirementField) -> bool {
        match field {
            RequirementField::Email => self.email,
            RequirementField::Phone => self.phone,
            RequirementField::Address => self.address,
            RequirementField::BirthDate => self.birth_date,
            RequirementField::LastName => self.last_name,
            RequirementField::Nickname => self.nickname,
        }
    }

    pub fn set(&mut self, field: RequirementField, required: bool) {
        let flag = match field {
            RequirementField::Email => &mut self.email,
            RequirementField::Phone => &mut self.phone,
            RequirementField::Address => &mut self.address,
            RequirementField::BirthDate => &mut self.birth_date,
            RequirementField::LastName => &mut self.last_name,
            RequirementField::Nickname => &mut self.nickname,
        };
        *flag = required;
    }

    /// Lists unmet built-in and custom-field requirements for `person`.
    pub fn missing_fields(&self, person: &Person, custom_fields: &[CustomField]) -> Vec<MissingField> {
        let builtin = RequirementField::ALL
            .into_iter()
            .filter(|field| self.is_required(*field))
            .filter(|field| field.value(person).map_or(true, |value| value.trim().is_empty()))
            .map(MissingField::Builtin);

        let custom = custom_fields
            .iter()
            .filter(|field| field.required && !person.custom_fields.contains_key(&field.id))
            .map(|field| MissingField::Custom(field.id.clone()));

        builtin.chain(custom).collect()
    }
}
