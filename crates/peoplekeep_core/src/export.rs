//! Whole-directory export document.
//!
//! Export is a privileged operation: hidden people are included.

use crate::model::custom_field::CustomField;
use crate::model::person::Person;
use crate::settings::FieldRequirements;
use crate::store::EntityStore;
use log::info;
use serde::{Deserialize, Serialize};

/// Downloadable snapshot of the directory plus UI preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub people: Vec<Person>,
    pub custom_fields: Vec<CustomField>,
    pub field_requirements: FieldRequirements,
    pub language: String,
    pub theme: String,
}

impl ExportBundle {
    /// Pretty-printed JSON document.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl EntityStore {
    pub fn export_bundle(&self, language: &str, theme: &str) -> ExportBundle {
        let bundle = ExportBundle {
            people: self.all_people(),
            custom_fields: self.custom_fields().to_vec(),
            field_requirements: self.field_requirements(),
            language: language.to_string(),
            theme: theme.to_string(),
        };
        info!(
            "event=export_bundle module=export status=ok people={} custom_fields={}",
            bundle.people.len(),
            bundle.custom_fields.len()
        );
        bundle
    }
}
