//! Custom field definitions and their cascade into person records.

use super::{new_id, EntityKind, EntityStore, StoreError, StoreResult};
use crate::model::custom_field::{CustomField, CustomFieldDraft};
use crate::storage::Collection;
use log::info;

impl EntityStore {
    /// Defines a new custom field under a fresh id.
    pub fn add_custom_field(&mut self, draft: CustomFieldDraft) -> StoreResult<CustomField> {
        let field = CustomField::from_draft(new_id(), draft)?;

        info!(
            "event=custom_field_add module=store status=ok field_id={} type={}",
            field.id,
            field.kind.as_str()
        );
        self.custom_fields.push(field.clone());
        self.persist("add_custom_field", &[Collection::CustomFields]);
        Ok(field)
    }

    /// Deletes a field definition and strips its value from every person.
    pub fn delete_custom_field(&mut self, field_id: &str) -> StoreResult<CustomField> {
        let index = self
            .custom_fields
            .iter()
            .position(|field| field.id == field_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::CustomField, field_id))?;
        let removed = self.custom_fields.remove(index);

        let mut stripped = 0;
        for person in &mut self.people {
            if person.custom_fields.remove(field_id).is_some() {
                stripped += 1;
            }
        }

        info!(
            "event=custom_field_delete module=store status=ok field_id={} stripped_values={}",
            field_id, stripped
        );
        self.persist(
            "delete_custom_field",
            &[Collection::CustomFields, Collection::People],
        );
        Ok(removed)
    }

    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom_fields
    }

    pub fn get_custom_field(&self, field_id: &str) -> Option<&CustomField> {
        self.custom_fields.iter().find(|field| field.id == field_id)
    }
}
