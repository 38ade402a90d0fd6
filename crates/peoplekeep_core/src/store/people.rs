//! Person operations and read projections.

use super::{new_id, EntityKind, EntityStore, StoreError, StoreResult};
use crate::model::custom_field::{CustomFieldId, FieldValue};
use crate::model::person::{Person, PersonDraft, PersonPatch};
use crate::model::ValidationError;
use crate::storage::Collection;
use crate::visibility::{visible, ViewerSession};
use log::info;
use std::collections::BTreeMap;

impl EntityStore {
    /// Creates a person under a fresh id.
    ///
    /// # Errors
    /// - `Validation` for a blank first name or custom values that do not
    ///   match their field definitions.
    pub fn add_person(&mut self, draft: PersonDraft) -> StoreResult<Person> {
        self.validate_custom_values(&draft.custom_fields)?;
        let person = Person::from_draft(new_id(), draft)?;

        info!(
            "event=person_add module=store status=ok person_id={}",
            person.id
        );
        self.people.push(person.clone());
        self.persist("add_person", &[Collection::People]);
        Ok(person)
    }

    /// Merges `patch` into the person with `person_id`.
    pub fn update_person(&mut self, person_id: &str, patch: PersonPatch) -> StoreResult<Person> {
        if let Some(values) = &patch.custom_fields {
            self.validate_custom_values(values)?;
        }
        self.person_mut(person_id)?.apply_patch(patch)?;

        info!(
            "event=person_update module=store status=ok person_id={}",
            person_id
        );
        self.persist("update_person", &[Collection::People]);
        self.get_person(person_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Person, person_id))
    }

    /// Removes a person and every relationship that targets them.
    pub fn delete_person(&mut self, person_id: &str) -> StoreResult<Person> {
        let index = self
            .people
            .iter()
            .position(|person| person.id == person_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Person, person_id))?;

        let removed = self.project(&self.people[index]);
        self.people.remove(index);
        let dropped_edges = self.relationships.remove_person(person_id);

        info!(
            "event=person_delete module=store status=ok person_id={} dropped_relationships={}",
            person_id, dropped_edges
        );
        self.persist("delete_person", &[Collection::People]);
        Ok(removed)
    }

    /// Id lookup; bypasses visibility.
    pub fn get_person(&self, person_id: &str) -> Option<Person> {
        self.find_person(person_id).map(|person| self.project(person))
    }

    /// People visible to `viewer`, in insertion order.
    pub fn people(&self, viewer: &dyn ViewerSession) -> Vec<Person> {
        visible(&self.people, viewer.is_privileged())
            .into_iter()
            .map(|person| self.project(person))
            .collect()
    }

    /// Every person including hidden ones.
    pub fn all_people(&self) -> Vec<Person> {
        self.people.iter().map(|person| self.project(person)).collect()
    }

    /// Case-insensitive substring search over the people visible to `viewer`.
    ///
    /// Matches full name, nickname, email, phone and the space-joined tags.
    /// A blank query returns every visible person.
    pub fn search_people(&self, viewer: &dyn ViewerSession, query: &str) -> Vec<Person> {
        let needle = query.trim().to_lowercase();
        visible(&self.people, viewer.is_privileged())
            .into_iter()
            .filter(|person| needle.is_empty() || matches_query(person, &needle))
            .map(|person| self.project(person))
            .collect()
    }

    /// Flips `isHidden`; returns the new value.
    pub fn toggle_person_visibility(&mut self, person_id: &str) -> StoreResult<bool> {
        let person = self.person_mut(person_id)?;
        person.is_hidden = !person.is_hidden;
        let is_hidden = person.is_hidden;

        info!(
            "event=person_visibility module=store status=ok person_id={} is_hidden={}",
            person_id, is_hidden
        );
        self.persist("toggle_person_visibility", &[Collection::People]);
        Ok(is_hidden)
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    fn validate_custom_values(
        &self,
        values: &BTreeMap<CustomFieldId, FieldValue>,
    ) -> Result<(), ValidationError> {
        for (field_id, value) in values {
            let field = self
                .custom_fields
                .iter()
                .find(|field| &field.id == field_id)
                .ok_or_else(|| ValidationError::UnknownCustomField(field_id.clone()))?;
            field.validate_value(value)?;
        }
        Ok(())
    }
}

fn matches_query(person: &Person, needle: &str) -> bool {
    let tags = person.tags.join(" ");
    [
        Some(person.full_name()),
        person.nickname.clone(),
        person.email.clone(),
        person.phone.clone(),
        Some(tags),
    ]
    .into_iter()
    .flatten()
    .any(|haystack| haystack.to_lowercase().contains(needle))
}
