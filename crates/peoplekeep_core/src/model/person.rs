//! Person record, creation draft and partial update patch.
//!
//! # Invariants
//! - `id` is assigned once by the store and never changes.
//! - `first_name` is non-empty after trimming.
//! - `tags` are trimmed, non-empty and unique.
//! - `relationships` on a returned `Person` is a read projection; relationship
//!   edges are owned by the store.

use super::album::{ensure_reserved_albums, PhotoAlbum};
use super::custom_field::{CustomFieldId, FieldValue};
use super::relationship::Relationship;
use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque, generator-assigned person identifier.
pub type PersonId = String;

/// Canonical person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, alias = "birthdate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Profile picture, independent from albums.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub custom_fields: BTreeMap<CustomFieldId, FieldValue>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub photo_albums: Vec<PhotoAlbum>,
}

impl Person {
    /// Builds a new person from a draft under a freshly assigned id.
    ///
    /// Reserved albums are seeded when the draft carries no albums and
    /// completed when it carries some.
    pub fn from_draft(id: PersonId, draft: PersonDraft) -> Result<Self, ValidationError> {
        let first_name = draft.first_name.trim().to_string();
        if first_name.is_empty() {
            return Err(ValidationError::EmptyFirstName);
        }

        let mut photo_albums = draft.photo_albums.unwrap_or_default();
        ensure_reserved_albums(&mut photo_albums);

        Ok(Self {
            id,
            first_name,
            last_name: non_blank(draft.last_name),
            nickname: non_blank(draft.nickname),
            email: non_blank(draft.email),
            phone: non_blank(draft.phone),
            address: non_blank(draft.address),
            birth_date: non_blank(draft.birth_date),
            notes: non_blank(draft.notes),
            photo: non_blank(draft.photo),
            tags: normalize_tags(draft.tags),
            is_hidden: false,
            custom_fields: draft.custom_fields,
            relationships: Vec::new(),
            photo_albums,
        })
    }

    /// Applies a partial update in place.
    ///
    /// Scalar fields set to an empty string are cleared. Collection fields
    /// (`tags`, `custom_fields`, `photo_albums`) replace wholesale.
    pub fn apply_patch(&mut self, patch: PersonPatch) -> Result<(), ValidationError> {
        if let Some(first_name) = patch.first_name {
            let first_name = first_name.trim().to_string();
            if first_name.is_empty() {
                return Err(ValidationError::EmptyFirstName);
            }
            self.first_name = first_name;
        }

        merge_optional(&mut self.last_name, patch.last_name);
        merge_optional(&mut self.nickname, patch.nickname);
        merge_optional(&mut self.email, patch.email);
        merge_optional(&mut self.phone, patch.phone);
        merge_optional(&mut self.address, patch.address);
        merge_optional(&mut self.birth_date, patch.birth_date);
        merge_optional(&mut self.notes, patch.notes);
        merge_optional(&mut self.photo, patch.photo);

        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(is_hidden) = patch.is_hidden {
            self.is_hidden = is_hidden;
        }
        if let Some(custom_fields) = patch.custom_fields {
            self.custom_fields = custom_fields;
        }
        if let Some(mut photo_albums) = patch.photo_albums {
            ensure_reserved_albums(&mut photo_albums);
            self.photo_albums = photo_albums;
        }

        Ok(())
    }

    /// `first last`, trimmed.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) => format!("{} {}", self.first_name, last).trim().to_string(),
            None => self.first_name.clone(),
        }
    }

    pub fn album(&self, album_id: &str) -> Option<&PhotoAlbum> {
        self.photo_albums.iter().find(|album| album.id == album_id)
    }

    pub fn album_mut(&mut self, album_id: &str) -> Option<&mut PhotoAlbum> {
        self.photo_albums.iter_mut().find(|album| album.id == album_id)
    }
}

/// Caller input for `add_person`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonDraft {
    pub first_name: String,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<String>,
    pub notes: Option<String>,
    pub photo: Option<String>,
    pub tags: Vec<String>,
    pub custom_fields: BTreeMap<CustomFieldId, FieldValue>,
    /// `None` seeds the three reserved albums.
    pub photo_albums: Option<Vec<PhotoAlbum>>,
}

impl PersonDraft {
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            ..Self::default()
        }
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn custom_field(mut self, field_id: impl Into<CustomFieldId>, value: FieldValue) -> Self {
        self.custom_fields.insert(field_id.into(), value);
        self
    }
}

/// Partial update for `update_person`; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<String>,
    pub notes: Option<String>,
    pub photo: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_hidden: Option<bool>,
    pub custom_fields: Option<BTreeMap<CustomFieldId, FieldValue>>,
    pub photo_albums: Option<Vec<PhotoAlbum>>,
}

/// Trims tags, drops blanks and keeps the first occurrence of duplicates.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !normalized.iter().any(|known| known == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn merge_optional(target: &mut Option<String>, update: Option<String>) {
    if let Some(value) = update {
        *target = non_blank(Some(value));
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, Person, PersonDraft, PersonPatch};
    use crate::model::album::{PhotoAlbum, RESERVED_ALBUM_IDS};
    use crate::model::ValidationError;

    #[test]
    fn from_draft_seeds_reserved_albums_and_defaults() {
        let person = Person::from_draft("p1".into(), PersonDraft::new(" Ann ").email(""))
            .expect("draft should validate");
        assert_eq!(person.first_name, "Ann");
        assert_eq!(person.email, None);
        assert!(!person.is_hidden);
        assert!(person.relationships.is_empty());
        assert!(person.custom_fields.is_empty());
        let ids: Vec<&str> = person.photo_albums.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, RESERVED_ALBUM_IDS);
    }

    #[test]
    fn from_draft_rejects_blank_first_name() {
        let err = Person::from_draft("p1".into(), PersonDraft::new("  ")).unwrap_err();
        assert_eq!(err, ValidationError::EmptyFirstName);
    }

    #[test]
    fn patch_merges_scalars_and_replaces_albums() {
        let mut person = Person::from_draft(
            "p1".into(),
            PersonDraft::new("Ann").last_name("Lee").phone("123"),
        )
        .unwrap();

        person
            .apply_patch(PersonPatch {
                phone: Some(String::new()),
                nickname: Some("Annie".into()),
                photo_albums: Some(vec![PhotoAlbum::new("trip", "Trip")]),
                ..PersonPatch::default()
            })
            .unwrap();

        assert_eq!(person.last_name.as_deref(), Some("Lee"));
        assert_eq!(person.phone, None);
        assert_eq!(person.nickname.as_deref(), Some("Annie"));
        assert_eq!(person.photo_albums.len(), 4);
        assert!(person.album("trip").is_some());
        assert_eq!(person.full_name(), "Ann Lee");
    }

    #[test]
    fn normalize_tags_trims_and_dedupes() {
        assert_eq!(
            normalize_tags([" work", "work", "", "family "]),
            vec!["work".to_string(), "family".to_string()]
        );
    }
}
