//! Record migrator for persisted people collections.
//!
//! # Responsibility
//! - Upgrade person records written by older schema shapes on load.
//! - Restore referential invariants that persisted data may violate.
//!
//! # Invariants
//! - Migration is idempotent: re-running it on migrated output is a no-op.
//! - A non-empty `album-general` is never overwritten by legacy photos.
//! - Undecodable records are dropped, never propagated as parse errors.

use crate::model::album::{
    default_album_name, default_albums, ensure_reserved_albums, Photo, PhotoAlbum, ALBUM_GENERAL,
};
use crate::model::custom_field::{CustomField, FieldValue};
use crate::model::person::{normalize_tags, Person};
use log::warn;
use serde_json::{Map, Value};

const LEGACY_PHOTO_KEY: &str = "photo";
const LEGACY_PHOTOS_KEY: &str = "photos";
const LEGACY_PHOTO_DETAILS_KEY: &str = "photoDetails";
const ALBUMS_KEY: &str = "photoAlbums";
const RELATIONSHIPS_KEY: &str = "relationships";
/// Keys whose absence decodes to a default; an explicit `null` is dropped.
const DEFAULTED_KEYS: [&str; 5] = [
    "tags",
    "isHidden",
    "customFields",
    RELATIONSHIPS_KEY,
    ALBUMS_KEY,
];

/// Outcome of migrating one persisted people collection.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Records that decoded successfully, in persisted order.
    pub people: Vec<Person>,
    /// Number of records whose persisted shape changed during migration.
    pub upgraded: usize,
    /// Number of records dropped because they could not be decoded.
    pub dropped: usize,
}

/// Migrates a persisted people collection into current-shape records.
///
/// A non-array collection decodes to an empty report with one dropped entry.
pub fn migrate_people(raw: Value, fields: &[CustomField]) -> MigrationReport {
    let Value::Array(records) = raw else {
        warn!("event=migrate_people module=migrate status=error reason=collection_not_array");
        return MigrationReport {
            dropped: 1,
            ..MigrationReport::default()
        };
    };

    let mut report = MigrationReport::default();
    for (index, mut record) in records.into_iter().enumerate() {
        if migrate_person_record(&mut record, fields) {
            report.upgraded += 1;
        }

        match serde_json::from_value::<Person>(record) {
            Ok(mut person) if !person.id.trim().is_empty() => {
                person.relationships.retain(|rel| rel.related_person_id != person.id);
                report.people.push(person);
            }
            Ok(_) => {
                warn!("event=migrate_person module=migrate status=error index={index} reason=empty_id");
                report.dropped += 1;
            }
            Err(err) => {
                warn!(
                    "event=migrate_person module=migrate status=error index={index} reason=decode error={err}"
                );
                report.dropped += 1;
            }
        }
    }

    report
}

/// Upgrades one persisted person record in place.
///
/// Returns `true` when the record changed.
pub fn migrate_person_record(record: &mut Value, fields: &[CustomField]) -> bool {
    let Value::Object(object) = record else {
        return false;
    };

    let before = object.clone();
    for key in DEFAULTED_KEYS {
        if object.get(key).is_some_and(Value::is_null) {
            object.remove(key);
        }
    }
    normalize_tag_values(object);
    normalize_relationship_values(object);
    normalize_custom_field_values(object, fields);
    upgrade_photo_albums(object);
    *object != before
}

fn normalize_tag_values(object: &mut Map<String, Value>) {
    let Some(Value::Array(tags)) = object.get("tags") else {
        return;
    };

    let names = tags.iter().filter_map(|tag| match tag {
        Value::String(name) => Some(name.as_str()),
        Value::Object(reference) => reference.get("name").and_then(Value::as_str),
        _ => None,
    });
    let normalized: Vec<Value> = normalize_tags(names).into_iter().map(Value::String).collect();
    object.insert("tags".to_string(), Value::Array(normalized));
}

fn normalize_relationship_values(object: &mut Map<String, Value>) {
    let Some(Value::Array(links)) = object.get_mut(RELATIONSHIPS_KEY) else {
        return;
    };
    links.retain(|link| {
        link.get("relatedPersonId").is_some_and(Value::is_string)
            && link.get("type").is_some_and(Value::is_string)
    });
}

fn normalize_custom_field_values(object: &mut Map<String, Value>, fields: &[CustomField]) {
    let Some(Value::Object(values)) = object.get("customFields") else {
        if object.contains_key("customFields") {
            object.insert("customFields".to_string(), Value::Object(Map::new()));
        }
        return;
    };

    let mut typed = Map::new();
    for (field_id, raw) in values {
        let Some(field) = fields.iter().find(|field| &field.id == field_id) else {
            continue;
        };
        let value = serde_json::from_value::<FieldValue>(raw.clone())
            .ok()
            .filter(|value| field.validate_value(value).is_ok())
            .or_else(|| field.coerce_raw(raw));
        if let Some(value) = value.and_then(|value| serde_json::to_value(value).ok()) {
            typed.insert(field_id.clone(), value);
        }
    }
    object.insert("customFields".to_string(), Value::Object(typed));
}

fn upgrade_photo_albums(object: &mut Map<String, Value>) {
    let legacy_shape = !matches!(object.get(ALBUMS_KEY), Some(Value::Array(_)));

    let mut albums = match object.get(ALBUMS_KEY) {
        Some(Value::Array(entries)) => {
            let mut albums: Vec<PhotoAlbum> = Vec::new();
            for album in entries.iter().filter_map(salvage_album) {
                if !albums.iter().any(|known| known.id == album.id) {
                    albums.push(album);
                }
            }
            albums
        }
        _ => default_albums(),
    };
    ensure_reserved_albums(&mut albums);

    let mut legacy = Vec::new();
    if legacy_shape {
        if let Some(Value::String(url)) = object.get(LEGACY_PHOTO_KEY) {
            legacy.push(Photo::new(url.clone(), ""));
        }
    }
    for key in [LEGACY_PHOTOS_KEY, LEGACY_PHOTO_DETAILS_KEY] {
        if let Some(Value::Array(entries)) = object.remove(key) {
            legacy.extend(entries.iter().filter_map(legacy_photo));
        }
    }

    let mut seen: Vec<String> = Vec::new();
    legacy.retain(|photo| {
        if photo.url.is_empty() || seen.contains(&photo.url) {
            return false;
        }
        seen.push(photo.url.clone());
        true
    });

    if let Some(general) = albums.iter_mut().find(|album| album.id == ALBUM_GENERAL) {
        if general.photos.is_empty() && !legacy.is_empty() {
            general.photos = legacy;
        }
    }

    if let Ok(value) = serde_json::to_value(&albums) {
        object.insert(ALBUMS_KEY.to_string(), value);
    }
}

/// Decodes one album entry, keeping every readable photo.
///
/// An entry without a string id is unusable; a missing name falls back to
/// the album's default name.
fn salvage_album(entry: &Value) -> Option<PhotoAlbum> {
    let id = entry.get("id")?.as_str()?.trim();
    if id.is_empty() {
        return None;
    }
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default_album_name(id));

    let mut album = PhotoAlbum::new(id, name);
    if let Some(Value::Array(photos)) = entry.get("photos") {
        album.photos = photos.iter().filter_map(legacy_photo).collect();
    }
    Some(album)
}

fn legacy_photo(entry: &Value) -> Option<Photo> {
    match entry {
        Value::String(url) => Some(Photo::new(url.clone(), "")),
        Value::Object(detail) => {
            let url = detail.get("url")?.as_str()?;
            let description = detail
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(Photo::new(url, description))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{migrate_people, migrate_person_record};
    use crate::model::album::{ALBUM_FRIENDS, ALBUM_GENERAL, ALBUM_ME};
    use crate::model::custom_field::{CustomField, CustomFieldDraft, FieldType, FieldValue};
    use serde_json::json;

    fn job_field() -> CustomField {
        CustomField::from_draft("f-job".into(), CustomFieldDraft::new("Job", FieldType::Text))
            .unwrap()
    }

    #[test]
    fn legacy_flat_photos_populate_general_album() {
        let raw = json!([{ "id": "p1", "firstName": "Ann", "photo": "X", "photos": ["X", "Y"] }]);
        let report = migrate_people(raw, &[]);
        assert_eq!(report.upgraded, 1);
        assert_eq!(report.dropped, 0);

        let person = &report.people[0];
        let general = person.album(ALBUM_GENERAL).expect("general album");
        let urls: Vec<&str> = general.photos.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["X", "Y"]);
        assert!(general.photos.iter().all(|p| p.description.is_empty()));
        assert!(person.album(ALBUM_ME).unwrap().photos.is_empty());
        assert!(person.album(ALBUM_FRIENDS).unwrap().photos.is_empty());
        assert_eq!(person.photo.as_deref(), Some("X"));
    }

    #[test]
    fn migration_is_idempotent() {
        let mut record = json!({
            "id": "p1",
            "firstName": "Ann",
            "photo": "X",
            "photos": ["X", "Y"],
            "photoDetails": [{ "url": "Z", "description": "beach" }],
            "tags": [" a", { "id": "t1", "name": "b" }, "a"]
        });
        assert!(migrate_person_record(&mut record, &[]));
        let once = record.clone();
        assert!(!migrate_person_record(&mut record, &[]));
        assert_eq!(record, once);
        assert_eq!(record["tags"], json!(["a", "b"]));
        assert_eq!(record["photoAlbums"][1]["photos"][2]["description"], "beach");
    }

    #[test]
    fn non_empty_general_album_is_never_overwritten() {
        let raw = json!([{
            "id": "p1",
            "firstName": "Ann",
            "photos": ["legacy"],
            "photoAlbums": [
                { "id": "album-general", "name": "General", "photos": [{ "url": "kept", "description": "" }] }
            ]
        }]);
        let report = migrate_people(raw, &[]);
        let person = &report.people[0];
        assert_eq!(person.photo_albums.len(), 3);
        let general = person.album(ALBUM_GENERAL).unwrap();
        assert_eq!(general.photos.len(), 1);
        assert_eq!(general.photos[0].url, "kept");
    }

    #[test]
    fn avatar_is_not_copied_into_existing_album_layout() {
        let raw = json!([{
            "id": "p1",
            "firstName": "Ann",
            "photo": "avatar",
            "photoAlbums": []
        }]);
        let report = migrate_people(raw, &[]);
        assert!(report.people[0].album(ALBUM_GENERAL).unwrap().photos.is_empty());
    }

    #[test]
    fn custom_values_are_typed_and_dangling_entries_dropped() {
        let raw = json!([{
            "id": "p1",
            "firstName": "Ann",
            "customFields": { "f-job": "Engineer", "f-gone": "x" }
        }]);
        let report = migrate_people(raw, &[job_field()]);
        let person = &report.people[0];
        assert_eq!(person.custom_fields.len(), 1);
        assert_eq!(
            person.custom_fields.get("f-job"),
            Some(&FieldValue::Text("Engineer".into()))
        );
    }

    #[test]
    fn broken_album_entries_do_not_discard_readable_albums() {
        let raw = json!([{
            "id": "p1",
            "firstName": "Ann",
            "photoAlbums": [
                { "id": "album-general", "name": "General", "photos": [{ "url": "kept" }] },
                { "id": "trip", "photos": [{ "url": "beach" }, { "description": "no url" }] },
                { "name": "no id" },
                { "id": "album-general", "name": "Duplicate", "photos": [] }
            ]
        }]);
        let report = migrate_people(raw, &[]);
        assert_eq!(report.dropped, 0);

        let person = &report.people[0];
        let general = person.album(ALBUM_GENERAL).unwrap();
        assert_eq!(general.name, "General");
        assert_eq!(general.photos.len(), 1);
        assert_eq!(general.photos[0].url, "kept");

        let trip = person.album("trip").unwrap();
        assert_eq!(trip.name, "Album");
        let urls: Vec<&str> = trip.photos.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["beach"]);

        let ids: Vec<&str> = person.photo_albums.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![ALBUM_ME, ALBUM_GENERAL, ALBUM_FRIENDS, "trip"]);
    }

    #[test]
    fn null_collections_decode_to_defaults() {
        let mut record = json!({
            "id": "p1",
            "firstName": "Ann",
            "tags": null,
            "isHidden": null,
            "customFields": null,
            "relationships": [null, { "relatedPersonId": "p2", "type": "Friend" }],
            "photoAlbums": null
        });
        assert!(migrate_person_record(&mut record, &[]));
        assert!(!migrate_person_record(&mut record.clone(), &[]));

        let report = migrate_people(json!([record]), &[]);
        assert_eq!(report.dropped, 0);
        let person = &report.people[0];
        assert!(person.tags.is_empty());
        assert!(!person.is_hidden);
        assert!(person.custom_fields.is_empty());
        assert_eq!(person.relationships.len(), 1);
        assert_eq!(person.photo_albums.len(), 3);
    }

    #[test]
    fn undecodable_records_are_dropped() {
        let raw = json!([
            { "id": "p1", "firstName": "Ann" },
            { "firstName": "NoId" },
            "garbage",
            { "id": "", "firstName": "Blank" }
        ]);
        let report = migrate_people(raw, &[]);
        assert_eq!(report.people.len(), 1);
        assert_eq!(report.dropped, 3);

        let report = migrate_people(json!({ "not": "a list" }), &[]);
        assert!(report.people.is_empty());
        assert_eq!(report.dropped, 1);
    }
}
