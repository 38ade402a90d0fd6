use peoplekeep_core::storage::key_value::key_for;
use peoplekeep_core::{
    open_store, BackendKind, Collection, DirectoryConfig, EntityStore, KeyValueAdapter,
    KeyValueStore, MemorySink, PersonDraft, PersonPatch, ResolvedPhoto, ALBUM_FRIENDS,
    ALBUM_GENERAL, ALBUM_ME,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;

const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";
const PNG_BYTES: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

fn kv_store(shared: &KeyValueStore) -> EntityStore {
    EntityStore::open(
        Box::new(KeyValueAdapter::new(shared.clone())),
        Arc::new(MemorySink::new()),
    )
}

#[test]
fn key_value_backend_round_trips_people_and_relationships() {
    let shared = KeyValueStore::new();
    let mut store = kv_store(&shared);
    let ann = store.add_person(PersonDraft::new("Ann")).unwrap();
    let bob = store.add_person(PersonDraft::new("Bob")).unwrap();
    store.add_relationship(&ann.id, &bob.id, "Friend").unwrap();
    drop(store);

    let raw: Value = serde_json::from_str(&shared.get(&key_for(Collection::People)).unwrap()).unwrap();
    let records = raw.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|record| record["relationships"].as_array().unwrap().len() == 1));
    assert!(shared.get(&key_for(Collection::DefaultAlbums)).is_some());

    let reopened = kv_store(&shared);
    assert_eq!(reopened.person_count(), 2);
    let from_bob = reopened.get_person(&bob.id).unwrap().relationships;
    assert_eq!(from_bob.len(), 1);
    assert_eq!(from_bob[0].related_person_id, ann.id);
    assert_eq!(reopened.relationships_of(&ann.id).len(), 1);
}

#[test]
fn legacy_records_are_migrated_on_load_and_written_back() {
    let shared = KeyValueStore::new();
    shared.set(
        key_for(Collection::People),
        json!([
            {
                "id": "p1",
                "firstName": "Ann",
                "photo": "X",
                "photos": ["X", "Y"],
                "tags": [{ "name": "family" }, " family "],
                "relationships": [
                    { "relatedPersonId": "p2", "type": "Family" },
                    { "relatedPersonId": "gone", "type": "Friend" }
                ]
            },
            { "id": "p2", "firstName": "Bob" }
        ])
        .to_string(),
    );

    let store = kv_store(&shared);
    let ann = store.get_person("p1").unwrap();
    let albums: Vec<&str> = ann.photo_albums.iter().map(|album| album.id.as_str()).collect();
    assert_eq!(albums, vec![ALBUM_ME, ALBUM_GENERAL, ALBUM_FRIENDS]);
    let urls: Vec<&str> = ann
        .album(ALBUM_GENERAL)
        .unwrap()
        .photos
        .iter()
        .map(|photo| photo.url.as_str())
        .collect();
    assert_eq!(urls, vec!["X", "Y"]);
    assert_eq!(ann.tags, vec!["family"]);
    assert_eq!(ann.relationships.len(), 1);
    assert_eq!(store.get_person("p2").unwrap().relationships[0].related_person_id, "p1");

    let persisted = shared.get(&key_for(Collection::People)).unwrap();
    assert!(persisted.contains("photoAlbums"));
    assert!(!persisted.contains("\"photos\":[\"X\""));

    drop(store);
    let reloaded = kv_store(&shared);
    assert_eq!(reloaded.get_person("p1").unwrap(), ann);
}

#[test]
fn partially_broken_albums_survive_load_and_write_back() {
    let shared = KeyValueStore::new();
    shared.set(
        key_for(Collection::People),
        json!([{
            "id": "p1",
            "firstName": "Ann",
            "tags": null,
            "isHidden": null,
            "photoAlbums": [
                { "id": "album-general", "name": "General", "photos": [{ "url": "kept" }] },
                { "id": "trip", "photos": [{ "url": "beach" }] }
            ]
        }])
        .to_string(),
    );

    let store = kv_store(&shared);
    let ann = store.get_person("p1").unwrap();
    assert_eq!(ann.album(ALBUM_GENERAL).unwrap().photos[0].url, "kept");
    assert_eq!(ann.album("trip").unwrap().photos[0].url, "beach");
    drop(store);

    let persisted: Value =
        serde_json::from_str(&shared.get(&key_for(Collection::People)).unwrap()).unwrap();
    let general = persisted[0]["photoAlbums"]
        .as_array()
        .unwrap()
        .iter()
        .find(|album| album["id"] == ALBUM_GENERAL)
        .unwrap();
    assert_eq!(general["photos"][0]["url"], "kept");
    assert_eq!(persisted[0]["tags"], json!([]));
}

#[test]
fn file_tree_backend_writes_collections_and_photo_blobs() {
    let dir = tempfile::tempdir().unwrap();
    let config = DirectoryConfig {
        backend: BackendKind::FileTree,
        data_dir: Some(dir.path().to_path_buf()),
        ..DirectoryConfig::default()
    };

    let mut store = open_store(&config, Arc::new(MemorySink::new()));
    assert_eq!(store.backend(), BackendKind::FileTree);
    let ann = store.add_person(PersonDraft::new("Ann")).unwrap();
    store
        .add_photo_to_gallery(&ann.id, PNG_DATA_URL, "dot", None)
        .unwrap();
    store
        .add_photo_to_gallery(&ann.id, PNG_DATA_URL, "same dot", Some(ALBUM_ME))
        .unwrap();

    let people_json = fs::read_to_string(dir.path().join("people").join("people.json")).unwrap();
    assert!(!people_json.contains("data:image"));
    assert!(dir
        .path()
        .join("settings")
        .join("default_albums.json")
        .is_file());
    let blobs = fs::read_dir(dir.path().join("photos")).unwrap().count();
    assert_eq!(blobs, 1);
    assert!(matches!(
        store.resolve_photo(PNG_DATA_URL),
        Some(ResolvedPhoto::Inline(_))
    ));
    drop(store);

    let reopened = open_store(&config, Arc::new(MemorySink::new()));
    let person = reopened.get_person(&ann.id).unwrap();
    let photo = &person.album(ALBUM_GENERAL).unwrap().photos[0];
    assert!(photo.url.starts_with("photos/"));
    assert!(photo.url.ends_with(".png"));
    assert_eq!(photo.description, "dot");
    match reopened.resolve_photo(&photo.url) {
        Some(ResolvedPhoto::File(path)) => assert_eq!(fs::read(path).unwrap(), PNG_BYTES),
        other => panic!("unexpected resolution: {other:?}"),
    }
    assert_eq!(reopened.resolve_photo("photos/../people/people.json"), None);
}

#[test]
fn remote_backend_writes_one_row_per_person() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("directory.db");
    let config = DirectoryConfig {
        backend: BackendKind::Remote,
        remote_db_path: Some(db_path.clone()),
        ..DirectoryConfig::default()
    };

    let mut store = open_store(&config, Arc::new(MemorySink::new()));
    assert_eq!(store.backend(), BackendKind::Remote);
    let ann = store.add_person(PersonDraft::new("Ann")).unwrap();
    let bob = store.add_person(PersonDraft::new("Bob")).unwrap();
    assert_eq!(count_rows(&db_path, "people"), 2);

    store
        .update_person(
            &ann.id,
            PersonPatch {
                last_name: Some("Lee".into()),
                ..PersonPatch::default()
            },
        )
        .unwrap();
    store.delete_person(&bob.id).unwrap();
    assert_eq!(count_rows(&db_path, "people"), 1);

    let conn = Connection::open(&db_path).unwrap();
    let data: String = conn
        .query_row("SELECT data FROM people WHERE id = ?1;", [&ann.id], |row| {
            row.get(0)
        })
        .unwrap();
    assert!(data.contains("\"lastName\":\"Lee\""));
    drop(conn);
    drop(store);

    let reopened = open_store(&config, Arc::new(MemorySink::new()));
    assert_eq!(reopened.person_count(), 1);
    assert_eq!(
        reopened.get_person(&ann.id).unwrap().last_name.as_deref(),
        Some("Lee")
    );
}

#[test]
fn unavailable_backends_fall_back_to_key_value() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"file").unwrap();

    let configs = [
        DirectoryConfig {
            backend: BackendKind::FileTree,
            data_dir: Some(blocker.join("data")),
            ..DirectoryConfig::default()
        },
        DirectoryConfig {
            backend: BackendKind::Remote,
            remote_db_path: Some(dir.path().join("missing").join("directory.db")),
            ..DirectoryConfig::default()
        },
    ];

    for config in configs {
        let sink = MemorySink::new();
        let mut store = open_store(&config, Arc::new(sink.clone()));
        assert_eq!(store.backend(), BackendKind::KeyValue);

        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].operation, "open_store");

        store.add_person(PersonDraft::new("Ann")).unwrap();
        assert_eq!(store.person_count(), 1);
        assert_eq!(sink.failures().len(), 1);
    }
}

fn count_rows(path: &std::path::Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
