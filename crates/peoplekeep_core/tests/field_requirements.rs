use peoplekeep_core::storage::key_value::key_for;
use peoplekeep_core::{
    Collection, CustomFieldDraft, EntityStore, FieldType, FieldValue, KeyValueAdapter,
    KeyValueStore, MemorySink, MissingField, PersonDraft, RequirementField,
};
use std::sync::Arc;

fn kv_store(shared: &KeyValueStore) -> EntityStore {
    EntityStore::open(
        Box::new(KeyValueAdapter::new(shared.clone())),
        Arc::new(MemorySink::new()),
    )
}

#[test]
fn requirements_are_checked_but_not_enforced() {
    let shared = KeyValueStore::new();
    let mut store = kv_store(&shared);
    let job = store
        .add_custom_field(CustomFieldDraft::new("Job", FieldType::Text).required())
        .unwrap();

    let ann = store.add_person(PersonDraft::new("Ann")).unwrap();
    assert_eq!(
        store.missing_required_fields(&ann.id).unwrap(),
        vec![
            MissingField::Builtin(RequirementField::Email),
            MissingField::Custom(job.id.clone())
        ]
    );

    let bob = store
        .add_person(
            PersonDraft::new("Bob")
                .email("bob@example.com")
                .custom_field(&job.id, FieldValue::Text("Chef".into())),
        )
        .unwrap();
    assert!(store.missing_required_fields(&bob.id).unwrap().is_empty());
    assert!(store.missing_required_fields("ghost").is_err());
}

#[test]
fn requirement_changes_persist_and_reset() {
    let shared = KeyValueStore::new();
    let mut store = kv_store(&shared);
    store.update_field_requirement(RequirementField::Email, false);
    store.update_field_requirement(RequirementField::BirthDate, true);
    drop(store);

    let mut reopened = kv_store(&shared);
    let requirements = reopened.field_requirements();
    assert!(!requirements.email);
    assert!(requirements.birth_date);
    let raw = shared.get(&key_for(Collection::FieldRequirements)).unwrap();
    assert!(raw.contains("\"birthDate\":true"));

    reopened.reset_field_requirements();
    assert!(reopened.field_requirements().email);
    assert!(!reopened.field_requirements().birth_date);
}
