//! Entity store: the authoritative in-memory directory.
//!
//! # Responsibility
//! - Own people, custom field definitions, field requirements and the
//!   relationship graph for one session.
//! - Apply every mutation in memory first, then hand the changed
//!   collection(s) to the active persistence adapter.
//! - Report write outcomes once through the notification sink.
//!
//! # Invariants
//! - Person and custom field ids are unique and never change.
//! - A backend failure never rolls back or blocks an in-memory mutation.
//! - Relationship edges are stored once; `Person::relationships` on any
//!   returned person is a projection of the graph.
//! - Rejected operations leave the store unchanged and write nothing.

pub mod custom_fields;
pub mod gallery;
pub mod people;
pub mod relationships;

use crate::config::DirectoryConfig;
use crate::migrate::migrate_people;
use crate::model::album::default_albums;
use crate::model::custom_field::CustomField;
use crate::model::person::Person;
use crate::model::ValidationError;
use crate::notify::{Notification, NotificationSink};
use crate::settings::{FieldRequirements, MissingField, RequirementField};
use crate::storage::{
    load_or_default, open_adapter, BackendKind, Collection, KeyValueAdapter, KeyValueStore,
    PersistenceAdapter, ResolvedPhoto, SaveOutcome,
};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub use relationships::RelationshipGraph;

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity kinds addressed by store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    CustomField,
    PhotoAlbum,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::CustomField => "custom_field",
            Self::PhotoAlbum => "photo_album",
        }
    }
}

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Target id is not in the store.
    NotFound { entity: EntityKind, id: String },
    /// Reserved album cannot be deleted.
    Protected(String),
    /// Request is structurally invalid (self-relationship, blank names).
    InvalidOperation(String),
    /// Input failed model validation.
    Validation(ValidationError),
}

impl StoreError {
    fn not_found(entity: EntityKind, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{} not found: {id}", entity.as_str()),
            Self::Protected(album_id) => write!(f, "album `{album_id}` is reserved"),
            Self::InvalidOperation(reason) => write!(f, "invalid operation: {reason}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Session-scoped directory store over one persistence adapter.
pub struct EntityStore {
    people: Vec<Person>,
    custom_fields: Vec<CustomField>,
    field_requirements: FieldRequirements,
    relationships: RelationshipGraph,
    adapter: Box<dyn PersistenceAdapter>,
    sink: Arc<dyn NotificationSink>,
}

/// Opens the backend selected by `config` and loads every collection.
///
/// Falls back to a fresh key-value backend when the requested backend is
/// unavailable; the fallback is reported once through `sink`.
pub fn open_store(config: &DirectoryConfig, sink: Arc<dyn NotificationSink>) -> EntityStore {
    let adapter = match open_adapter(config) {
        Ok(adapter) => adapter,
        Err(err) => {
            warn!(
                "event=store_open module=store status=error backend={} fallback={} error={}",
                config.backend.as_str(),
                BackendKind::KeyValue.as_str(),
                err
            );
            sink.notify(Notification::failure("open_store", err.to_string()));
            Box::new(KeyValueAdapter::new(KeyValueStore::new()))
        }
    };

    EntityStore::open(adapter, sink)
}

impl EntityStore {
    /// Creates an empty store without reading the adapter.
    pub fn new(adapter: Box<dyn PersistenceAdapter>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            people: Vec::new(),
            custom_fields: Vec::new(),
            field_requirements: FieldRequirements::default(),
            relationships: RelationshipGraph::default(),
            adapter,
            sink,
        }
    }

    /// Creates a store and loads every collection from `adapter`.
    pub fn open(adapter: Box<dyn PersistenceAdapter>, sink: Arc<dyn NotificationSink>) -> Self {
        let mut store = Self::new(adapter, sink);
        store.load();
        store
    }

    /// Replaces in-memory state with the adapter's persisted collections.
    ///
    /// Custom fields load first so people records can be migrated against
    /// them. Every unreadable collection falls back to its default; all
    /// load failures are reported in a single notification.
    pub fn load(&mut self) {
        let started_at = Instant::now();
        let mut failures = Vec::new();

        let (custom_fields, error) = load_or_default::<Vec<CustomField>>(
            self.adapter.as_ref(),
            Collection::CustomFields,
            Vec::new(),
        );
        failures.extend(error.map(|err| err.to_string()));
        self.custom_fields = dedupe_by_id(custom_fields, |field| field.id.as_str());

        let (requirements, error) = load_or_default(
            self.adapter.as_ref(),
            Collection::FieldRequirements,
            FieldRequirements::default(),
        );
        failures.extend(error.map(|err| err.to_string()));
        self.field_requirements = requirements;

        let mut upgraded = 0;
        let raw_people = match self.adapter.load(Collection::People) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=collection_load module=store status=error collection={} error={}",
                    Collection::People,
                    err
                );
                failures.push(err.to_string());
                None
            }
        };
        self.people.clear();
        self.relationships = RelationshipGraph::default();
        if let Some(raw) = raw_people {
            let report = migrate_people(raw, &self.custom_fields);
            if report.dropped > 0 {
                warn!(
                    "event=people_migrate module=store status=error dropped={}",
                    report.dropped
                );
            }
            upgraded = report.upgraded;
            self.install_people(report.people);
        }

        let seed_default_albums = match self.adapter.load(Collection::DefaultAlbums) {
            Ok(found) => found.is_none(),
            Err(err) => {
                failures.push(err.to_string());
                false
            }
        };

        info!(
            "event=store_load module=store status={} backend={} people={} custom_fields={} edges={} upgraded={} duration_ms={}",
            if failures.is_empty() { "ok" } else { "error" },
            self.adapter.kind().as_str(),
            self.people.len(),
            self.custom_fields.len(),
            self.relationships.len(),
            upgraded,
            started_at.elapsed().as_millis()
        );

        if !failures.is_empty() {
            self.sink
                .notify(Notification::failure("load", failures.join("; ")));
        }

        let mut writes = Vec::new();
        if upgraded > 0 {
            writes.push(Collection::People);
        }
        if seed_default_albums {
            writes.push(Collection::DefaultAlbums);
        }
        if !writes.is_empty() {
            self.persist("load", &writes);
        }
    }

    /// Backend variant currently persisting this store.
    pub fn backend(&self) -> BackendKind {
        self.adapter.kind()
    }

    /// Resolves a stored photo url through the active backend.
    pub fn resolve_photo(&self, url: &str) -> Option<ResolvedPhoto> {
        self.adapter.resolve_photo(url)
    }

    pub fn field_requirements(&self) -> FieldRequirements {
        self.field_requirements
    }

    pub fn update_field_requirement(&mut self, field: RequirementField, required: bool) {
        if self.field_requirements.is_required(field) == required {
            return;
        }
        self.field_requirements.set(field, required);
        self.persist("update_field_requirement", &[Collection::FieldRequirements]);
    }

    pub fn reset_field_requirements(&mut self) {
        if self.field_requirements == FieldRequirements::default() {
            return;
        }
        self.field_requirements = FieldRequirements::default();
        self.persist("reset_field_requirements", &[Collection::FieldRequirements]);
    }

    /// Lists requirements the person with `person_id` does not satisfy.
    pub fn missing_required_fields(&self, person_id: &str) -> StoreResult<Vec<MissingField>> {
        let person = self
            .find_person(person_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Person, person_id))?;
        Ok(self
            .field_requirements
            .missing_fields(person, &self.custom_fields))
    }

    fn install_people(&mut self, people: Vec<Person>) {
        let mut seen = HashSet::new();
        let mut persisted_links = Vec::new();
        for mut person in people {
            if !seen.insert(person.id.clone()) {
                warn!("event=people_load module=store status=skipped reason=duplicate_id");
                continue;
            }
            for link in std::mem::take(&mut person.relationships) {
                persisted_links.push((person.id.clone(), link));
            }
            self.people.push(person);
        }

        // Mirrored records fold into one edge; the first record seen wins.
        for (owner, link) in persisted_links {
            if seen.contains(&link.related_person_id) {
                self.relationships
                    .insert(&owner, &link.related_person_id, &link.kind);
            }
        }
    }

    fn find_person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|person| person.id == person_id)
    }

    fn person_mut(&mut self, person_id: &str) -> StoreResult<&mut Person> {
        self.people
            .iter_mut()
            .find(|person| person.id == person_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Person, person_id))
    }

    fn contains_person(&self, person_id: &str) -> bool {
        self.find_person(person_id).is_some()
    }

    /// Clones `person` with its relationships projected from the graph.
    fn project(&self, person: &Person) -> Person {
        let mut projected = person.clone();
        projected.relationships = self.relationships.for_person(&person.id);
        projected
    }

    fn collection_value(&self, collection: Collection) -> serde_json::Result<Value> {
        match collection {
            Collection::People => {
                let people: Vec<Person> =
                    self.people.iter().map(|person| self.project(person)).collect();
                serde_json::to_value(people)
            }
            Collection::CustomFields => serde_json::to_value(&self.custom_fields),
            Collection::FieldRequirements => serde_json::to_value(self.field_requirements),
            Collection::DefaultAlbums => serde_json::to_value(default_albums()),
        }
    }

    /// Writes `collections` through the adapter and reports the outcome once.
    fn persist(&mut self, operation: &'static str, collections: &[Collection]) {
        let mut failures = Vec::new();
        for &collection in collections {
            let value = match self.collection_value(collection) {
                Ok(value) => value,
                Err(err) => {
                    failures.push(format!("{collection}: {err}"));
                    continue;
                }
            };

            match self.adapter.save(collection, &value) {
                Ok(SaveOutcome::Unchanged) => debug!(
                    "event=collection_save module=store status=skipped operation={} collection={}",
                    operation, collection
                ),
                Ok(SaveOutcome::Written { records }) => debug!(
                    "event=collection_save module=store status=ok operation={} collection={} records={}",
                    operation, collection, records
                ),
                Err(err) => {
                    warn!(
                        "event=collection_save module=store status=error operation={} collection={} backend={} error={}",
                        operation,
                        collection,
                        self.adapter.kind().as_str(),
                        err
                    );
                    failures.push(format!("{collection}: {err}"));
                }
            }
        }

        let notification = if failures.is_empty() {
            Notification::success(operation, "saved")
        } else {
            Notification::failure(operation, failures.join("; "))
        };
        self.sink.notify(notification);
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn dedupe_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

fn require_text(value: &str, what: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidOperation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
