//! Core domain logic for the PeopleKeep contact directory.
//! This crate is the single source of truth for directory invariants.

pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod notify;
pub mod settings;
pub mod storage;
pub mod store;
pub mod visibility;

pub use config::{ConfigError, DirectoryConfig};
pub use export::ExportBundle;
pub use logging::{default_log_level, init_logging, logging_status};
pub use migrate::{migrate_people, migrate_person_record, MigrationReport};
pub use model::album::{
    Photo, PhotoAlbum, ALBUM_FRIENDS, ALBUM_GENERAL, ALBUM_ME, RESERVED_ALBUM_IDS,
};
pub use model::custom_field::{CustomField, CustomFieldDraft, FieldType, FieldValue};
pub use model::person::{Person, PersonDraft, PersonId, PersonPatch};
pub use model::relationship::{Relationship, DEFAULT_RELATIONSHIP_TYPES};
pub use model::ValidationError;
pub use notify::{LogSink, MemorySink, Notification, NotificationSink, Outcome};
pub use settings::{FieldRequirements, MissingField, RequirementField};
pub use storage::{
    open_adapter, BackendKind, Collection, FileTreeAdapter, KeyValueAdapter, KeyValueStore,
    PersistenceAdapter, RemoteTableAdapter, ResolvedPhoto, SaveOutcome, StorageError,
    StorageResult,
};
pub use store::{open_store, EntityKind, EntityStore, StoreError, StoreResult};
pub use visibility::{Viewer, ViewerSession};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
