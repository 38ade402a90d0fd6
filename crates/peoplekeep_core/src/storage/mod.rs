//! Persistence adapter contract, backend selection and shared helpers.
//!
//! # Responsibility
//! - Define one load/save contract over named logical collections.
//! - Select a concrete backend at runtime from configuration.
//! - Probe backend capability without failing.
//!
//! # Invariants
//! - Exactly one adapter is active per store.
//! - `load` reports a missing collection as `Ok(None)`, never as an error.
//! - Malformed persisted data is reported as `StorageError::Decode`.

pub mod file_tree;
pub mod key_value;
pub mod remote;

use crate::config::DirectoryConfig;
use crate::db::DbError;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub use file_tree::FileTreeAdapter;
pub use key_value::{KeyValueAdapter, KeyValueStore};
pub use remote::RemoteTableAdapter;

pub type StorageResult<T> = Result<T, StorageError>;

/// Named logical collections persisted by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    People,
    CustomFields,
    FieldRequirements,
    DefaultAlbums,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Self::People,
        Self::CustomFields,
        Self::FieldRequirements,
        Self::DefaultAlbums,
    ];

    /// Stable collection name used for keys, file names and table rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::People => "people",
            Self::CustomFields => "custom_fields",
            Self::FieldRequirements => "field_requirements",
            Self::DefaultAlbums => "default_albums",
        }
    }

    /// Whether the collection is a list of records keyed by `id`.
    pub fn is_record_list(self) -> bool {
        matches!(self, Self::People | Self::CustomFields)
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selectable persistence backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    KeyValue,
    FileTree,
    Remote,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyValue => "key_value",
            Self::FileTree => "file_tree",
            Self::Remote => "remote",
        }
    }

    /// Returns whether this backend can be selected with `config`.
    ///
    /// Never fails; an unusable backend simply reports `false`.
    pub fn probe(self, config: &DirectoryConfig) -> bool {
        match self {
            Self::KeyValue => true,
            Self::FileTree => config
                .data_dir
                .as_deref()
                .is_some_and(FileTreeAdapter::is_supported),
            Self::Remote => config
                .remote_db_path
                .as_deref()
                .is_some_and(RemoteTableAdapter::is_reachable),
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Persisted content already matched.
    Unchanged,
    /// `records` rows/files/keys were written or removed.
    Written { records: usize },
}

/// Where a stored photo url points after backend resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPhoto {
    /// Inline `data:` payload usable as-is.
    Inline(String),
    /// Blob file written by the file-tree backend.
    File(PathBuf),
}

/// Storage-layer errors shared by every backend.
#[derive(Debug)]
pub enum StorageError {
    BackendUnavailable(String),
    Decode {
        collection: Collection,
        message: String,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Db(DbError),
    Encode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BackendUnavailable(reason) => write!(f, "storage backend unavailable: {reason}"),
            Self::Decode {
                collection,
                message,
            } => write!(f, "malformed persisted `{collection}` collection: {message}"),
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode collection: {err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::BackendUnavailable(_) | Self::Decode { .. } => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Uniform load/save contract over named logical collections.
pub trait PersistenceAdapter {
    /// Backend variant implemented by this adapter.
    fn kind(&self) -> BackendKind;

    /// Loads one collection; `Ok(None)` when nothing was persisted yet.
    fn load(&self, collection: Collection) -> StorageResult<Option<Value>>;

    /// Persists the full current value of one collection.
    fn save(&mut self, collection: Collection, value: &Value) -> StorageResult<SaveOutcome>;

    /// Resolves a stored photo url into something displayable.
    fn resolve_photo(&self, url: &str) -> Option<ResolvedPhoto> {
        url.starts_with("data:")
            .then(|| ResolvedPhoto::Inline(url.to_string()))
    }
}

/// Loads and decodes a collection, falling back to `default` on any failure.
///
/// Failures are logged and returned alongside the value so callers can
/// surface them once.
pub fn load_or_default<T: DeserializeOwned>(
    adapter: &dyn PersistenceAdapter,
    collection: Collection,
    default: T,
) -> (T, Option<StorageError>) {
    match adapter.load(collection) {
        Ok(None) => (default, None),
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => (decoded, None),
            Err(err) => {
                warn!(
                    "event=collection_load module=storage status=error collection={} error_code=decode_failed",
                    collection
                );
                let error = StorageError::Decode {
                    collection,
                    message: err.to_string(),
                };
                (default, Some(error))
            }
        },
        Err(err) => {
            warn!(
                "event=collection_load module=storage status=error collection={} backend={} error={}",
                collection,
                adapter.kind().as_str(),
                err
            );
            (default, Some(err))
        }
    }
}

/// Opens the adapter selected by `config.backend`.
///
/// Returns `BackendUnavailable` when the capability probe fails or the
/// backend cannot be opened; the caller decides whether to fall back.
pub fn open_adapter(config: &DirectoryConfig) -> StorageResult<Box<dyn PersistenceAdapter>> {
    if !config.backend.probe(config) {
        return Err(StorageError::BackendUnavailable(format!(
            "backend `{}` is not available in this runtime",
            config.backend.as_str()
        )));
    }

    match config.backend {
        BackendKind::KeyValue => Ok(Box::new(KeyValueAdapter::new(KeyValueStore::new()))),
        BackendKind::FileTree => {
            let root = config.data_dir.as_deref().ok_or_else(|| {
                StorageError::BackendUnavailable("file_tree backend needs data_dir".to_string())
            })?;
            Ok(Box::new(FileTreeAdapter::grant(root)?))
        }
        BackendKind::Remote => {
            let path = config.remote_db_path.as_deref().ok_or_else(|| {
                StorageError::BackendUnavailable("remote backend needs remote_db_path".to_string())
            })?;
            Ok(Box::new(RemoteTableAdapter::connect(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, Collection};
    use crate::config::DirectoryConfig;

    #[test]
    fn collection_names_are_stable() {
        let names: Vec<&str> = Collection::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["people", "custom_fields", "field_requirements", "default_albums"]
        );
        assert!(Collection::People.is_record_list());
        assert!(!Collection::FieldRequirements.is_record_list());
    }

    #[test]
    fn probe_never_fails_for_unconfigured_backends() {
        let config = DirectoryConfig::default();
        assert!(BackendKind::KeyValue.probe(&config));
        assert!(!BackendKind::FileTree.probe(&config));
        assert!(!BackendKind::Remote.probe(&config));
    }
}
