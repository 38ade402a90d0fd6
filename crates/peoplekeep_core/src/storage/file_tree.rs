//! Sandboxed file-tree backend.
//!
//! # Responsibility
//! - Persist one pretty-printed JSON file per logical collection.
//! - Move inline photo payloads into content-addressed blob files.
//!
//! # Invariants
//! - All reads and writes stay under the granted root.
//! - Collection files are replaced atomically (temp file + rename).
//! - Blob names derive from content hashes, so re-saving writes nothing new.
//!
//! Layout:
//! ```text
//! <root>/people/people.json
//! <root>/settings/{custom_fields,field_requirements,default_albums}.json
//! <root>/photos/<sha256-prefix>.<ext>
//! ```

use super::{
    BackendKind, Collection, PersistenceAdapter, ResolvedPhoto, SaveOutcome, StorageError,
    StorageResult,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{info, warn};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const PEOPLE_DIR: &str = "people";
pub const SETTINGS_DIR: &str = "settings";
pub const PHOTOS_DIR: &str = "photos";

const BLOB_NAME_HEX_CHARS: usize = 32;

/// File-tree adapter bound to one granted directory.
#[derive(Debug, Clone)]
pub struct FileTreeAdapter {
    root: PathBuf,
}

impl FileTreeAdapter {
    /// Takes the one-time grant on `root`, creating the fixed subdirectories.
    ///
    /// # Errors
    /// - `BackendUnavailable` when the directory tree cannot be prepared.
    pub fn grant(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [PEOPLE_DIR, SETTINGS_DIR, PHOTOS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|err| {
                StorageError::BackendUnavailable(format!(
                    "cannot prepare `{}`: {err}",
                    path.display()
                ))
            })?;
        }

        info!(
            "event=file_tree_grant module=storage status=ok root={}",
            root.display()
        );
        Ok(Self { root })
    }

    /// Capability probe: whether `root` (or its nearest existing ancestor)
    /// is a writable directory.
    pub fn is_supported(root: &Path) -> bool {
        let mut candidate = Some(root);
        while let Some(path) = candidate {
            match fs::metadata(path) {
                Ok(metadata) => return metadata.is_dir() && !metadata.permissions().readonly(),
                Err(err) if err.kind() == io::ErrorKind::NotFound => candidate = path.parent(),
                Err(_) => return false,
            }
        }
        false
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the JSON file backing `collection`.
    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        let dir = match collection {
            Collection::People => PEOPLE_DIR,
            Collection::CustomFields | Collection::FieldRequirements | Collection::DefaultAlbums => {
                SETTINGS_DIR
            }
        };
        self.root
            .join(dir)
            .join(format!("{}.json", collection.as_str()))
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.root.join(PHOTOS_DIR)
    }

    /// Replaces inline photo payloads in a people collection with blob
    /// references. Returns the number of new blob files written.
    fn externalize_photos(&self, people: &mut Value) -> StorageResult<usize> {
        let mut written = 0;
        let Some(records) = people.as_array_mut() else {
            return Ok(0);
        };

        for record in records {
            if let Some(Value::String(url)) = record.get_mut("photo") {
                written += self.externalize_url(url)?;
            }
            let Some(Value::Array(albums)) = record.get_mut("photoAlbums") else {
                continue;
            };
            for album in albums {
                let Some(Value::Array(photos)) = album.get_mut("photos") else {
                    continue;
                };
                for photo in photos {
                    if let Some(Value::String(url)) = photo.get_mut("url") {
                        written += self.externalize_url(url)?;
                    }
                }
            }
        }

        Ok(written)
    }

    fn externalize_url(&self, url: &mut String) -> StorageResult<usize> {
        if !url.starts_with("data:") {
            return Ok(0);
        }
        let Some((mime, bytes)) = decode_data_url(url) else {
            warn!("event=photo_externalize module=storage status=skipped reason=undecodable_payload");
            return Ok(0);
        };

        let digest = format!("{:x}", Sha256::digest(&bytes));
        let file_name = format!(
            "{}.{}",
            &digest[..BLOB_NAME_HEX_CHARS],
            extension_for_mime(&mime)
        );
        let path = self.photos_dir().join(&file_name);
        let created = if path.is_file() {
            0
        } else {
            write_atomic(&path, &bytes)?;
            1
        };

        *url = format!("{PHOTOS_DIR}/{file_name}");
        Ok(created)
    }
}

impl PersistenceAdapter for FileTreeAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::FileTree
    }

    fn load(&self, collection: Collection) -> StorageResult<Option<Value>> {
        let path = self.collection_path(collection);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| StorageError::Decode {
                collection,
                message: err.to_string(),
            })
    }

    fn save(&mut self, collection: Collection, value: &Value) -> StorageResult<SaveOutcome> {
        let mut value = value.clone();
        let mut records = 0;
        if collection == Collection::People {
            records += self.externalize_photos(&mut value)?;
        }

        let mut encoded = serde_json::to_string_pretty(&value).map_err(StorageError::Encode)?;
        encoded.push('\n');

        let path = self.collection_path(collection);
        let unchanged = fs::read_to_string(&path).is_ok_and(|existing| existing == encoded);
        if !unchanged {
            write_atomic(&path, encoded.as_bytes())?;
            records += 1;
        }

        if records == 0 {
            Ok(SaveOutcome::Unchanged)
        } else {
            Ok(SaveOutcome::Written { records })
        }
    }

    fn resolve_photo(&self, url: &str) -> Option<ResolvedPhoto> {
        if url.starts_with("data:") {
            return Some(ResolvedPhoto::Inline(url.to_string()));
        }

        let name = url.strip_prefix(PHOTOS_DIR)?.strip_prefix('/')?;
        let mut components = Path::new(name).components();
        let is_plain_name = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !is_plain_name {
            return None;
        }

        let path = self.photos_dir().join(name);
        path.is_file().then_some(ResolvedPhoto::File(path))
    }
}

/// Splits a `data:<mime>;base64,<payload>` url into mime type and bytes.
fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let (header, payload) = url.strip_prefix("data:")?.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let io_error = |source: io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .ok_or_else(|| io_error(io::Error::other("path has no parent")))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| io_error(io::Error::other("path has no file name")))?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let temp_path = parent.join(format!(
        ".{}.tmp-{}-{nanos}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    if let Err(source) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(source));
    }
    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{decode_data_url, extension_for_mime};

    #[test]
    fn decode_data_url_extracts_mime_and_bytes() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
        assert_eq!(extension_for_mime(&mime), "png");
    }

    #[test]
    fn decode_data_url_rejects_non_base64_payloads() {
        assert!(decode_data_url("data:text/plain,hello").is_none());
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:image/png;base64,***").is_none());
    }
}
