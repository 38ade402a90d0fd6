//! Photo album model and reserved album helpers.
//!
//! # Invariants
//! - `album-me`, `album-general` and `album-friends` exist on every person.
//! - Reserved albums can be renamed but never removed.

use serde::{Deserialize, Serialize};

pub type AlbumId = String;

pub const ALBUM_ME: &str = "album-me";
pub const ALBUM_GENERAL: &str = "album-general";
pub const ALBUM_FRIENDS: &str = "album-friends";

/// Reserved album ids in canonical order.
pub const RESERVED_ALBUM_IDS: [&str; 3] = [ALBUM_ME, ALBUM_GENERAL, ALBUM_FRIENDS];

/// One photo inside an album.
///
/// `url` is either an inline `data:` payload or a backend-relative file
/// reference such as `photos/<name>.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl Photo {
    pub fn new(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
        }
    }
}

/// Named, ordered photo collection owned by one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAlbum {
    pub id: AlbumId,
    pub name: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl PhotoAlbum {
    pub fn new(id: impl Into<AlbumId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            photos: Vec::new(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved_album(&self.id)
    }
}

/// Returns whether `album_id` names one of the three reserved albums.
pub fn is_reserved_album(album_id: &str) -> bool {
    RESERVED_ALBUM_IDS.contains(&album_id)
}

/// Returns fresh, empty reserved albums.
pub fn default_albums() -> Vec<PhotoAlbum> {
    RESERVED_ALBUM_IDS
        .iter()
        .map(|id| PhotoAlbum::new(*id, default_album_name(id)))
        .collect()
}

/// Inserts any missing reserved album, keeping existing albums untouched.
///
/// Missing reserved albums are placed ahead of user albums in canonical
/// order. Returns the number of albums inserted.
pub fn ensure_reserved_albums(albums: &mut Vec<PhotoAlbum>) -> usize {
    let mut inserted = 0;
    for (slot, id) in RESERVED_ALBUM_IDS.iter().enumerate() {
        if albums.iter().any(|album| album.id == *id) {
            continue;
        }
        let position = slot.min(albums.len());
        albums.insert(position, PhotoAlbum::new(*id, default_album_name(id)));
        inserted += 1;
    }
    inserted
}

/// Display name a reserved album starts with; `Album` for any other id.
pub fn default_album_name(album_id: &str) -> &'static str {
    match album_id {
        ALBUM_ME => "Me",
        ALBUM_GENERAL => "General",
        ALBUM_FRIENDS => "Friends",
        _ => "Album",
    }
}
