//! Per-person photo albums.
//!
//! # Invariants
//! - The three reserved albums can be renamed but never removed.
//! - Photo operations address one album only; other albums are untouched.
//! - An out-of-range photo index is a no-op.

use super::{require_text, EntityKind, EntityStore, StoreError, StoreResult};
use crate::model::album::{is_reserved_album, AlbumId, Photo, PhotoAlbum, ALBUM_GENERAL};
use crate::model::person::Person;
use crate::storage::Collection;
use log::info;
use uuid::Uuid;

impl EntityStore {
    /// Appends a new empty album; returns its id.
    pub fn add_photo_album(&mut self, person_id: &str, name: &str) -> StoreResult<AlbumId> {
        let name = require_text(name, "album name")?;
        let album_id = format!("album-{}", Uuid::new_v4().simple());
        self.person_mut(person_id)?
            .photo_albums
            .push(PhotoAlbum::new(album_id.clone(), name));

        info!(
            "event=album_add module=store status=ok person_id={} album_id={}",
            person_id, album_id
        );
        self.persist("add_photo_album", &[Collection::People]);
        Ok(album_id)
    }

    /// Removes a user album together with its photos.
    ///
    /// # Errors
    /// - `Protected` for reserved albums; the store is unchanged.
    pub fn remove_photo_album(&mut self, person_id: &str, album_id: &str) -> StoreResult<PhotoAlbum> {
        if is_reserved_album(album_id) {
            info!(
                "event=album_remove module=store status=skipped person_id={} album_id={} reason=reserved",
                person_id, album_id
            );
            return Err(StoreError::Protected(album_id.to_string()));
        }

        let person = self.person_mut(person_id)?;
        let index = person
            .photo_albums
            .iter()
            .position(|album| album.id == album_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::PhotoAlbum, album_id))?;
        let removed = person.photo_albums.remove(index);

        info!(
            "event=album_remove module=store status=ok person_id={} album_id={}",
            person_id, album_id
        );
        self.persist("remove_photo_album", &[Collection::People]);
        Ok(removed)
    }

    /// Renames any album, reserved ones included.
    pub fn rename_photo_album(
        &mut self,
        person_id: &str,
        album_id: &str,
        new_name: &str,
    ) -> StoreResult<()> {
        let new_name = require_text(new_name, "album name")?;
        let album = album_in(self.person_mut(person_id)?, album_id)?;
        if album.name == new_name {
            return Ok(());
        }
        album.name = new_name;

        self.persist("rename_photo_album", &[Collection::People]);
        Ok(())
    }

    /// Appends a photo to `album_id`, or to the general album when `None`.
    ///
    /// Returns the new photo's index within the album.
    pub fn add_photo_to_gallery(
        &mut self,
        person_id: &str,
        photo_url: &str,
        description: &str,
        album_id: Option<&str>,
    ) -> StoreResult<usize> {
        let photo_url = require_text(photo_url, "photo url")?;
        let album = album_in(
            self.person_mut(person_id)?,
            album_id.unwrap_or(ALBUM_GENERAL),
        )?;
        album.photos.push(Photo::new(photo_url, description.trim()));
        let index = album.photos.len() - 1;

        info!(
            "event=photo_add module=store status=ok person_id={} album_id={} index={}",
            person_id,
            album_id.unwrap_or(ALBUM_GENERAL),
            index
        );
        self.persist("add_photo_to_gallery", &[Collection::People]);
        Ok(index)
    }

    /// Removes the photo at `index`; `Ok(None)` when the index is out of range.
    pub fn remove_photo_from_gallery(
        &mut self,
        person_id: &str,
        index: usize,
        album_id: Option<&str>,
    ) -> StoreResult<Option<Photo>> {
        let album = album_in(
            self.person_mut(person_id)?,
            album_id.unwrap_or(ALBUM_GENERAL),
        )?;
        if index >= album.photos.len() {
            return Ok(None);
        }
        let removed = album.photos.remove(index);

        info!(
            "event=photo_remove module=store status=ok person_id={} album_id={} index={}",
            person_id,
            album_id.unwrap_or(ALBUM_GENERAL),
            index
        );
        self.persist("remove_photo_from_gallery", &[Collection::People]);
        Ok(Some(removed))
    }

    /// Replaces the description of the photo at `index`.
    ///
    /// Returns `Ok(false)` when the index is out of range.
    pub fn update_photo_description(
        &mut self,
        person_id: &str,
        index: usize,
        description: &str,
        album_id: Option<&str>,
    ) -> StoreResult<bool> {
        let album = album_in(
            self.person_mut(person_id)?,
            album_id.unwrap_or(ALBUM_GENERAL),
        )?;
        let Some(photo) = album.photos.get_mut(index) else {
            return Ok(false);
        };
        photo.description = description.trim().to_string();

        self.persist("update_photo_description", &[Collection::People]);
        Ok(true)
    }
}

fn album_in<'a>(person: &'a mut Person, album_id: &str) -> StoreResult<&'a mut PhotoAlbum> {
    person
        .album_mut(album_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::PhotoAlbum, album_id))
}
