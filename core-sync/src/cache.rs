//! # Identity Cache
//!
//! Deduplicating, index-addressed storage for the four record kinds. Each
//! kind lives in an [`Arena`]: a vector of records plus a map from external
//! ID to position. A record is created at most once per external ID and its
//! handle stays valid until the cache is dropped at the end of the run.
//!
//! Indexing an arena with a handle it did not issue panics, like slice
//! indexing. Use [`Arena::get`] where a handle's origin is uncertain.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::model::{AlbumRecord, ArtistRecord, Handle, PlaylistRecord, TrackRecord};

#[derive(Debug)]
pub struct Arena<T> {
    records: Vec<T>,
    by_external_id: HashMap<String, Handle<T>>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            by_external_id: HashMap::new(),
        }
    }

    /// Return the handle for `external_id`, building the record with
    /// `factory` only if none exists yet.
    pub fn get_or_create(&mut self, external_id: &str, factory: impl FnOnce() -> T) -> Handle<T> {
        if let Some(handle) = self.by_external_id.get(external_id) {
            return *handle;
        }

        let handle = Handle::new(self.records.len());
        self.records.push(factory());
        self.by_external_id.insert(external_id.to_string(), handle);
        handle
    }

    pub fn find(&self, external_id: &str) -> Option<Handle<T>> {
        self.by_external_id.get(external_id).copied()
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.by_external_id.contains_key(external_id)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.records.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.records.get_mut(handle.index())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (Handle::new(index), record))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.records[handle.index()]
    }
}

impl<T> IndexMut<Handle<T>> for Arena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.records[handle.index()]
    }
}

/// Owner of every record created during one run.
///
/// Fields are public so scanners can borrow two arenas at once.
#[derive(Debug, Default)]
pub struct IdentityCache {
    pub tracks: Arena<TrackRecord>,
    pub albums: Arena<AlbumRecord>,
    pub artists: Arena<ArtistRecord>,
    pub playlists: Arena<PlaylistRecord>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }
}
