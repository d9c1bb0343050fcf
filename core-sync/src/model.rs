//! Run-scoped records and handles.
//!
//! Records never point at each other directly. Cross references are
//! [`Handle`]s into the [`IdentityCache`](crate::cache::IdentityCache) that
//! owns every record for the duration of one run.

use bridge_traits::catalog::AlbumKind;
use chrono::{DateTime, Utc};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Stable index of a record inside its arena.
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

// Manual impls: deriving would require `T` to implement the same traits.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

pub type TrackHandle = Handle<TrackRecord>;
pub type AlbumHandle = Handle<AlbumRecord>;
pub type ArtistHandle = Handle<ArtistRecord>;
pub type PlaylistHandle = Handle<PlaylistRecord>;

/// How a track was discovered. A track comes from exactly one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrigin {
    /// Found in a followed artist's release
    Release {
        artist: ArtistHandle,
        album: AlbumHandle,
    },
    /// Found in a source playlist
    Playlist(PlaylistHandle),
}

#[derive(Debug, Clone)]
pub struct TrackRecord {
    pub external_id: String,
    pub uri: String,
    pub name: String,
    pub origin: TrackOrigin,
    /// Remote popularity; zero until known
    pub popularity: u32,
    pub duration_ms: u64,
    /// Release date on the artist path, "added at" on the playlist path
    pub discovered_at: DateTime<Utc>,
}

impl TrackRecord {
    pub fn artist(&self) -> Option<ArtistHandle> {
        match self.origin {
            TrackOrigin::Release { artist, .. } => Some(artist),
            TrackOrigin::Playlist(_) => None,
        }
    }

    pub fn album(&self) -> Option<AlbumHandle> {
        match self.origin {
            TrackOrigin::Release { album, .. } => Some(album),
            TrackOrigin::Playlist(_) => None,
        }
    }

    pub fn playlist(&self) -> Option<PlaylistHandle> {
        match self.origin {
            TrackOrigin::Playlist(playlist) => Some(playlist),
            TrackOrigin::Release { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlbumRecord {
    pub external_id: String,
    pub name: String,
    pub kind: AlbumKind,
    pub artist: ArtistHandle,
    pub released_at: DateTime<Utc>,
    pub tracks: Vec<TrackHandle>,
}

#[derive(Debug, Clone)]
pub struct ArtistRecord {
    pub external_id: String,
    pub name: String,
    pub albums: Vec<AlbumHandle>,
}

impl ArtistRecord {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            albums: Vec::new(),
        }
    }

    /// Link an album once, keeping first-seen order.
    pub fn link_album(&mut self, album: AlbumHandle) {
        if !self.albums.contains(&album) {
            self.albums.push(album);
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistRecord {
    pub external_id: String,
    pub name: String,
    /// Position of this playlist in the configured source list
    pub source_index: usize,
    /// Tracks in discovery order
    pub tracks: Vec<TrackHandle>,
}

/// Output buckets filled by classification and ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    ListenLater,
    Sets,
    Compilations,
    Unplayable,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::ListenLater,
        Bucket::Sets,
        Bucket::Compilations,
        Bucket::Unplayable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::ListenLater => "listen_later",
            Bucket::Sets => "sets",
            Bucket::Compilations => "compilations",
            Bucket::Unplayable => "unplayable",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bucket entry, tagged with the scanner that emitted it.
///
/// A track first created by the artist scan can later be emitted again by a
/// playlist; each emission is its own finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finding {
    Release {
        track: TrackHandle,
        bucket: Bucket,
    },
    Playlist {
        track: TrackHandle,
        playlist: PlaylistHandle,
        added_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CurationBuckets {
    listen_later: Vec<TrackHandle>,
    sets: Vec<TrackHandle>,
    compilations: Vec<TrackHandle>,
    unplayable: Vec<TrackHandle>,
    findings: Vec<Finding>,
}

impl CurationBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: Bucket, track: TrackHandle) {
        self.bucket_mut(bucket).push(track);
    }

    pub fn extend(&mut self, bucket: Bucket, tracks: impl IntoIterator<Item = TrackHandle>) {
        self.bucket_mut(bucket).extend(tracks);
    }

    /// Route an artist-scan track and remember it as a release finding.
    pub fn push_release(&mut self, bucket: Bucket, track: TrackHandle) {
        self.push(bucket, track);
        self.findings.push(Finding::Release { track, bucket });
    }

    /// Queue a playlist-scan track for listen-later.
    pub fn push_playlist_find(
        &mut self,
        track: TrackHandle,
        playlist: PlaylistHandle,
        added_at: DateTime<Utc>,
    ) {
        self.push(Bucket::ListenLater, track);
        self.findings.push(Finding::Playlist {
            track,
            playlist,
            added_at,
        });
    }

    /// Every scanner emission, in emission order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn get(&self, bucket: Bucket) -> &[TrackHandle] {
        match bucket {
            Bucket::ListenLater => &self.listen_later,
            Bucket::Sets => &self.sets,
            Bucket::Compilations => &self.compilations,
            Bucket::Unplayable => &self.unplayable,
        }
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        self.get(bucket).len()
    }

    pub fn is_empty(&self) -> bool {
        Bucket::ALL.iter().all(|b| self.get(*b).is_empty())
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<TrackHandle> {
        match bucket {
            Bucket::ListenLater => &mut self.listen_later,
            Bucket::Sets => &mut self.sets,
            Bucket::Compilations => &mut self.compilations,
            Bucket::Unplayable => &mut self.unplayable,
        }
    }
}
