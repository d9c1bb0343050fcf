//! Remote Catalog Service Abstraction
//!
//! The operations the curation engine consumes from a streaming catalog:
//! followed artists, artist releases, album tracks, track details, playlist
//! contents and playlist writes.
//!
//! ## Pagination
//!
//! Every listing call returns a [`Page`]. `next` carries an opaque continuation
//! cursor that the same implementation understands on the following call;
//! `next == None` is the explicit "no more pages" terminal signal. Callers
//! loop until they see it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Maximum number of IDs accepted by a single track-detail call.
pub const MAX_TRACK_DETAILS_PER_CALL: usize = 50;

/// Maximum number of tracks accepted by a single add-to-playlist call.
pub const MAX_TRACKS_PER_ADD: usize = 100;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in remote order
    pub items: Vec<T>,
    /// Continuation cursor, `None` when this is the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A page with a continuation cursor.
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    /// The final page of a feed.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Album kind as reported by the catalog.
///
/// The same vocabulary is used for the per-query *group* tag; an album the
/// artist merely appears on is tagged `appears_on` regardless of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumKind {
    Album,
    Single,
    Compilation,
    AppearsOn,
}

impl AlbumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumKind::Album => "album",
            AlbumKind::Single => "single",
            AlbumKind::Compilation => "compilation",
            AlbumKind::AppearsOn => "appears_on",
        }
    }

    /// Map a remote kind string, falling back to [`AlbumKind::Album`] for
    /// anything unrecognized.
    pub fn from_remote(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "single" => AlbumKind::Single,
            "compilation" => AlbumKind::Compilation,
            "appears_on" => AlbumKind::AppearsOn,
            _ => AlbumKind::Album,
        }
    }
}

impl fmt::Display for AlbumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// A followed artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtist {
    pub id: String,
    pub name: String,
}

/// An album entry from an artist's release feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAlbum {
    pub id: String,
    pub name: String,
    /// Raw kind string (`album`, `single`, `compilation`, ...)
    pub album_type: String,
    /// Raw group tag relative to the queried artist, when provided
    pub album_group: Option<String>,
    /// Release timestamp; `None` when the catalog value could not be parsed
    pub release_date: Option<DateTime<Utc>>,
}

/// A track entry from an album's track feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub duration_ms: u64,
}

/// Full track detail, including popularity and playability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDetail {
    pub id: String,
    pub name: String,
    pub popularity: u32,
    pub duration_ms: u64,
    pub is_playable: bool,
}

/// Track payload of a playlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistTrack {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub popularity: u32,
}

/// One entry of a playlist's track feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Raw "added at" timestamp (RFC 3339), unparsed
    pub added_at: Option<String>,
    pub track: PlaylistTrack,
}

/// A playlist visible to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlaylist {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub track_count: u32,
}

/// Remote catalog operations.
///
/// Implementations are expected to issue exactly one remote call per method
/// invocation and never retry.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// The user the access token belongs to.
    async fn current_user(&self) -> Result<RemoteUser>;

    /// Artists the user follows.
    async fn list_followed_artists(&self, cursor: Option<String>) -> Result<Page<RemoteArtist>>;

    /// Albums of `artist_id` restricted to `kinds`.
    async fn list_artist_albums(
        &self,
        artist_id: &str,
        kinds: &[AlbumKind],
        cursor: Option<String>,
    ) -> Result<Page<RemoteAlbum>>;

    /// Tracks of `album_id`.
    async fn list_album_tracks(
        &self,
        album_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<RemoteTrack>>;

    /// Details for up to [`MAX_TRACK_DETAILS_PER_CALL`] track IDs.
    ///
    /// IDs the catalog does not know are omitted from the result.
    async fn get_track_details(&self, ids: &[String]) -> Result<Vec<TrackDetail>>;

    /// Entries of `playlist_id`.
    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistEntry>>;

    /// Append up to [`MAX_TRACKS_PER_ADD`] track IDs to `playlist_id`, in order.
    async fn add_tracks_to_playlist(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Playlists followed or owned by `user_id`.
    async fn list_user_playlists(
        &self,
        user_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<RemotePlaylist>>;
}
