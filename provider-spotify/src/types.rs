//! Spotify Web API response types
//!
//! Only the fields the curation engine reads are modelled; everything else
//! in the payloads is ignored.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

/// Offset-based paging object.
///
/// See: https://developer.spotify.com/documentation/web-api/concepts/api-calls
#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    /// Absolute URL of the next page
    #[serde(default)]
    pub next: Option<String>,
}

/// Cursor-based paging object used by `/me/following`.
#[derive(Debug, Deserialize)]
pub struct CursorPaging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

impl<T> CursorPaging<T> {
    /// The `after` cursor, but only while the API says more pages exist.
    pub fn continuation(&self) -> Option<String> {
        self.next.as_ref()?;
        self.cursors.as_ref()?.after.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FollowedArtistsResponse {
    pub artists: CursorPaging<Artist>,
}

#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// Simplified album object from `/artists/{id}/albums`.
#[derive(Debug, Deserialize)]
pub struct SimplifiedAlbum {
    pub id: String,
    pub name: String,
    pub album_type: String,
    /// Relationship to the queried artist
    #[serde(default)]
    pub album_group: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub release_date_precision: Option<String>,
}

impl SimplifiedAlbum {
    pub fn release_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_release_date(
            self.release_date.as_deref()?,
            self.release_date_precision.as_deref().unwrap_or("day"),
        )
    }
}

/// Simplified track object from `/albums/{id}/tracks`.
#[derive(Debug, Deserialize)]
pub struct SimplifiedTrack {
    /// Null for local files
    #[serde(default)]
    pub id: Option<String>,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Full track object from `/tracks` and playlist items.
#[derive(Debug, Deserialize)]
pub struct FullTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub duration_ms: u64,
    /// Present only when a market is supplied
    #[serde(default)]
    pub is_playable: Option<bool>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<Option<FullTrack>>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTrackObject {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<FullTrack>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTracksRef {
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    pub owner: PlaylistOwner,
    pub tracks: PlaylistTracksRef,
}

/// `{"error": {"status": 404, "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

/// Parse a release date at the given precision to midnight UTC.
///
/// `year` dates become January 1st and `month` dates the 1st of the month.
pub fn parse_release_date(date: &str, precision: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    let naive = match precision {
        "year" => NaiveDate::from_ymd_opt(date.parse().ok()?, 1, 1)?,
        "month" => NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d").ok()?,
        _ => NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
    };
    Some(Utc.from_utc_datetime(&naive.and_hms_opt(0, 0, 0)?))
}
