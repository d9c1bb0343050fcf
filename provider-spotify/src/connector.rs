//! Spotify Web API connector
//!
//! Implements `CatalogService` for the Spotify Web API v1.

use async_trait::async_trait;
use bridge_traits::catalog::{
    AlbumKind, CatalogService, Page, PlaylistEntry, PlaylistTrack, RemoteAlbum, RemoteArtist,
    RemotePlaylist, RemoteTrack, RemoteUser, TrackDetail, MAX_TRACKS_PER_ADD,
    MAX_TRACK_DETAILS_PER_CALL,
};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::SpotifyError;
use crate::types::{
    ErrorResponse, FollowedArtistsResponse, Paging, PlaylistTrackObject, SimplifiedAlbum,
    SimplifiedPlaylist, SimplifiedTrack, TracksResponse, UserProfile,
};

/// Spotify Web API base URL
const API_BASE: &str = "https://api.spotify.com/v1";

const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Bare IDs are tracks; anything already carrying a scheme (`spotify:episode:...`)
/// is sent as is.
fn playable_uri(id: &str) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("{}{}", TRACK_URI_PREFIX, id)
    }
}

const FOLLOWED_ARTISTS_PAGE_SIZE: u32 = 50;
const ALBUMS_PAGE_SIZE: u32 = 50;
const ALBUM_TRACKS_PAGE_SIZE: u32 = 50;
const PLAYLIST_TRACKS_PAGE_SIZE: u32 = 100;
const USER_PLAYLISTS_PAGE_SIZE: u32 = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Spotify Web API connector
///
/// Every call is a single request; a non-2xx answer becomes an error for
/// the caller to deal with.
///
/// # Pagination
///
/// Offset-paged feeds hand their absolute `next` URL back as the cursor.
/// The followed-artists feed hands back its `after` token instead. Either
/// way the cursor is only meaningful to this connector.
///
/// # Example
///
/// ```ignore
/// use provider_spotify::SpotifyConnector;
/// use bridge_traits::CatalogService;
///
/// let connector = SpotifyConnector::new(http_client, access_token, "US");
/// let page = connector.list_followed_artists(None).await?;
/// ```
pub struct SpotifyConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    market: String,
    api_base: String,
}

impl SpotifyConnector {
    /// Create a connector for `market` (ISO 3166-1 alpha-2).
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        access_token: String,
        market: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            access_token,
            market: market.into(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the connector at another API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Use the continuation URL when present, otherwise build the first page.
    fn page_url(cursor: Option<String>, first_page: impl FnOnce() -> String) -> String {
        cursor.unwrap_or_else(first_page)
    }

    fn error_for(response: &HttpResponse) -> SpotifyError {
        let message = serde_json::from_slice::<ErrorResponse>(&response.body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string());

        if response.status == 401 {
            SpotifyError::AuthenticationFailed(message)
        } else {
            SpotifyError::ApiError {
                status_code: response.status,
                message,
            }
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = request
            .bearer_token(&self.access_token)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            warn!(status = response.status, "Spotify API request failed");
            Err(Self::error_for(&response).into())
        }
    }

    #[instrument(skip(self, url), fields(url = %url))]
    async fn get_json<T: DeserializeOwned>(&self, url: String, what: &str) -> Result<T> {
        let response = self.send(HttpRequest::new(HttpMethod::Get, url)).await?;
        debug!(bytes = response.body.len(), "API request succeeded");

        serde_json::from_slice(&response.body).map_err(|e| {
            SpotifyError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }
}

fn convert_track_detail(track: crate::types::FullTrack) -> Option<TrackDetail> {
    Some(TrackDetail {
        id: track.id?,
        name: track.name,
        popularity: track.popularity,
        duration_ms: track.duration_ms,
        // Absent unless a market was sent; treat as playable.
        is_playable: track.is_playable.unwrap_or(true),
    })
}

fn convert_album(album: SimplifiedAlbum) -> RemoteAlbum {
    let release_date = album.release_timestamp();
    if release_date.is_none() {
        debug!(album_id = %album.id, raw = ?album.release_date, "Unparseable release date");
    }

    RemoteAlbum {
        id: album.id,
        name: album.name,
        album_type: album.album_type,
        album_group: album.album_group,
        release_date,
    }
}

fn convert_playlist_entry(item: PlaylistTrackObject) -> Option<PlaylistEntry> {
    let track = item.track?;
    if track.is_local {
        return None;
    }

    Some(PlaylistEntry {
        added_at: item.added_at,
        track: PlaylistTrack {
            id: track.id?,
            uri: track.uri,
            name: track.name,
            popularity: track.popularity,
        },
    })
}

#[async_trait]
impl CatalogService for SpotifyConnector {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<RemoteUser> {
        let profile: UserProfile = self
            .get_json(format!("{}/me", self.api_base), "user profile")
            .await?;

        Ok(RemoteUser {
            id: profile.id,
            display_name: profile.display_name,
        })
    }

    #[instrument(skip(self))]
    async fn list_followed_artists(&self, cursor: Option<String>) -> Result<Page<RemoteArtist>> {
        let mut url = format!(
            "{}/me/following?type=artist&limit={}",
            self.api_base, FOLLOWED_ARTISTS_PAGE_SIZE
        );
        if let Some(after) = cursor {
            url.push_str(&format!("&after={}", urlencoding::encode(&after)));
        }

        let response: FollowedArtistsResponse = self.get_json(url, "followed artists").await?;
        let next = response.artists.continuation();

        let artists: Vec<RemoteArtist> = response
            .artists
            .items
            .into_iter()
            .map(|a| RemoteArtist {
                id: a.id,
                name: a.name,
            })
            .collect();

        debug!(count = artists.len(), "Listed followed artists");
        Ok(Page::new(artists, next))
    }

    #[instrument(skip(self, kinds))]
    async fn list_artist_albums(
        &self,
        artist_id: &str,
        kinds: &[AlbumKind],
        cursor: Option<String>,
    ) -> Result<Page<RemoteAlbum>> {
        let url = Self::page_url(cursor, || {
            let groups: Vec<&str> = kinds.iter().map(AlbumKind::as_str).collect();
            format!(
                "{}/artists/{}/albums?include_groups={}&limit={}&market={}",
                self.api_base,
                urlencoding::encode(artist_id),
                urlencoding::encode(&groups.join(",")),
                ALBUMS_PAGE_SIZE,
                self.market
            )
        });

        let paging: Paging<SimplifiedAlbum> = self.get_json(url, "artist albums").await?;
        let albums = paging.items.into_iter().map(convert_album).collect();

        Ok(Page::new(albums, paging.next))
    }

    #[instrument(skip(self))]
    async fn list_album_tracks(
        &self,
        album_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<RemoteTrack>> {
        let url = Self::page_url(cursor, || {
            format!(
                "{}/albums/{}/tracks?limit={}&market={}",
                self.api_base,
                urlencoding::encode(album_id),
                ALBUM_TRACKS_PAGE_SIZE,
                self.market
            )
        });

        let paging: Paging<SimplifiedTrack> = self.get_json(url, "album tracks").await?;
        let tracks = paging
            .items
            .into_iter()
            .filter_map(|t| {
                Some(RemoteTrack {
                    id: t.id?,
                    uri: t.uri,
                    name: t.name,
                    duration_ms: t.duration_ms,
                })
            })
            .collect();

        Ok(Page::new(tracks, paging.next))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_track_details(&self, ids: &[String]) -> Result<Vec<TrackDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_TRACK_DETAILS_PER_CALL {
            return Err(SpotifyError::ApiError {
                status_code: 400,
                message: format!(
                    "At most {} ids per track lookup, got {}",
                    MAX_TRACK_DETAILS_PER_CALL,
                    ids.len()
                ),
            }
            .into());
        }

        let url = format!(
            "{}/tracks?ids={}&market={}",
            self.api_base,
            urlencoding::encode(&ids.join(",")),
            self.market
        );

        let response: TracksResponse = self.get_json(url, "track details").await?;
        Ok(response
            .tracks
            .into_iter()
            .flatten()
            .filter_map(convert_track_detail)
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistEntry>> {
        let url = Self::page_url(cursor, || {
            format!(
                "{}/playlists/{}/tracks?limit={}&market={}",
                self.api_base,
                urlencoding::encode(playlist_id),
                PLAYLIST_TRACKS_PAGE_SIZE,
                self.market
            )
        });

        let paging: Paging<PlaylistTrackObject> = self.get_json(url, "playlist tracks").await?;
        let entries = paging
            .items
            .into_iter()
            .filter_map(convert_playlist_entry)
            .collect();

        Ok(Page::new(entries, paging.next))
    }

    #[instrument(skip(self, track_ids), fields(count = track_ids.len()))]
    async fn add_tracks_to_playlist(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        if track_ids.is_empty() {
            return Ok(());
        }
        if track_ids.len() > MAX_TRACKS_PER_ADD {
            return Err(SpotifyError::ApiError {
                status_code: 400,
                message: format!(
                    "At most {} tracks per add, got {}",
                    MAX_TRACKS_PER_ADD,
                    track_ids.len()
                ),
            }
            .into());
        }

        let uris: Vec<String> = track_ids
            .iter()
            .map(|id| playable_uri(id))
            .collect();

        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );
        let request =
            HttpRequest::new(HttpMethod::Post, url).json(&serde_json::json!({ "uris": uris }))?;

        self.send(request).await?;
        info!(playlist_id, added = track_ids.len(), "Added tracks to playlist");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_user_playlists(
        &self,
        user_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<RemotePlaylist>> {
        let url = Self::page_url(cursor, || {
            format!(
                "{}/users/{}/playlists?limit={}",
                self.api_base,
                urlencoding::encode(user_id),
                USER_PLAYLISTS_PAGE_SIZE
            )
        });

        let paging: Paging<SimplifiedPlaylist> = self.get_json(url, "user playlists").await?;
        let playlists = paging
            .items
            .into_iter()
            .map(|p| RemotePlaylist {
                id: p.id,
                name: p.name,
                owner: p.owner.display_name.unwrap_or(p.owner.id),
                track_count: p.tracks.total,
            })
            .collect();

        Ok(Page::new(playlists, paging.next))
    }
}
