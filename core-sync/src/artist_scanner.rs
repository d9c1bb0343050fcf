//! # Artist Release Scanner
//!
//! Walks followed artists, their releases and each release's tracks, keeping
//! tracks released inside the recency window, then asks the catalog for
//! popularity and playability in batches and routes each candidate to a
//! bucket.
//!
//! ## Filters, in order
//!
//! 1. Albums tagged `appears_on` for the queried artist are skipped.
//! 2. Albums released at or before the watermark, or at or after "now", are
//!    skipped.
//! 3. Tracks at or below the minimum duration are skipped.
//! 4. Tracks already in the cache are skipped.

use bridge_traits::catalog::{AlbumKind, CatalogService, RemoteAlbum, RemoteArtist};
use chrono::{DateTime, Utc};
use core_runtime::config::ScanSettings;
use tracing::{debug, info, instrument, warn};

use crate::cache::IdentityCache;
use crate::error::{Result, SyncError};
use crate::model::{
    AlbumHandle, AlbumRecord, ArtistHandle, ArtistRecord, Bucket, CurationBuckets, TrackHandle,
    TrackOrigin, TrackRecord,
};
use crate::pagination::Pager;

const APPEARS_ON_GROUP: &str = "appears_on";

/// Exclusive recency window `(watermark, now)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseWindow {
    pub watermark: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl ReleaseWindow {
    pub fn new(watermark: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self { watermark, now }
    }

    pub fn contains(&self, released_at: DateTime<Utc>) -> bool {
        self.watermark < released_at && released_at < self.now
    }
}

/// Route a detailed track to its bucket.
pub fn classify(
    is_playable: bool,
    duration_ms: u64,
    album_kind: AlbumKind,
    settings: &ScanSettings,
) -> Bucket {
    if !is_playable {
        Bucket::Unplayable
    } else if duration_ms >= settings.set_duration_ms {
        Bucket::Sets
    } else if settings.route_compilations && album_kind == AlbumKind::Compilation {
        Bucket::Compilations
    } else {
        Bucket::ListenLater
    }
}

/// Counters for one artist scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtistScanStats {
    pub artists: usize,
    pub albums_accepted: usize,
    pub albums_appears_on: usize,
    pub albums_out_of_window: usize,
    pub albums_undated: usize,
    pub tracks_too_short: usize,
    pub tracks_already_seen: usize,
    pub candidates: usize,
    pub detail_calls: usize,
    pub unplayable: usize,
}

pub struct ArtistReleaseScanner<'a> {
    catalog: &'a dyn CatalogService,
    settings: &'a ScanSettings,
    window: ReleaseWindow,
}

impl<'a> ArtistReleaseScanner<'a> {
    pub fn new(
        catalog: &'a dyn CatalogService,
        settings: &'a ScanSettings,
        window: ReleaseWindow,
    ) -> Self {
        Self {
            catalog,
            settings,
            window,
        }
    }

    /// Scan every followed artist into `cache` and route candidates into
    /// `buckets`.
    ///
    /// Any failed fetch aborts the scan; nothing is retried.
    #[instrument(skip_all, fields(watermark = %self.window.watermark, now = %self.window.now))]
    pub async fn scan(
        &self,
        cache: &mut IdentityCache,
        buckets: &mut CurationBuckets,
    ) -> Result<ArtistScanStats> {
        let catalog = self.catalog;
        let mut stats = ArtistScanStats::default();
        let mut followed = Pager::new("followed artists", move |cursor| {
            catalog.list_followed_artists(cursor)
        });

        while let Some(artists) = followed.next_page().await? {
            for artist in artists {
                stats.artists += 1;
                self.scan_artist(cache, buckets, artist, &mut stats).await?;
            }
        }

        info!(
            artists = stats.artists,
            albums = stats.albums_accepted,
            candidates = stats.candidates,
            unplayable = stats.unplayable,
            "Artist scan finished"
        );
        Ok(stats)
    }

    async fn scan_artist(
        &self,
        cache: &mut IdentityCache,
        buckets: &mut CurationBuckets,
        artist: RemoteArtist,
        stats: &mut ArtistScanStats,
    ) -> Result<()> {
        let artist_handle = cache.artists.get_or_create(&artist.id, || {
            ArtistRecord::new(artist.id.clone(), artist.name.clone())
        });

        let catalog = self.catalog;
        let artist_id = artist.id.as_str();
        let kinds = self.settings.included_album_kinds.as_slice();
        let mut releases = Pager::new(format!("albums of artist {}", artist.id), move |cursor| {
            catalog.list_artist_albums(artist_id, kinds, cursor)
        });

        let mut candidates = Vec::new();
        while let Some(albums) = releases.next_page().await? {
            for album in albums {
                let Some(released_at) = self.accept_album(&album, stats) else {
                    continue;
                };

                let album_handle = cache.albums.get_or_create(&album.id, || AlbumRecord {
                    external_id: album.id.clone(),
                    name: album.name.clone(),
                    kind: AlbumKind::from_remote(&album.album_type),
                    artist: artist_handle,
                    released_at,
                    tracks: Vec::new(),
                });
                cache.artists[artist_handle].link_album(album_handle);
                stats.albums_accepted += 1;

                self.collect_album_tracks(
                    cache,
                    artist_handle,
                    album_handle,
                    &album.id,
                    &mut candidates,
                    stats,
                )
                .await?;
            }
        }

        debug!(
            artist = %artist.name,
            candidates = candidates.len(),
            "Collected artist candidates"
        );
        stats.candidates += candidates.len();

        self.resolve_playability(cache, buckets, &candidates, stats)
            .await
    }

    /// Release date of an album that passes the group and window filters.
    fn accept_album(&self, album: &RemoteAlbum, stats: &mut ArtistScanStats) -> Option<DateTime<Utc>> {
        if album.album_group.as_deref() == Some(APPEARS_ON_GROUP) {
            stats.albums_appears_on += 1;
            return None;
        }

        let Some(released_at) = album.release_date else {
            warn!(album_id = %album.id, album = %album.name, "Album has no usable release date, skipping");
            stats.albums_undated += 1;
            return None;
        };

        if !self.window.contains(released_at) {
            stats.albums_out_of_window += 1;
            return None;
        }

        Some(released_at)
    }

    async fn collect_album_tracks(
        &self,
        cache: &mut IdentityCache,
        artist: ArtistHandle,
        album: AlbumHandle,
        album_id: &str,
        candidates: &mut Vec<TrackHandle>,
        stats: &mut ArtistScanStats,
    ) -> Result<()> {
        let catalog = self.catalog;
        let released_at = cache.albums[album].released_at;
        let mut tracks = Pager::new(format!("tracks of album {}", album_id), move |cursor| {
            catalog.list_album_tracks(album_id, cursor)
        });

        while let Some(page) = tracks.next_page().await? {
            for track in page {
                if track.duration_ms <= self.settings.min_track_duration_ms {
                    stats.tracks_too_short += 1;
                    continue;
                }
                if cache.tracks.contains(&track.id) {
                    stats.tracks_already_seen += 1;
                    continue;
                }

                let handle = cache.tracks.get_or_create(&track.id, || TrackRecord {
                    external_id: track.id.clone(),
                    uri: track.uri.clone(),
                    name: track.name.clone(),
                    origin: TrackOrigin::Release { artist, album },
                    popularity: 0,
                    duration_ms: track.duration_ms,
                    discovered_at: released_at,
                });
                cache.albums[album].tracks.push(handle);
                candidates.push(handle);
            }
        }

        Ok(())
    }

    async fn resolve_playability(
        &self,
        cache: &mut IdentityCache,
        buckets: &mut CurationBuckets,
        candidates: &[TrackHandle],
        stats: &mut ArtistScanStats,
    ) -> Result<()> {
        for chunk in candidates.chunks(self.settings.detail_chunk_size.max(1)) {
            let ids: Vec<String> = chunk
                .iter()
                .map(|handle| cache.tracks[*handle].external_id.clone())
                .collect();

            let details = self
                .catalog
                .get_track_details(&ids)
                .await
                .map_err(|source| SyncError::TrackDetails { source })?;
            stats.detail_calls += 1;

            for detail in details {
                let Some(handle) = cache.tracks.find(&detail.id).filter(|h| chunk.contains(h))
                else {
                    debug!(track_id = %detail.id, "Detail for a track that was not requested");
                    continue;
                };

                let album_kind = cache.tracks[handle]
                    .album()
                    .map(|album| cache.albums[album].kind)
                    .unwrap_or(AlbumKind::Album);

                let track = &mut cache.tracks[handle];
                track.popularity = detail.popularity;

                let bucket = classify(
                    detail.is_playable,
                    detail.duration_ms,
                    album_kind,
                    self.settings,
                );
                if bucket == Bucket::Unplayable {
                    stats.unplayable += 1;
                    debug!(track = %track.name, "Track is not playable in this market");
                }
                buckets.push_release(bucket, handle);
            }
        }

        Ok(())
    }
}
