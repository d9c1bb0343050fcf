//! # Playlist Track Scanner
//!
//! Reads each configured source playlist, keeps entries added at or after
//! the playlist watermark, ranks them by popularity and caps them at the
//! playlist's limit before handing them to the listen-later bucket.

use bridge_traits::catalog::{CatalogService, PlaylistEntry};
use chrono::{DateTime, Utc};
use core_runtime::config::{PlaylistLimit, PlaylistSource};
use std::cmp::Reverse;
use tracing::{debug, info, instrument, warn};

use crate::cache::IdentityCache;
use crate::error::{Result, SyncError};
use crate::model::{CurationBuckets, PlaylistRecord, TrackOrigin, TrackRecord};
use crate::pagination::Pager;

/// Parse an entry's "added at" timestamp.
///
/// Fails with [`SyncError::EntryParse`], which callers recover from by
/// skipping the entry.
pub fn parse_added_at(entry: &PlaylistEntry) -> Result<DateTime<Utc>> {
    let raw = entry
        .added_at
        .as_deref()
        .ok_or_else(|| SyncError::EntryParse {
            entry: entry.track.id.clone(),
            reason: "missing added_at".to_string(),
        })?;

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SyncError::EntryParse {
            entry: entry.track.id.clone(),
            reason: format!("invalid added_at '{}': {}", raw, e),
        })
}

/// Stable sort by descending score, then cap at `limit`.
///
/// Equal scores keep their discovery order.
pub fn rank_and_bound<T>(mut items: Vec<T>, score: impl Fn(&T) -> u32, limit: PlaylistLimit) -> Vec<T> {
    items.sort_by_key(|item| Reverse(score(item)));
    if let PlaylistLimit::AtMost(max) = limit {
        items.truncate(max);
    }
    items
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistScanStats {
    pub playlists: usize,
    pub entries_seen: usize,
    pub entries_unparseable: usize,
    pub entries_too_old: usize,
    pub candidates: usize,
    pub emitted: usize,
}

pub struct PlaylistTrackScanner<'a> {
    catalog: &'a dyn CatalogService,
    sources: &'a [PlaylistSource],
    watermark: DateTime<Utc>,
}

impl<'a> PlaylistTrackScanner<'a> {
    pub fn new(
        catalog: &'a dyn CatalogService,
        sources: &'a [PlaylistSource],
        watermark: DateTime<Utc>,
    ) -> Self {
        Self {
            catalog,
            sources,
            watermark,
        }
    }

    /// Scan the configured playlists in order.
    #[instrument(skip_all, fields(playlists = self.sources.len(), watermark = %self.watermark))]
    pub async fn scan(
        &self,
        cache: &mut IdentityCache,
        buckets: &mut CurationBuckets,
    ) -> Result<PlaylistScanStats> {
        let mut stats = PlaylistScanStats::default();

        for (source_index, source) in self.sources.iter().enumerate() {
            stats.playlists += 1;
            self.scan_playlist(cache, buckets, source_index, source, &mut stats)
                .await?;
        }

        info!(
            playlists = stats.playlists,
            candidates = stats.candidates,
            emitted = stats.emitted,
            unparseable = stats.entries_unparseable,
            "Playlist scan finished"
        );
        Ok(stats)
    }

    async fn scan_playlist(
        &self,
        cache: &mut IdentityCache,
        buckets: &mut CurationBuckets,
        source_index: usize,
        source: &PlaylistSource,
        stats: &mut PlaylistScanStats,
    ) -> Result<()> {
        let playlist = cache.playlists.get_or_create(&source.id, || PlaylistRecord {
            external_id: source.id.clone(),
            name: source.name.clone(),
            source_index,
            tracks: Vec::new(),
        });

        let catalog = self.catalog;
        let playlist_id = source.id.as_str();
        let mut entries = Pager::new(format!("tracks of playlist {}", source.id), move |cursor| {
            catalog.list_playlist_tracks(playlist_id, cursor)
        });

        let mut candidates = Vec::new();
        while let Some(page) = entries.next_page().await? {
            for entry in page {
                stats.entries_seen += 1;

                let added_at = match parse_added_at(&entry) {
                    Ok(added_at) => added_at,
                    Err(e) => {
                        warn!(playlist = %source.name, error = %e, "Skipping playlist entry");
                        stats.entries_unparseable += 1;
                        continue;
                    }
                };
                if added_at < self.watermark {
                    stats.entries_too_old += 1;
                    continue;
                }

                let track = entry.track;
                let handle = cache.tracks.get_or_create(&track.id, || TrackRecord {
                    external_id: track.id.clone(),
                    uri: track.uri.clone(),
                    name: track.name.clone(),
                    origin: TrackOrigin::Playlist(playlist),
                    popularity: track.popularity,
                    duration_ms: 0,
                    discovered_at: added_at,
                });
                cache.playlists[playlist].tracks.push(handle);
                candidates.push((handle, added_at));
            }
        }

        let found = candidates.len();
        let ranked = rank_and_bound(
            candidates,
            |(handle, _)| cache.tracks[*handle].popularity,
            source.limit,
        );

        debug!(
            playlist = %source.name,
            found,
            emitted = ranked.len(),
            limit = %source.limit,
            "Ranked playlist candidates"
        );
        stats.candidates += found;
        stats.emitted += ranked.len();
        for (handle, added_at) in ranked {
            buckets.push_playlist_find(handle, playlist, added_at);
        }

        Ok(())
    }
}
