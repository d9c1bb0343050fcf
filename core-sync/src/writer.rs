//! # Playlist Batch Writer
//!
//! Appends an ordered list of tracks to a destination playlist in chunks no
//! larger than the catalog's per-call limit.
//!
//! Writes are not atomic across chunks. If chunk `k` fails, chunks before it
//! stay applied and the run aborts without advancing watermarks, so the next
//! run may add those tracks again.

use bridge_traits::catalog::{CatalogService, MAX_TRACKS_PER_ADD};
use tracing::{debug, info, instrument};

use crate::cache::IdentityCache;
use crate::error::{Result, SyncError};
use crate::model::TrackHandle;

pub const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Remote ID for a track URI; URIs without the track scheme pass through.
pub fn track_id_from_uri(uri: &str) -> &str {
    uri.strip_prefix(TRACK_URI_PREFIX).unwrap_or(uri)
}

pub struct PlaylistBatchWriter<'a> {
    catalog: &'a dyn CatalogService,
    chunk_size: usize,
}

impl<'a> PlaylistBatchWriter<'a> {
    pub fn new(catalog: &'a dyn CatalogService) -> Self {
        Self {
            catalog,
            chunk_size: MAX_TRACKS_PER_ADD,
        }
    }

    /// Use smaller chunks; values are clamped to `1..=MAX_TRACKS_PER_ADD`.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_TRACKS_PER_ADD);
        self
    }

    /// Append `tracks` to `playlist_id` in order.
    ///
    /// Returns the number of add calls issued. An empty list issues none.
    #[instrument(skip(self, cache, tracks), fields(tracks = tracks.len()))]
    pub async fn write(
        &self,
        cache: &IdentityCache,
        playlist_id: &str,
        tracks: &[TrackHandle],
    ) -> Result<usize> {
        if tracks.is_empty() {
            debug!("Nothing to write");
            return Ok(0);
        }

        let mut calls = 0;
        for chunk in tracks.chunks(self.chunk_size) {
            let ids: Vec<String> = chunk
                .iter()
                .map(|handle| track_id_from_uri(&cache.tracks[*handle].uri).to_string())
                .collect();

            self.catalog
                .add_tracks_to_playlist(playlist_id, &ids)
                .await
                .map_err(|source| SyncError::RemoteWrite {
                    playlist_id: playlist_id.to_string(),
                    source,
                })?;
            calls += 1;
            debug!(chunk = calls, size = ids.len(), "Chunk written");
        }

        info!(playlist_id, tracks = tracks.len(), calls, "Playlist updated");
        Ok(calls)
    }
}
