//! Integration tests for curation runs
//!
//! These tests drive the scanners and the coordinator against an in-memory
//! catalog and verify:
//! - Deduplication and idempotent rescans
//! - Release window edges and track filters
//! - Playlist ranking, bounding and entry skipping
//! - Chunked playlist writes
//! - Watermark advance, partial advance and abort behavior
//! - Run report output

use async_trait::async_trait;
use bridge_traits::catalog::{
    AlbumKind, CatalogService, Page, PlaylistEntry, PlaylistTrack, RemoteAlbum, RemoteArtist,
    RemotePlaylist, RemoteTrack, RemoteUser, TrackDetail,
};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::time::FixedClock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_runtime::config::{AppConfig, PlaylistLimit, PlaylistSource, ScanSettings};
use core_sync::{
    ArtistReleaseScanner, Bucket, CurationBuckets, IdentityCache, PlaylistTrackScanner,
    ReleaseWindow, RunOptions, RunPhase, SyncCoordinator, SyncError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ============================================================================
// In-memory catalog
// ============================================================================

const PAGE_SIZE: usize = 2;

fn paginate<T: Clone>(items: &[T], cursor: Option<String>) -> Page<T> {
    let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let end = (start + PAGE_SIZE).min(items.len());
    let page = items.get(start..end).unwrap_or_default().to_vec();
    let next = (end < items.len()).then(|| end.to_string());
    Page::new(page, next)
}

#[derive(Default)]
struct FakeCatalog {
    artists: Vec<RemoteArtist>,
    albums: HashMap<String, Vec<RemoteAlbum>>,
    album_tracks: HashMap<String, Vec<RemoteTrack>>,
    details: HashMap<String, TrackDetail>,
    playlist_entries: HashMap<String, Vec<PlaylistEntry>>,
    user_playlists: Vec<RemotePlaylist>,
    failing_destination: Option<String>,
    detail_calls: Mutex<Vec<usize>>,
    adds: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeCatalog {
    fn follow(&mut self, id: &str, name: &str) {
        self.artists.push(RemoteArtist {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    fn release(
        &mut self,
        artist_id: &str,
        album_id: &str,
        kind: &str,
        group: &str,
        released_at: DateTime<Utc>,
    ) {
        self.albums
            .entry(artist_id.to_string())
            .or_default()
            .push(RemoteAlbum {
                id: album_id.to_string(),
                name: format!("Album {}", album_id),
                album_type: kind.to_string(),
                album_group: Some(group.to_string()),
                release_date: Some(released_at),
            });
    }

    fn track(&mut self, album_id: &str, track_id: &str, duration_ms: u64, playable: bool) {
        self.album_tracks
            .entry(album_id.to_string())
            .or_default()
            .push(RemoteTrack {
                id: track_id.to_string(),
                uri: format!("spotify:track:{}", track_id),
                name: format!("Track {}", track_id),
                duration_ms,
            });
        self.details.insert(
            track_id.to_string(),
            TrackDetail {
                id: track_id.to_string(),
                name: format!("Track {}", track_id),
                popularity: 50,
                duration_ms,
                is_playable: playable,
            },
        );
    }

    fn entry(&mut self, playlist_id: &str, track_id: &str, added_at: &str, popularity: u32) {
        self.playlist_entries
            .entry(playlist_id.to_string())
            .or_default()
            .push(PlaylistEntry {
                added_at: Some(added_at.to_string()),
                track: PlaylistTrack {
                    id: track_id.to_string(),
                    uri: format!("spotify:track:{}", track_id),
                    name: format!("Track {}", track_id),
                    popularity,
                },
            });
    }

    fn adds_to(&self, playlist_id: &str) -> Vec<Vec<String>> {
        self.adds
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == playlist_id)
            .map(|(_, ids)| ids.clone())
            .collect()
    }

    fn total_adds(&self) -> usize {
        self.adds.lock().unwrap().len()
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn current_user(&self) -> BridgeResult<RemoteUser> {
        Ok(RemoteUser {
            id: "me".to_string(),
            display_name: Some("Me".to_string()),
        })
    }

    async fn list_followed_artists(&self, cursor: Option<String>) -> BridgeResult<Page<RemoteArtist>> {
        Ok(paginate(&self.artists, cursor))
    }

    async fn list_artist_albums(
        &self,
        artist_id: &str,
        _kinds: &[AlbumKind],
        cursor: Option<String>,
    ) -> BridgeResult<Page<RemoteAlbum>> {
        let albums = self.albums.get(artist_id).cloned().unwrap_or_default();
        Ok(paginate(&albums, cursor))
    }

    async fn list_album_tracks(
        &self,
        album_id: &str,
        cursor: Option<String>,
    ) -> BridgeResult<Page<RemoteTrack>> {
        let tracks = self.album_tracks.get(album_id).cloned().unwrap_or_default();
        Ok(paginate(&tracks, cursor))
    }

    async fn get_track_details(&self, ids: &[String]) -> BridgeResult<Vec<TrackDetail>> {
        self.detail_calls.lock().unwrap().push(ids.len());
        Ok(ids
            .iter()
            .filter_map(|id| self.details.get(id).cloned())
            .collect())
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> BridgeResult<Page<PlaylistEntry>> {
        let entries = self
            .playlist_entries
            .get(playlist_id)
            .cloned()
            .unwrap_or_default();
        Ok(paginate(&entries, cursor))
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, track_ids: &[String]) -> BridgeResult<()> {
        if self.failing_destination.as_deref() == Some(playlist_id) {
            return Err(BridgeError::OperationFailed("HTTP 500".to_string()));
        }
        self.adds
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), track_ids.to_vec()));
        Ok(())
    }

    async fn list_user_playlists(
        &self,
        _user_id: &str,
        cursor: Option<String>,
    ) -> BridgeResult<Page<RemotePlaylist>> {
        Ok(paginate(&self.user_playlists, cursor))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Config rooted in `dir`; `playlists` is the raw JSON array of sources.
fn config(dir: &Path, playlists: &str) -> AppConfig {
    let raw = format!(
        r#"{{
            "client_id": "id",
            "client_secret": "secret",
            "redirect_uri": "http://localhost:8888/callback",
            "logs_path": "{logs}",
            "last_run_path": "{last_run}",
            "listen_later": "listen-later",
            "compilation": "compilations",
            "sets": "sets",
            "playlists": {playlists}
        }}"#,
        logs = dir.join("logs").display(),
        last_run = dir.join("lastrun").display(),
        playlists = playlists,
    );
    AppConfig::from_json(&raw).unwrap()
}

const ONE_SOURCE: &str = r#"[{ "id": "src", "name": "Fresh Finds", "limit": 2 }]"#;

async fn write_watermarks(dir: &Path, contents: &str) {
    tokio::fs::write(dir.join("lastrun"), contents).await.unwrap();
}

async fn read_watermarks(dir: &Path) -> String {
    tokio::fs::read_to_string(dir.join("lastrun")).await.unwrap()
}

fn coordinator(config: AppConfig, catalog: Arc<FakeCatalog>) -> SyncCoordinator {
    SyncCoordinator::new(config, catalog, Arc::new(FixedClock(now())))
}

// ============================================================================
// Artist scan
// ============================================================================

#[tokio::test]
async fn test_shared_release_is_cached_once_and_rescan_adds_nothing() {
    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.follow("ar2", "Burial");
    catalog.release("ar1", "collab", "single", "single", day(2024, 2, 10));
    catalog.release("ar2", "collab", "single", "single", day(2024, 2, 10));
    catalog.track("collab", "t1", 300_000, true);
    catalog.track("collab", "t2", 240_000, true);

    let settings = ScanSettings::default();
    let window = ReleaseWindow::new(day(2024, 1, 1), now());
    let scanner = ArtistReleaseScanner::new(&catalog, &settings, window);
    let mut cache = IdentityCache::new();
    let mut buckets = CurationBuckets::new();

    let first = scanner.scan(&mut cache, &mut buckets).await.unwrap();
    assert_eq!(first.artists, 2);
    assert_eq!(first.candidates, 2);
    assert_eq!(cache.tracks.len(), 2);
    assert_eq!(cache.albums.len(), 1);
    assert_eq!(buckets.len(Bucket::ListenLater), 2);

    let second = scanner.scan(&mut cache, &mut buckets).await.unwrap();
    assert_eq!(second.candidates, 0);
    assert_eq!(second.tracks_already_seen, 4);
    assert_eq!(cache.tracks.len(), 2);
    assert_eq!(buckets.len(Bucket::ListenLater), 2);
    assert_eq!(catalog.detail_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_appears_on_and_short_tracks_are_dropped() {
    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "guest", "album", "appears_on", day(2024, 2, 1));
    catalog.release("ar1", "own", "album", "album", day(2024, 2, 1));
    catalog.track("guest", "g1", 300_000, true);
    catalog.track("own", "intro", 80_000, true);
    catalog.track("own", "song", 80_001, true);

    let settings = ScanSettings::default();
    let window = ReleaseWindow::new(day(2024, 1, 1), now());
    let mut cache = IdentityCache::new();
    let mut buckets = CurationBuckets::new();

    let stats = ArtistReleaseScanner::new(&catalog, &settings, window)
        .scan(&mut cache, &mut buckets)
        .await
        .unwrap();

    assert_eq!(stats.albums_appears_on, 1);
    assert_eq!(stats.tracks_too_short, 1);
    assert!(cache.tracks.find("g1").is_none());
    assert!(cache.tracks.find("intro").is_none());

    let song = cache.tracks.find("song").unwrap();
    assert_eq!(buckets.get(Bucket::ListenLater), &[song]);
}

#[tokio::test]
async fn test_release_window_edges() {
    let watermark = day(2024, 1, 1);
    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "at-watermark", "album", "album", watermark);
    catalog.release("ar1", "just-after", "album", "album", watermark + Duration::seconds(1));
    catalog.release("ar1", "at-now", "album", "album", now());
    catalog.release("ar1", "future", "album", "album", now() + Duration::days(7));
    for album in ["at-watermark", "just-after", "at-now", "future"] {
        catalog.track(album, &format!("{}-t", album), 200_000, true);
    }

    let settings = ScanSettings::default();
    let mut cache = IdentityCache::new();
    let mut buckets = CurationBuckets::new();
    let stats = ArtistReleaseScanner::new(&catalog, &settings, ReleaseWindow::new(watermark, now()))
        .scan(&mut cache, &mut buckets)
        .await
        .unwrap();

    assert_eq!(stats.albums_accepted, 1);
    assert_eq!(stats.albums_out_of_window, 3);
    assert!(cache.albums.contains("just-after"));
    assert!(!cache.albums.contains("at-watermark"));
    assert!(!cache.albums.contains("at-now"));
}

#[tokio::test]
async fn test_candidates_are_detailed_in_chunks_and_classified() {
    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "big", "compilation", "compilation", day(2024, 2, 1));
    for i in 0..120 {
        catalog.track("big", &format!("t{}", i), 200_000, i % 40 != 0);
    }
    catalog.track("big", "mix", 3_600_000, true);

    let settings = ScanSettings {
        route_compilations: true,
        ..ScanSettings::default()
    };
    let mut cache = IdentityCache::new();
    let mut buckets = CurationBuckets::new();
    let stats = ArtistReleaseScanner::new(
        &catalog,
        &settings,
        ReleaseWindow::new(day(2024, 1, 1), now()),
    )
    .scan(&mut cache, &mut buckets)
    .await
    .unwrap();

    assert_eq!(*catalog.detail_calls.lock().unwrap(), vec![50, 50, 21]);
    assert_eq!(stats.unplayable, 3);
    assert_eq!(buckets.len(Bucket::Unplayable), 3);
    assert_eq!(buckets.len(Bucket::Sets), 1);
    assert_eq!(buckets.len(Bucket::Compilations), 117);
    assert!(buckets.get(Bucket::ListenLater).is_empty());
}

// ============================================================================
// Playlist scan
// ============================================================================

#[tokio::test]
async fn test_playlist_entries_are_filtered_ranked_and_bounded() {
    let mut catalog = FakeCatalog::default();
    catalog.entry("src", "old", "2023-12-31T23:59:59Z", 99);
    catalog.entry("src", "edge", "2024-01-01T00:00:00Z", 10);
    catalog.entry("src", "hot", "2024-02-01T08:00:00Z", 50);
    catalog.entry("src", "broken", "yesterday", 90);
    catalog.entry("src", "warm", "2024-02-02T08:00:00Z", 30);

    let sources = vec![PlaylistSource {
        id: "src".to_string(),
        name: "Fresh Finds".to_string(),
        limit: PlaylistLimit::AtMost(2),
    }];
    let mut cache = IdentityCache::new();
    let mut buckets = CurationBuckets::new();
    let stats = PlaylistTrackScanner::new(&catalog, &sources, day(2024, 1, 1))
        .scan(&mut cache, &mut buckets)
        .await
        .unwrap();

    assert_eq!(stats.entries_seen, 5);
    assert_eq!(stats.entries_too_old, 1);
    assert_eq!(stats.entries_unparseable, 1);
    assert_eq!(stats.candidates, 3);
    assert_eq!(stats.emitted, 2);

    let emitted: Vec<&str> = buckets
        .get(Bucket::ListenLater)
        .iter()
        .map(|h| cache.tracks[*h].external_id.as_str())
        .collect();
    assert_eq!(emitted, vec!["hot", "warm"]);
}

#[tokio::test]
async fn test_unbounded_playlist_keeps_every_recent_entry() {
    let mut catalog = FakeCatalog::default();
    for (i, popularity) in [10u32, 50, 30, 50].into_iter().enumerate() {
        catalog.entry("src", &format!("t{}", i), "2024-02-01T00:00:00Z", popularity);
    }

    let sources = vec![PlaylistSource {
        id: "src".to_string(),
        name: "All".to_string(),
        limit: PlaylistLimit::Unbounded,
    }];
    let mut cache = IdentityCache::new();
    let mut buckets = CurationBuckets::new();
    PlaylistTrackScanner::new(&catalog, &sources, day(2024, 1, 1))
        .scan(&mut cache, &mut buckets)
        .await
        .unwrap();

    let emitted: Vec<&str> = buckets
        .get(Bucket::ListenLater)
        .iter()
        .map(|h| cache.tracks[*h].external_id.as_str())
        .collect();
    assert_eq!(emitted, vec!["t1", "t3", "t2", "t0"]);
}

// ============================================================================
// Coordinated runs
// ============================================================================

#[tokio::test]
async fn test_playlist_only_run_leaves_artist_watermark_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2023-11-30,2024-01-01").await;

    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "al1", "album", "album", day(2024, 2, 1));
    catalog.track("al1", "artist-track", 200_000, true);
    catalog.entry("src", "a", "2024-02-01T00:00:00Z", 10);
    catalog.entry("src", "b", "2024-02-01T00:00:00Z", 70);
    catalog.entry("src", "c", "2024-02-01T00:00:00Z", 40);
    let catalog = Arc::new(catalog);

    let summary = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::new(false, true))
        .await
        .unwrap();

    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.listen_later, 2);
    assert!(!summary.artist_watermark_advanced);
    assert!(summary.playlist_watermark_advanced);
    assert_eq!(catalog.adds_to("listen-later"), vec![vec!["b".to_string(), "c".to_string()]]);
    assert!(catalog.detail_calls.lock().unwrap().is_empty());

    assert_eq!(read_watermarks(dir.path()).await, "2023-11-30,2024-03-01");

    let report_path = summary.report_path.unwrap();
    assert_eq!(report_path.file_name().unwrap(), "info0.log");
    let report = tokio::fs::read_to_string(report_path).await.unwrap();
    assert!(report.contains("Playlist Date: 2024-01-01, Total=2"));
    assert!(report.contains("Fresh Finds --- 2024-02-01 00:00:00 --- Track b (70)"));
    assert!(!report.contains("Artist Date"));
}

#[tokio::test]
async fn test_full_run_routes_buckets_and_advances_both_watermarks() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-01-01,2024-01-01").await;

    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "al1", "album", "album", day(2024, 2, 1));
    catalog.track("al1", "song", 200_000, true);
    catalog.track("al1", "set", 1_860_000, true);
    catalog.track("al1", "blocked", 200_000, false);
    catalog.entry("src", "p1", "2024-02-01T00:00:00Z", 10);
    let catalog = Arc::new(catalog);

    let summary = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::new(true, true))
        .await
        .unwrap();

    assert_eq!(summary.tracks_discovered, 4);
    assert_eq!(summary.unplayable, 1);
    assert_eq!(
        catalog.adds_to("listen-later"),
        vec![vec!["song".to_string(), "p1".to_string()]]
    );
    assert_eq!(catalog.adds_to("sets"), vec![vec!["set".to_string()]]);
    assert!(catalog.adds_to("compilations").is_empty());
    assert_eq!(read_watermarks(dir.path()).await, "2024-03-01,2024-03-01");

    let report = tokio::fs::read_to_string(summary.report_path.unwrap())
        .await
        .unwrap();
    assert!(report.contains("Four Tet --- Album al1 --- 2024-02-01 --- Track song"));
    assert!(report.contains("UnPlayable, Total=1"));
}

#[tokio::test]
async fn test_release_resurfacing_in_playlist_is_reported_by_both_scans() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-01-01,2024-01-01").await;

    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "al1", "album", "album", day(2024, 2, 1));
    catalog.track("al1", "song", 200_000, true);
    catalog.entry("src", "song", "2024-02-03T10:00:00Z", 50);
    let catalog = Arc::new(catalog);

    let summary = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::new(true, true))
        .await
        .unwrap();

    assert_eq!(summary.tracks_discovered, 1);
    assert_eq!(summary.listen_later, 2);

    let report = tokio::fs::read_to_string(summary.report_path.unwrap())
        .await
        .unwrap();
    assert!(report.contains("Artist Date: 2024-01-01, Total=1"));
    assert!(report.contains("Four Tet --- Album al1 --- 2024-02-01 --- Track song"));
    assert!(report.contains("Playlist Date: 2024-01-01, Total=1"));
    assert!(report.contains("Fresh Finds --- 2024-02-03 10:00:00 --- Track song (50)"));
}

#[tokio::test]
async fn test_large_bucket_is_written_in_chunks() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-01-01,2024-01-01").await;

    let mut catalog = FakeCatalog::default();
    for i in 0..150 {
        catalog.entry("src", &format!("t{}", i), "2024-02-01T00:00:00Z", 1);
    }
    let catalog = Arc::new(catalog);
    let config = config(
        dir.path(),
        r#"[{ "id": "src", "name": "Big", "limit": -1 }]"#,
    );

    let summary = coordinator(config, catalog.clone())
        .run(RunOptions::new(false, true))
        .await
        .unwrap();

    let chunks = catalog.adds_to("listen-later");
    assert_eq!(summary.chunks_written, 2);
    assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![100, 50]);
    assert_eq!(chunks[0][0], "t0");
    assert_eq!(chunks[1][49], "t149");
}

#[tokio::test]
async fn test_failed_write_aborts_without_touching_watermarks() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-01-01,2024-01-01").await;

    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "al1", "album", "album", day(2024, 2, 1));
    catalog.track("al1", "song", 200_000, true);
    catalog.track("al1", "set", 2_000_000, true);
    catalog.failing_destination = Some("sets".to_string());
    let catalog = Arc::new(catalog);

    let result = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::new(true, true))
        .await;

    match result {
        Err(SyncError::RemoteWrite { playlist_id, .. }) => assert_eq!(playlist_id, "sets"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(catalog.adds_to("listen-later").len(), 1);
    assert_eq!(read_watermarks(dir.path()).await, "2024-01-01,2024-01-01");
    assert!(!dir.path().join("logs").exists());
}

#[tokio::test]
async fn test_watermark_override_applies_to_enabled_scans_only() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-02-15,2024-02-15").await;

    let mut catalog = FakeCatalog::default();
    catalog.follow("ar1", "Four Tet");
    catalog.release("ar1", "al1", "album", "album", day(2024, 2, 1));
    catalog.track("al1", "song", 200_000, true);
    let catalog = Arc::new(catalog);

    let summary = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::new(true, false).with_watermark_override("2024-01-01"))
        .await
        .unwrap();

    assert_eq!(summary.listen_later, 1);
    assert_eq!(read_watermarks(dir.path()).await, "2024-03-01,2024-02-15");
}

#[tokio::test]
async fn test_run_without_scans_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-01-01,2024-01-01\n").await;
    let catalog = Arc::new(FakeCatalog::default());

    let summary = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.phase, RunPhase::Done);
    assert!(summary.report_path.is_none());
    assert_eq!(catalog.total_adds(), 0);
    assert_eq!(read_watermarks(dir.path()).await, "2024-01-01,2024-01-01\n");
}

#[tokio::test]
async fn test_missing_watermark_file_fails_before_any_remote_call() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = FakeCatalog::default();
    catalog.entry("src", "a", "2024-02-01T00:00:00Z", 10);
    let catalog = Arc::new(catalog);

    let result = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(RunOptions::new(false, true))
        .await;

    assert!(matches!(result, Err(SyncError::Io { .. })));
    assert_eq!(catalog.total_adds(), 0);
}

#[tokio::test]
async fn test_followed_playlists_walks_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = FakeCatalog::default();
    for i in 0..5 {
        catalog.user_playlists.push(RemotePlaylist {
            id: format!("pl{}", i),
            name: format!("Playlist {}", i),
            owner: "me".to_string(),
            track_count: i,
        });
    }

    let playlists = coordinator(config(dir.path(), ONE_SOURCE), Arc::new(catalog))
        .followed_playlists()
        .await
        .unwrap();

    let ids: Vec<&str> = playlists.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["pl0", "pl1", "pl2", "pl3", "pl4"]);
}

#[tokio::test]
async fn test_malformed_override_fails_before_any_remote_call() {
    let dir = tempfile::tempdir().unwrap();
    write_watermarks(dir.path(), "2024-01-01,2024-01-01").await;
    let mut catalog = FakeCatalog::default();
    catalog.entry("src", "a", "2024-02-01T00:00:00Z", 10);
    let catalog = Arc::new(catalog);

    let options = RunOptions::new(false, true).with_watermark_override("01/02/2024");
    assert!(matches!(options.validate(), Err(SyncError::DateParse { .. })));

    let result = coordinator(config(dir.path(), ONE_SOURCE), catalog.clone())
        .run(options)
        .await;

    assert!(matches!(result, Err(SyncError::DateParse { .. })));
    assert_eq!(catalog.total_adds(), 0);
    assert_eq!(read_watermarks(dir.path()).await, "2024-01-01,2024-01-01");
}
