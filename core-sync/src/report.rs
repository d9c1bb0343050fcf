//! Plain-text run report.
//!
//! One file per run, `info<N>.log`, where `N` is the number of entries
//! already in the report directory. Up to three sections (artist findings,
//! playlist findings, unplayable tracks), each framed by rules:
//!
//! ```text
//! --------------------------------
//! Artist Date: 2024-03-01, Total=2
//! --------------------------------
//! Four Tet --- Three --- 2024-03-08 --- Loved
//! ...
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::cache::IdentityCache;
use crate::error::{Result, SyncError};
use crate::model::{Bucket, CurationBuckets, Finding, TrackOrigin, TrackRecord};
use crate::watermark::format_watermark_date;

const RULE: &str = "--------------------------------";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    artist_date: String,
    playlist_date: String,
    artist_lines: Vec<String>,
    playlist_lines: Vec<String>,
    unplayable_lines: Vec<String>,
}

impl RunReport {
    /// Build the report from the run's findings.
    ///
    /// Sections follow the scanner that emitted each track: a release that a
    /// source playlist also surfaced shows up once under artist findings and
    /// once under playlist findings.
    ///
    /// `artist_since` and `playlist_since` are the watermarks the scans used.
    pub fn build(
        cache: &IdentityCache,
        buckets: &CurationBuckets,
        artist_since: DateTime<Utc>,
        playlist_since: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            artist_date: format_watermark_date(artist_since),
            playlist_date: format_watermark_date(playlist_since),
            ..Self::default()
        };

        for finding in buckets.findings() {
            match *finding {
                Finding::Release { track, bucket } => {
                    let line = release_line(cache, &cache.tracks[track]);
                    if bucket == Bucket::Unplayable {
                        report.unplayable_lines.push(line);
                    } else {
                        report.artist_lines.push(line);
                    }
                }
                Finding::Playlist {
                    track,
                    playlist,
                    added_at,
                } => {
                    let track = &cache.tracks[track];
                    report.playlist_lines.push(format!(
                        "{} --- {} --- {} ({})",
                        cache.playlists[playlist].name,
                        added_at.format("%Y-%m-%d %H:%M:%S"),
                        track.name,
                        track.popularity
                    ));
                }
            }
        }

        report
    }

    pub fn is_empty(&self) -> bool {
        self.artist_lines.is_empty()
            && self.playlist_lines.is_empty()
            && self.unplayable_lines.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let artist_title = format!(
            "Artist Date: {}, Total={}",
            self.artist_date,
            self.artist_lines.len()
        );
        let playlist_title = format!(
            "Playlist Date: {}, Total={}",
            self.playlist_date,
            self.playlist_lines.len()
        );
        let unplayable_title = format!("UnPlayable, Total={}", self.unplayable_lines.len());

        for (title, lines) in [
            (artist_title, &self.artist_lines),
            (playlist_title, &self.playlist_lines),
            (unplayable_title, &self.unplayable_lines),
        ] {
            if lines.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}\n{}\n{}", RULE, title, RULE);
            for line in lines {
                let _ = writeln!(out, "{}", line);
            }
        }
        out
    }

    /// Write the report as the next `info<N>.log` in `dir`.
    ///
    /// `N` starts at the number of entries already in `dir` and moves past
    /// any name that is taken, so an existing report is never overwritten.
    pub async fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SyncError::io(dir, e))?;

        let mut index = 0usize;
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| SyncError::io(dir, e))?;
        while entries
            .next_entry()
            .await
            .map_err(|e| SyncError::io(dir, e))?
            .is_some()
        {
            index += 1;
        }

        loop {
            let path = dir.join(format!("info{}.log", index));
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(self.render().as_bytes())
                        .await
                        .map_err(|e| SyncError::io(&path, e))?;
                    file.flush().await.map_err(|e| SyncError::io(&path, e))?;

                    info!(path = %path.display(), "Run report written");
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Report name taken, trying the next one");
                    index += 1;
                }
                Err(e) => return Err(SyncError::io(&path, e)),
            }
        }
    }
}

fn release_line(cache: &IdentityCache, track: &TrackRecord) -> String {
    let (artist, album, released) = match track.origin {
        TrackOrigin::Release { artist, album } => (
            cache.artists[artist].name.as_str(),
            cache.albums[album].name.as_str(),
            format_watermark_date(cache.albums[album].released_at),
        ),
        TrackOrigin::Playlist(playlist) => (
            "",
            cache.playlists[playlist].name.as_str(),
            format_watermark_date(track.discovered_at),
        ),
    };
    format!("{} --- {} --- {} --- {}", artist, album, released, track.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlbumRecord, ArtistRecord, PlaylistRecord};
    use bridge_traits::catalog::AlbumKind;
    use chrono::TimeZone;

    fn fixture() -> (IdentityCache, CurationBuckets) {
        let mut cache = IdentityCache::new();
        let mut buckets = CurationBuckets::new();
        let released = Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap();

        let artist = cache
            .artists
            .get_or_create("ar1", || ArtistRecord::new("ar1", "Four Tet"));
        let album = cache.albums.get_or_create("al1", || AlbumRecord {
            external_id: "al1".into(),
            name: "Three".into(),
            kind: AlbumKind::Album,
            artist,
            released_at: released,
            tracks: Vec::new(),
        });
        let playlist = cache.playlists.get_or_create("pl1", || PlaylistRecord {
            external_id: "pl1".into(),
            name: "Fresh Finds".into(),
            source_index: 0,
            tracks: Vec::new(),
        });

        let added_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let mut track = |id: &str, name: &str, origin: TrackOrigin, popularity: u32| {
            cache.tracks.get_or_create(id, || TrackRecord {
                external_id: id.into(),
                uri: format!("spotify:track:{}", id),
                name: name.into(),
                origin,
                popularity,
                duration_ms: 200_000,
                discovered_at: added_at,
            })
        };
        let release = TrackOrigin::Release { artist, album };
        let loved = track("t1", "Loved", release, 60);
        let hidden = track("t2", "Hidden", release, 0);
        let found = track("t3", "Gem", TrackOrigin::Playlist(playlist), 42);

        buckets.push_release(Bucket::ListenLater, loved);
        buckets.push_playlist_find(found, playlist, added_at);
        buckets.push_release(Bucket::Unplayable, hidden);
        (cache, buckets)
    }

    #[test]
    fn test_render_sections() {
        let (cache, buckets) = fixture();
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let report = RunReport::build(&cache, &buckets, since, since);

        let expected = [
            RULE,
            "Artist Date: 2024-03-01, Total=1",
            RULE,
            "Four Tet --- Three --- 2024-03-08 --- Loved",
            RULE,
            "Playlist Date: 2024-03-01, Total=1",
            RULE,
            "Fresh Finds --- 2024-03-09 14:05:00 --- Gem (42)",
            RULE,
            "UnPlayable, Total=1",
            RULE,
            "Four Tet --- Three --- 2024-03-08 --- Hidden",
        ]
        .join("\n")
            + "\n";
        assert_eq!(report.render(), expected);
    }

    #[test]
    fn test_release_also_found_in_playlist_is_reported_under_both() {
        let (cache, mut buckets) = fixture();
        let loved = cache.tracks.find("t1").unwrap();
        let playlist = cache.playlists.find("pl1").unwrap();
        let added_at = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        buckets.push_playlist_find(loved, playlist, added_at);

        let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let rendered = RunReport::build(&cache, &buckets, since, since).render();

        assert!(rendered.contains("Artist Date: 2024-03-01, Total=1"));
        assert!(rendered.contains("Playlist Date: 2024-03-01, Total=2"));
        assert!(rendered.contains("Fresh Finds --- 2024-03-10 08:00:00 --- Loved (60)"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let cache = IdentityCache::new();
        let buckets = CurationBuckets::new();
        let report = RunReport::build(&cache, &buckets, Utc::now(), Utc::now());

        assert!(report.is_empty());
        assert_eq!(report.render(), "");
    }

    #[tokio::test]
    async fn test_files_are_numbered_by_directory_size() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, buckets) = fixture();
        let report = RunReport::build(&cache, &buckets, Utc::now(), Utc::now());

        let first = report.write_to_dir(dir.path()).await.unwrap();
        let second = report.write_to_dir(dir.path()).await.unwrap();

        assert_eq!(first.file_name().unwrap(), "info0.log");
        assert_eq!(second.file_name().unwrap(), "info1.log");
        let contents = tokio::fs::read_to_string(second).await.unwrap();
        assert!(contents.contains("Gem (42)"));
    }

    #[tokio::test]
    async fn test_existing_report_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        // One entry in the directory, but it already holds the name info1.log.
        tokio::fs::write(dir.path().join("info1.log"), "earlier run")
            .await
            .unwrap();

        let (cache, buckets) = fixture();
        let report = RunReport::build(&cache, &buckets, Utc::now(), Utc::now());
        let path = report.write_to_dir(dir.path()).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "info2.log");
        let earlier = tokio::fs::read_to_string(dir.path().join("info1.log"))
            .await
            .unwrap();
        assert_eq!(earlier, "earlier run");
    }
}
