//! # Run Watermarks
//!
//! The watermark file holds exactly `<artist-date>,<playlist-date>` with both
//! dates as `YYYY-MM-DD`. It is read once at the start of a run and rewritten
//! only after a fully successful run. A category that was not scanned keeps
//! its previous text untouched.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};

pub const WATERMARK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date to midnight UTC.
pub fn parse_watermark_date(input: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input.trim(), WATERMARK_DATE_FORMAT).map_err(|e| {
        SyncError::DateParse {
            input: input.to_string(),
            reason: e.to_string(),
        }
    })?;

    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| SyncError::DateParse {
        input: input.to_string(),
        reason: "no midnight on this date".to_string(),
    })?;
    Ok(Utc.from_utc_datetime(&midnight))
}

pub fn format_watermark_date(ts: DateTime<Utc>) -> String {
    ts.format(WATERMARK_DATE_FORMAT).to_string()
}

/// One watermark: the parsed date and the exact text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    raw: String,
    at: DateTime<Utc>,
}

impl Watermark {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self {
            at: parse_watermark_date(raw)?,
            raw: raw.to_string(),
        })
    }

    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        let raw = format_watermark_date(ts);
        let at = Utc.from_utc_datetime(&ts.date_naive().and_time(NaiveTime::default()));
        Self { raw, at }
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Both category watermarks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWatermark {
    pub artists: Watermark,
    pub playlists: Watermark,
}

impl RunWatermark {
    /// Parse the file contents. Surrounding whitespace is ignored.
    pub fn parse(contents: &str) -> Result<Self> {
        let fields: Vec<&str> = contents.trim().split(',').collect();
        let [artists, playlists] = fields.as_slice() else {
            return Err(SyncError::WatermarkFormat(format!(
                "expected '<artist-date>,<playlist-date>', found {} field(s)",
                fields.len()
            )));
        };

        Ok(Self {
            artists: Watermark::parse(artists.trim())?,
            playlists: Watermark::parse(playlists.trim())?,
        })
    }

    /// Replace the watermark of each selected category with `date`.
    pub fn override_with(&mut self, date: &Watermark, artists: bool, playlists: bool) {
        if artists {
            self.artists = date.clone();
        }
        if playlists {
            self.playlists = date.clone();
        }
    }

    /// Watermarks after a successful run: scanned categories move to `now`,
    /// the others are carried over as they were.
    pub fn advanced(&self, now: DateTime<Utc>, artists_scanned: bool, playlists_scanned: bool) -> Self {
        let next = Watermark::from_timestamp(now);
        Self {
            artists: if artists_scanned {
                next.clone()
            } else {
                self.artists.clone()
            },
            playlists: if playlists_scanned {
                next
            } else {
                self.playlists.clone()
            },
        }
    }

    pub fn serialize(&self) -> String {
        format!("{},{}", self.artists.as_str(), self.playlists.as_str())
    }
}

/// Reads and writes the watermark file.
#[derive(Debug, Clone)]
pub struct RunWatermarkStore {
    path: PathBuf,
}

impl RunWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<RunWatermark> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SyncError::io(&self.path, e))?;
        let watermark = RunWatermark::parse(&contents)?;

        info!(
            artists = watermark.artists.as_str(),
            playlists = watermark.playlists.as_str(),
            "Loaded watermarks"
        );
        Ok(watermark)
    }

    #[instrument(skip(self, watermark), fields(path = %self.path.display()))]
    pub async fn persist(&self, watermark: &RunWatermark) -> Result<()> {
        let contents = watermark.serialize();
        tokio::fs::write(&self.path, &contents)
            .await
            .map_err(|e| SyncError::io(&self.path, e))?;

        debug!(contents = %contents, "Persisted watermarks");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watermark_file() {
        let watermark = RunWatermark::parse("2024-01-05,2024-02-10\n").unwrap();
        assert_eq!(watermark.artists.as_str(), "2024-01-05");
        assert_eq!(watermark.playlists.at().to_rfc3339(), "2024-02-10T00:00:00+00:00");
    }

    #[test]
    fn test_malformed_watermark_file() {
        assert!(matches!(
            RunWatermark::parse("2024-01-05"),
            Err(SyncError::WatermarkFormat(_))
        ));
        assert!(matches!(
            RunWatermark::parse("2024-01-05,2024-02-10,2024-03-01"),
            Err(SyncError::WatermarkFormat(_))
        ));
        assert!(matches!(
            RunWatermark::parse("2024-13-05,2024-02-10"),
            Err(SyncError::DateParse { .. })
        ));
        assert!(matches!(
            RunWatermark::parse("05/01/2024,2024-02-10"),
            Err(SyncError::DateParse { .. })
        ));
    }

    #[test]
    fn test_partial_advance_keeps_unscanned_field() {
        let loaded = RunWatermark::parse("2024-01-05,2024-02-10").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 17, 45, 0).unwrap();

        let playlists_only = loaded.advanced(now, false, true);
        assert_eq!(playlists_only.serialize(), "2024-01-05,2024-03-01");

        let artists_only = loaded.advanced(now, true, false);
        assert_eq!(artists_only.serialize(), "2024-03-01,2024-02-10");

        let neither = loaded.advanced(now, false, false);
        assert_eq!(neither, loaded);
    }

    #[test]
    fn test_override_selected_categories() {
        let mut watermark = RunWatermark::parse("2024-01-05,2024-02-10").unwrap();
        let debug_date = Watermark::parse("2023-06-01").unwrap();

        watermark.override_with(&debug_date, true, false);
        assert_eq!(watermark.serialize(), "2023-06-01,2024-02-10");
    }

    #[tokio::test]
    async fn test_store_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunWatermarkStore::new(dir.path().join("last_run"));

        assert!(matches!(store.load().await, Err(SyncError::Io { .. })));

        tokio::fs::write(store.path(), "2024-01-05,2024-02-10").await.unwrap();
        let loaded = store.load().await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        store.persist(&loaded.advanced(now, false, true)).await.unwrap();

        let on_disk = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(on_disk, "2024-01-05,2024-03-01");
    }
}
