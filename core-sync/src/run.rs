//! # Curation Run State Machine
//!
//! ```text
//! Idle → WatermarksLoaded → Scanning → [Classifying] → Writing → WatermarksPersisted → Done
//!   └──────────────┴────────────┴────────────┴────────────┴───────────→ Aborted
//! ```
//!
//! `Classifying` is entered only when the artist path ran. Any error moves
//! the run to `Aborted`, which skips watermark persistence.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use crate::cache::IdentityCache;
use crate::error::{Result, SyncError};
use crate::model::{Bucket, CurationBuckets};
use crate::watermark::Watermark;

/// Unique identifier for one run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    WatermarksLoaded,
    Scanning { artists: bool, playlists: bool },
    Classifying,
    Writing,
    WatermarksPersisted,
    Done,
    Aborted,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::WatermarksLoaded => "watermarks_loaded",
            RunPhase::Scanning { .. } => "scanning",
            RunPhase::Classifying => "classifying",
            RunPhase::Writing => "writing",
            RunPhase::WatermarksPersisted => "watermarks_persisted",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        }
    }

    fn can_transition_to(&self, next: &RunPhase) -> bool {
        use RunPhase::*;

        match (self, next) {
            (from, Aborted) => !from.is_terminal(),
            (Idle, WatermarksLoaded) => true,
            (WatermarksLoaded, Scanning { .. }) => true,
            (Scanning { artists: true, .. }, Classifying) => true,
            (Scanning { .. }, Writing) => true,
            (Classifying, Writing) => true,
            (Writing, WatermarksPersisted) => true,
            (WatermarksPersisted, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which categories to scan and an optional watermark override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub scan_artists: bool,
    pub scan_playlists: bool,
    /// `YYYY-MM-DD` replacing the watermark of every enabled category
    pub watermark_override: Option<String>,
}

impl RunOptions {
    pub fn new(scan_artists: bool, scan_playlists: bool) -> Self {
        Self {
            scan_artists,
            scan_playlists,
            watermark_override: None,
        }
    }

    pub fn with_watermark_override(mut self, date: impl Into<String>) -> Self {
        self.watermark_override = Some(date.into());
        self
    }

    pub fn scans_anything(&self) -> bool {
        self.scan_artists || self.scan_playlists
    }

    /// Reject a malformed override before any remote work starts.
    pub fn validate(&self) -> Result<()> {
        if let Some(raw) = self.watermark_override.as_deref() {
            Watermark::parse(raw)?;
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub phase: RunPhase,
    pub tracks_discovered: usize,
    pub listen_later: usize,
    pub sets: usize,
    pub compilations: usize,
    pub unplayable: usize,
    pub chunks_written: usize,
    pub report_path: Option<PathBuf>,
    pub artist_watermark_advanced: bool,
    pub playlist_watermark_advanced: bool,
}

/// State owned by one run: the cache, the buckets and the current phase.
#[derive(Debug)]
pub struct RunContext {
    pub id: RunId,
    /// Captured once when the run starts
    pub now: DateTime<Utc>,
    pub cache: IdentityCache,
    pub buckets: CurationBuckets,
    phase: RunPhase,
}

impl RunContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: RunId::new(),
            now,
            cache: IdentityCache::new(),
            buckets: CurationBuckets::new(),
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(&next) {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
                reason: "not a legal run transition".to_string(),
            });
        }

        debug!(run_id = %self.id, from = %self.phase, to = %next, "Run phase change");
        self.phase = next;
        Ok(())
    }

    /// Mark the run aborted. No-op once terminal.
    pub fn abort(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = RunPhase::Aborted;
        }
    }

    pub fn summary(
        &self,
        chunks_written: usize,
        report_path: Option<PathBuf>,
        options: &RunOptions,
    ) -> RunSummary {
        RunSummary {
            run_id: self.id,
            phase: self.phase,
            tracks_discovered: self.cache.tracks.len(),
            listen_later: self.buckets.len(Bucket::ListenLater),
            sets: self.buckets.len(Bucket::Sets),
            compilations: self.buckets.len(Bucket::Compilations),
            unplayable: self.buckets.len(Bucket::Unplayable),
            chunks_written,
            report_path,
            artist_watermark_advanced: options.scan_artists,
            playlist_watermark_advanced: options.scan_playlists,
        }
    }
}
