//! # Configuration
//!
//! The JSON configuration file read at startup.
//!
//! ## Example
//!
//! ```json
//! {
//!   "client_id": "abc",
//!   "client_secret": "shh",
//!   "redirect_uri": "http://localhost:8080/callback",
//!   "logs_path": "/home/me/.squeue/logs",
//!   "last_run_path": "/home/me/.squeue/lastrun",
//!   "listen_later": "37i9dQZF1DX0XUsuxWHRQd",
//!   "compilation": "1h0CEZCm6IbFTbxThn6Xcs",
//!   "sets": "6UeSakyzhiEt4NB3UAd6NQ",
//!   "playlists": [
//!     { "id": "37i9dQZF1DWXRqgorJj26U", "name": "Rock Classics", "limit": 5 },
//!     { "id": "37i9dQZF1DX4JAvHpjipBk", "name": "New Music Friday", "limit": -1 }
//!   ],
//!   "scan": { "included_album_kinds": ["single", "compilation"] }
//! }
//! ```
//!
//! Everything outside the required credentials, paths and destination IDs has
//! a default. [`AppConfig::load`] parses and validates in one step so a bad file
//! is rejected before any network traffic.

use crate::error::{Error, Result};
use crate::logging::LogFormat;
use bridge_traits::catalog::{AlbumKind, MAX_TRACK_DETAILS_PER_CALL};
use bridge_traits::time::LogLevel;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// OAuth redirect URI; the callback listener binds its host and port
    pub redirect_uri: String,

    /// Directory receiving one plain-text report per run
    #[serde(default)]
    pub logs_path: Option<PathBuf>,

    /// Watermark file holding `<artist-date>,<playlist-date>`
    pub last_run_path: PathBuf,

    /// Destination playlist for ordinary new tracks
    pub listen_later: String,

    /// Destination playlist for compilation tracks
    pub compilation: String,

    /// Destination playlist for long-form sets
    pub sets: String,

    /// Source playlists scanned by `-p`, in scan order
    #[serde(default)]
    pub playlists: Vec<PlaylistSource>,

    /// Market code sent with catalog queries
    #[serde(default = "default_market")]
    pub market: String,

    /// Artist-scan filters and classification thresholds
    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_market() -> String {
    "US".to_string()
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("logs_path", &self.logs_path)
            .field("last_run_path", &self.last_run_path)
            .field("listen_later", &self.listen_later)
            .field("compilation", &self.compilation)
            .field("sets", &self.sets)
            .field("playlists", &self.playlists)
            .field("market", &self.market)
            .field("scan", &self.scan)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Read, parse and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Could not read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&raw)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("Could not parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("listen_later", &self.listen_later),
            ("compilation", &self.compilation),
            ("sets", &self.sets),
            ("market", &self.market),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("'{}' cannot be empty", field)));
            }
        }

        if self.last_run_path.as_os_str().is_empty() {
            return Err(Error::Config("'last_run_path' cannot be empty".to_string()));
        }

        for (index, playlist) in self.playlists.iter().enumerate() {
            if playlist.id.trim().is_empty() {
                return Err(Error::Config(format!(
                    "playlists[{}] ('{}') has an empty id",
                    index, playlist.name
                )));
            }
        }

        self.scan.validate()
    }
}

/// A source playlist scanned by the playlist scanner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub limit: PlaylistLimit,
}

/// Maximum number of ranked tracks emitted for one source playlist.
///
/// Written in JSON as an integer or a numeric string; `-1` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLimit")]
pub enum PlaylistLimit {
    Unbounded,
    AtMost(usize),
}

impl PlaylistLimit {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, PlaylistLimit::Unbounded)
    }

    /// Parse the numeric form, `-1` being unbounded.
    pub fn from_i64(value: i64) -> std::result::Result<Self, String> {
        match value {
            -1 => Ok(PlaylistLimit::Unbounded),
            n if n >= 0 => Ok(PlaylistLimit::AtMost(n as usize)),
            n => Err(format!("playlist limit must be -1 or >= 0, got {}", n)),
        }
    }
}

impl Default for PlaylistLimit {
    fn default() -> Self {
        PlaylistLimit::Unbounded
    }
}

impl fmt::Display for PlaylistLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistLimit::Unbounded => f.write_str("unbounded"),
            PlaylistLimit::AtMost(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Number(i64),
    Text(String),
}

impl TryFrom<RawLimit> for PlaylistLimit {
    type Error = String;

    fn try_from(raw: RawLimit) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawLimit::Number(n) => PlaylistLimit::from_i64(n),
            RawLimit::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid playlist limit '{}': {}", text, e))
                .and_then(PlaylistLimit::from_i64),
        }
    }
}

/// Artist-scan filters and classification thresholds.
///
/// Included kinds and both durations are configuration rather than constants;
/// the defaults are the values the curation rules settled on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Album kinds requested from each artist's release feed
    pub included_album_kinds: Vec<AlbumKind>,

    /// Artist-path tracks at or below this duration are dropped (intros, interludes)
    pub min_track_duration_ms: u64,

    /// Playable tracks at or above this duration are routed to the sets playlist
    pub set_duration_ms: u64,

    /// Track IDs per track-detail call
    pub detail_chunk_size: usize,

    /// Route playable non-set tracks from compilation albums to the compilation playlist
    pub route_compilations: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            included_album_kinds: vec![AlbumKind::Album, AlbumKind::Single, AlbumKind::Compilation],
            min_track_duration_ms: 80_000,
            set_duration_ms: 1_860_000,
            detail_chunk_size: MAX_TRACK_DETAILS_PER_CALL,
            route_compilations: false,
        }
    }
}

impl ScanSettings {
    pub fn validate(&self) -> Result<()> {
        if self.included_album_kinds.is_empty() {
            return Err(Error::Config(
                "scan.included_album_kinds must name at least one kind".to_string(),
            ));
        }

        if self.included_album_kinds.contains(&AlbumKind::AppearsOn) {
            return Err(Error::Config(
                "scan.included_album_kinds cannot include 'appears_on'".to_string(),
            ));
        }

        let unique: HashSet<_> = self.included_album_kinds.iter().collect();
        if unique.len() != self.included_album_kinds.len() {
            return Err(Error::Config(
                "scan.included_album_kinds contains duplicates".to_string(),
            ));
        }

        if self.detail_chunk_size == 0 || self.detail_chunk_size > MAX_TRACK_DETAILS_PER_CALL {
            return Err(Error::Config(format!(
                "scan.detail_chunk_size must be between 1 and {}",
                MAX_TRACK_DETAILS_PER_CALL
            )));
        }

        if self.set_duration_ms <= self.min_track_duration_ms {
            return Err(Error::Config(
                "scan.set_duration_ms must exceed scan.min_track_duration_ms".to_string(),
            ));
        }

        Ok(())
    }
}
