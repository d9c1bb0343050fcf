use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid date '{input}': {reason}")]
    DateParse { input: String, reason: String },

    #[error("Failed to fetch {feed}: {source}")]
    Pagination {
        feed: String,
        #[source]
        source: BridgeError,
    },

    #[error("Remote call {operation} failed: {source}")]
    Remote {
        operation: String,
        #[source]
        source: BridgeError,
    },

    #[error("Track detail lookup failed: {source}")]
    TrackDetails {
        #[source]
        source: BridgeError,
    },

    #[error("Failed to add tracks to playlist {playlist_id}: {source}")]
    RemoteWrite {
        playlist_id: String,
        #[source]
        source: BridgeError,
    },

    #[error("Skipping playlist entry {entry}: {reason}")]
    EntryParse { entry: String, reason: String },

    #[error("Malformed watermark file: {0}")]
    WatermarkFormat(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

impl SyncError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether the run may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::EntryParse { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
