//! # Sync & Curation Module
//!
//! Incrementally scans followed-artist releases and source playlists, then
//! appends the curated tracks to destination playlists.
//!
//! ## Components
//!
//! - **Identity Cache** (`cache`): One arena per record kind, deduplicated by external ID
//! - **Pager** (`pagination`): Lazy, restartable traversal of paginated feeds
//! - **Artist Release Scanner** (`artist_scanner`): Releases inside the recency window, classified by playability and length
//! - **Playlist Track Scanner** (`playlist_scanner`): Recent playlist entries ranked by popularity and capped per playlist
//! - **Batch Writer** (`writer`): Chunked playlist appends
//! - **Watermarks** (`watermark`): The two-date file that makes runs incremental
//! - **Run Report** (`report`): Plain-text findings per run
//! - **Sync Coordinator** (`coordinator`): Sequences a run and owns its abort policy
//!
//! All state lives in a [`RunContext`] created per run; nothing survives it
//! except the watermark file.

pub mod artist_scanner;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod pagination;
pub mod playlist_scanner;
pub mod report;
pub mod run;
pub mod watermark;
pub mod writer;

pub use artist_scanner::{classify, ArtistReleaseScanner, ArtistScanStats, ReleaseWindow};
pub use cache::{Arena, IdentityCache};
pub use coordinator::SyncCoordinator;
pub use error::{Result, SyncError};
pub use model::{
    AlbumHandle, AlbumRecord, ArtistHandle, ArtistRecord, Bucket, CurationBuckets, Finding,
    Handle, PlaylistHandle, PlaylistRecord, TrackHandle, TrackOrigin, TrackRecord,
};
pub use pagination::{PageFuture, Pager};
pub use playlist_scanner::{parse_added_at, rank_and_bound, PlaylistScanStats, PlaylistTrackScanner};
pub use report::RunReport;
pub use run::{RunContext, RunId, RunOptions, RunPhase, RunSummary};
pub use watermark::{RunWatermark, RunWatermarkStore, Watermark};
pub use writer::{track_id_from_uri, PlaylistBatchWriter};
