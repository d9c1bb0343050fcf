//! # Host Bridge Traits
//!
//! Abstractions the curation engine depends on but does not implement.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations
//! - [`CatalogService`](catalog::CatalogService) - Remote music catalog (artists, albums, playlists)
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations
//! should convert their own errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can sit behind
//! `Arc<dyn ...>` inside async tasks.

pub mod catalog;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use catalog::{
    AlbumKind, CatalogService, Page, PlaylistEntry, PlaylistTrack, RemoteAlbum, RemoteArtist,
    RemotePlaylist, RemoteTrack, RemoteUser, TrackDetail,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
