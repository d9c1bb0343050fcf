//! Spotify Web API provider
//!
//! Implements [`bridge_traits::CatalogService`] on top of the platform
//! [`bridge_traits::HttpClient`].

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SpotifyConnector;
pub use error::{Result, SpotifyError};
