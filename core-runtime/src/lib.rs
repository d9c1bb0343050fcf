//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the binary and the engine:
//! - Configuration loading and validation
//! - Logging and tracing infrastructure

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, PlaylistLimit, PlaylistSource, ScanSettings};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
