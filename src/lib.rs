//! nowserving - Now-serving monitor and announcer for queue kiosks
//!
//! Polls the queue backend, shows which client each window is serving and
//! announces every newly called number with a chime followed by speech.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod announce;
pub mod audio;
pub mod backend;
pub mod board;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod monitor;
#[cfg(feature = "cli")]
pub mod systemd;
pub mod video;

// Composition root
#[cfg(feature = "cli")]
pub mod app;

// Core traits (poll → detect → announce)
pub use announce::{Announce, LocalSpeech};
pub use audio::{AudioOutput, OutputProvider};
pub use backend::MonitorBackend;
pub use video::VideoVolume;

// Pipeline
pub use announce::{AnnouncementReport, Announcer};
pub use monitor::{AnnouncementItem, MonitorController, MonitorSettings};

// Error handling
pub use error::{MonitorError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.0.1+abc1234"` when git hash is available, `"0.0.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
