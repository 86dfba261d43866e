//! periovox - Voice-driven periodontal charting
//!
//! Listens to a dentist narrating an examination, segments the speech into
//! utterances, transcribes them, extracts structured findings, and merges
//! them into a cumulative chart.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod chart;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod segment;
pub mod stt;

// Core seams (source -> transcribe -> extract -> merge)
pub use audio::source::FrameSource;
pub use extract::extractor::ChartExtractor;
pub use stt::transcriber::Transcriber;

// Pipeline
pub use pipeline::orchestrator::{ChartingSession, SessionConfig, SessionHandle};

// Chart data model
pub use chart::record::{ChartRecord, ChartUpdate, ToothRecord, ToothUpdate};

// Error handling
pub use error::{PerioError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
