//! The charting pipeline: capture thread, transcription and merge stations.

pub mod orchestrator;
pub mod worker;
