//! Speech-to-text: the `Transcriber` seam and the hosted Whisper backend.

pub mod transcriber;
pub mod whisper_api;
