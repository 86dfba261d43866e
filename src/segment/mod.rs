//! Utterance segmentation: silence-based endpointing and buffering.

pub mod endpoint;
pub mod utterance;
