//! Utterance buffering and the significance floor.

use crate::defaults;
use crate::segment::endpoint::rms;

/// One contiguous speech segment, sealed and ready for transcription.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Monotonic id, assigned in seal order.
    pub id: u64,
    /// Audio samples as 16-bit PCM.
    pub samples: Vec<i16>,
    /// Sum of per-frame RMS loudness across the segment.
    pub total_loudness: f32,
    /// Number of frames accumulated.
    pub frame_count: usize,
}

impl Utterance {
    /// Duration of this utterance in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u64 * 1000 / sample_rate as u64) as u32
    }
}

/// Configuration for the utterance buffer.
#[derive(Debug, Clone, Copy)]
pub struct UtteranceBufferConfig {
    /// Minimum cumulative loudness for a sealed segment to be significant.
    pub min_total_loudness: f32,
    /// Minimum frame count for a sealed segment.
    pub min_frames: usize,
}

impl Default for UtteranceBufferConfig {
    fn default() -> Self {
        Self {
            min_total_loudness: defaults::MIN_UTTERANCE_LOUDNESS,
            min_frames: defaults::MIN_UTTERANCE_FRAMES,
        }
    }
}

/// Accumulates frames belonging to one utterance.
///
/// Frames are appended from speech start through speech end; `seal`
/// either emits a significant utterance or discards the segment as noise.
pub struct UtteranceBuffer {
    config: UtteranceBufferConfig,
    samples: Vec<i16>,
    total_loudness: f32,
    frame_count: usize,
    next_id: u64,
}

impl UtteranceBuffer {
    pub fn new(config: UtteranceBufferConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            total_loudness: 0.0,
            frame_count: 0,
            next_id: 0,
        }
    }

    /// Appends one frame to the current segment.
    pub fn append(&mut self, frame: &[i16]) {
        if frame.is_empty() {
            return;
        }
        self.total_loudness += rms(frame);
        self.frame_count += 1;
        self.samples.extend_from_slice(frame);
    }

    /// Seals the current segment and clears the buffer for the next one.
    ///
    /// Returns `None` when the segment is empty, too short, or below the
    /// significance floor; such segments are dropped without error so that
    /// silence and noise never reach the transcription queue.
    pub fn seal(&mut self) -> Option<Utterance> {
        let samples = std::mem::take(&mut self.samples);
        let total_loudness = self.total_loudness;
        let frame_count = self.frame_count;
        self.total_loudness = 0.0;
        self.frame_count = 0;

        if frame_count < self.config.min_frames.max(1) {
            return None;
        }
        if total_loudness < self.config.min_total_loudness {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        Some(Utterance {
            id,
            samples,
            total_loudness,
            frame_count,
        })
    }

    /// True when no frames have been buffered since the last seal.
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Number of frames buffered so far.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}
