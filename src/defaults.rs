//! Default configuration constants for periovox.
//!
//! Shared across configuration types to keep the numbers in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and what the Whisper API
/// expects for voice input.
pub const SAMPLE_RATE: u32 = 16000;

/// Default frame size in samples (64ms at 16kHz).
pub const FRAME_SAMPLES: usize = 1024;

/// Default speech threshold in raw RMS units (0..32768).
///
/// A windowed RMS average at or above this counts as speech. Tuned for
/// typical close-mic dictation levels; raise it in noisy operatories.
pub const SPEECH_THRESHOLD: f32 = 500.0;

/// Silence gap (ms) for the pause segmentation policy.
///
/// Ends an utterance on any natural pause, giving low-latency partial
/// results at the cost of more, shorter segments.
pub const PAUSE_GAP_MS: u32 = 1500;

/// Silence gap (ms) for the sustained-silence segmentation policy.
///
/// Requires a longer quiet run before sealing, producing fewer and more
/// complete utterances.
pub const SUSTAINED_GAP_MS: u32 = 3000;

/// Number of recent loudness samples averaged by the endpoint detector.
///
/// A small odd count damps single-frame glitches without adding latency.
pub const ROLLING_WINDOW: usize = 3;

/// Minimum cumulative loudness (sum of per-frame RMS) for an utterance
/// to be worth transcribing. Segments below this are dropped as noise.
pub const MIN_UTTERANCE_LOUDNESS: f32 = 1000.0;

/// Minimum frame count for a sealed utterance. Guards against sealing
/// a segment too short to carry speech.
pub const MIN_UTTERANCE_FRAMES: usize = 8;

/// Lowest tooth number in the universal numbering system.
pub const TOOTH_MIN: u8 = 1;

/// Highest tooth number in the universal numbering system.
pub const TOOTH_MAX: u8 = 32;

/// Default transcription model.
pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default extraction model for the LLM backend.
pub const EXTRACTION_MODEL: &str = "gpt-4o-mini";

/// Default transcription language code.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default OpenAI-compatible API base URL.
pub const API_BASE: &str = "https://api.openai.com/v1";

/// Default chart output path, relative to the working directory.
pub const CHART_FILE: &str = "chart_data.json";

/// Capture thread polling interval when no samples are available (ms).
pub const POLL_INTERVAL_MS: u64 = 10;

/// Utterance queue capacity between capture and transcription.
pub const QUEUE_CAPACITY: usize = 64;
