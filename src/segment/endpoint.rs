//! Silence-based endpoint detection.
//!
//! Turns a continuous stream of PCM frames into utterance boundaries:
//! a rolling-window loudness average decides when speech is present, and
//! a silence timer decides when an utterance has ended.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Segmentation policy: how much silence ends an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationPolicy {
    /// End an utterance on any sufficiently long pause (~1.5s). Low
    /// latency, more segments.
    Pause,
    /// Require a longer silence run (~3s). Fewer, more complete segments.
    SustainedSilence,
}

impl SegmentationPolicy {
    /// Default silence gap for this policy, in milliseconds.
    pub fn default_gap_ms(&self) -> u32 {
        match self {
            SegmentationPolicy::Pause => defaults::PAUSE_GAP_MS,
            SegmentationPolicy::SustainedSilence => defaults::SUSTAINED_GAP_MS,
        }
    }
}

/// Why an utterance was ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A pause long enough for the pause policy elapsed.
    Pause,
    /// A sustained silence run elapsed.
    SustainedSilence,
}

/// Events emitted by the endpoint detector, one per observed frame while an
/// utterance is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Speech has started; an utterance is now active.
    Started,
    /// The utterance is still active (speech, or silence shorter than the
    /// configured gap).
    Continuing,
    /// The silence gap elapsed; the utterance is complete.
    Ended(EndReason),
}

/// Configuration for endpoint detection.
#[derive(Debug, Clone, Copy)]
pub struct EndpointConfig {
    /// Segmentation policy (determines the end reason and the default gap).
    pub policy: SegmentationPolicy,
    /// Windowed RMS average at or above this counts as speech (raw i16 units).
    pub speech_threshold: f32,
    /// Silence duration before the utterance ends (milliseconds).
    pub silence_gap_ms: u32,
    /// Number of recent loudness samples to average.
    pub rolling_window: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::for_policy(SegmentationPolicy::SustainedSilence)
    }
}

impl EndpointConfig {
    /// Config for the given policy with that policy's default gap.
    pub fn for_policy(policy: SegmentationPolicy) -> Self {
        Self {
            policy,
            speech_threshold: defaults::SPEECH_THRESHOLD,
            silence_gap_ms: policy.default_gap_ms(),
            rolling_window: defaults::ROLLING_WINDOW,
        }
    }
}

/// Endpoint detector state machine.
///
/// O(1) per frame; runs inline in the capture loop.
pub struct EndpointDetector<C: Clock = SystemClock> {
    config: EndpointConfig,
    window: VecDeque<f32>,
    in_speech: bool,
    silence_start: Option<Instant>,
    clock: C,
}

impl<C: Clock> EndpointDetector<C> {
    /// Creates a detector with the given configuration and clock.
    pub fn with_clock(config: EndpointConfig, clock: C) -> Self {
        Self {
            config,
            window: VecDeque::with_capacity(config.rolling_window.max(1)),
            in_speech: false,
            silence_start: None,
            clock,
        }
    }

    /// Observes one frame and reports the utterance boundary state.
    ///
    /// Returns `None` while idle (no active utterance), `Started` on the
    /// silence-to-speech transition, `Continuing` while the utterance is
    /// active, and `Ended` once sub-threshold loudness has persisted for
    /// the configured gap.
    pub fn observe(&mut self, samples: &[i16]) -> Option<SpeechEvent> {
        let loudness = rms(samples);
        self.window.push_back(loudness);
        if self.window.len() > self.config.rolling_window.max(1) {
            self.window.pop_front();
        }
        let avg = self.window.iter().sum::<f32>() / self.window.len() as f32;

        if avg >= self.config.speech_threshold {
            // Any above-threshold window resets the silence timer
            self.silence_start = None;
            if self.in_speech {
                Some(SpeechEvent::Continuing)
            } else {
                self.in_speech = true;
                Some(SpeechEvent::Started)
            }
        } else if self.in_speech {
            let now = self.clock.now();
            let start = *self.silence_start.get_or_insert(now);
            let elapsed_ms = now.duration_since(start).as_millis() as u32;

            if elapsed_ms >= self.config.silence_gap_ms {
                self.in_speech = false;
                self.silence_start = None;
                self.window.clear();
                Some(SpeechEvent::Ended(self.end_reason()))
            } else {
                Some(SpeechEvent::Continuing)
            }
        } else {
            None
        }
    }

    fn end_reason(&self) -> EndReason {
        match self.config.policy {
            SegmentationPolicy::Pause => EndReason::Pause,
            SegmentationPolicy::SustainedSilence => EndReason::SustainedSilence,
        }
    }

    /// True while an utterance is active (speech, or timing its silence gap).
    pub fn is_in_speech(&self) -> bool {
        self.in_speech
    }

    /// Resets the detector to idle.
    pub fn reset(&mut self) {
        self.window.clear();
        self.in_speech = false;
        self.silence_start = None;
    }
}

impl EndpointDetector<SystemClock> {
    /// Creates a detector with the given configuration and the system clock.
    pub fn new(config: EndpointConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

/// Root-mean-square loudness of a frame, in raw i16 amplitude units
/// (0 for silence, up to 32768 for a full-scale square wave).
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let s = sample as f64;
            s * s
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock clock for testing that allows manual time advancement.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        current: Arc<Mutex<Instant>>,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self {
                current: Arc::new(Mutex::new(Instant::now())),
            }
        }

        pub fn advance(&self, duration: Duration) {
            let mut current = self.current.lock().unwrap();
            *current += duration;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.current.lock().unwrap()
        }
    }

    fn make_silence(count: usize) -> Vec<i16> {
        vec![0i16; count]
    }

    fn make_speech(count: usize, amplitude: i16) -> Vec<i16> {
        vec![amplitude; count]
    }

    fn test_config() -> EndpointConfig {
        EndpointConfig {
            policy: SegmentationPolicy::SustainedSilence,
            speech_threshold: 500.0,
            silence_gap_ms: 3000,
            rolling_window: 3,
        }
    }

    #[test]
    fn test_rms_silence_is_zero() {
        assert_eq!(rms(&make_silence(1000)), 0.0);
    }

    #[test]
    fn test_rms_constant_amplitude() {
        let rms_value = rms(&make_speech(1000, 3000));
        assert!(
            (rms_value - 3000.0).abs() < 1.0,
            "RMS of constant 3000 should be ~3000, got {}",
            rms_value
        );
    }

    #[test]
    fn test_rms_negative_samples_match_positive() {
        let pos = rms(&make_speech(1000, 2000));
        let neg = rms(&make_speech(1000, -2000));
        assert!((pos - neg).abs() < 0.01);
    }

    #[test]
    fn test_rms_empty_samples() {
        let empty: Vec<i16> = vec![];
        assert_eq!(rms(&empty), 0.0);
    }

    #[test]
    fn test_detector_idle_on_silence() {
        let mut detector = EndpointDetector::new(test_config());
        for _ in 0..10 {
            assert_eq!(detector.observe(&make_silence(1024)), None);
        }
        assert!(!detector.is_in_speech());
    }

    #[test]
    fn test_detector_emits_started_on_speech() {
        let mut detector = EndpointDetector::new(test_config());

        assert_eq!(detector.observe(&make_silence(1024)), None);

        let event = detector.observe(&make_speech(1024, 3000));
        assert_eq!(event, Some(SpeechEvent::Started));
        assert!(detector.is_in_speech());

        let event = detector.observe(&make_speech(1024, 3000));
        assert_eq!(event, Some(SpeechEvent::Continuing));
    }

    #[test]
    fn test_detector_single_quiet_frame_does_not_flap() {
        // With a window of 3, one quiet frame between loud frames keeps
        // the average above threshold and must not start the silence timer.
        let clock = MockClock::new();
        let mut detector = EndpointDetector::with_clock(test_config(), clock.clone());

        detector.observe(&make_speech(1024, 3000));
        detector.observe(&make_speech(1024, 3000));

        // One glitch frame: window average is (3000+3000+0)/3 = 2000
        let event = detector.observe(&make_silence(1024));
        assert_eq!(event, Some(SpeechEvent::Continuing));
        assert!(detector.silence_start.is_none());
    }

    #[test]
    fn test_detector_never_ends_before_gap() {
        let clock = MockClock::new();
        let mut detector = EndpointDetector::with_clock(test_config(), clock.clone());

        detector.observe(&make_speech(1024, 3000));

        // Silence frames: the windowed average only drops below threshold
        // once the loud frame leaves the window, and the gap is measured
        // from that point. Never Ended before it elapses.
        for _ in 0..10 {
            clock.advance(Duration::from_millis(250));
            let event = detector.observe(&make_silence(1024));
            assert_eq!(event, Some(SpeechEvent::Continuing));
        }

        // Timer started at 750ms (third silence frame); cross the 3s gap
        clock.advance(Duration::from_millis(1300));
        let event = detector.observe(&make_silence(1024));
        assert_eq!(
            event,
            Some(SpeechEvent::Ended(EndReason::SustainedSilence))
        );
        assert!(!detector.is_in_speech());
    }

    #[test]
    fn test_detector_speech_resets_silence_timer() {
        let clock = MockClock::new();
        let mut detector = EndpointDetector::with_clock(test_config(), clock.clone());

        detector.observe(&make_speech(1024, 3000));

        // Fill the window with silence so the average drops
        clock.advance(Duration::from_millis(100));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        clock.advance(Duration::from_millis(2000));
        assert_eq!(
            detector.observe(&make_silence(1024)),
            Some(SpeechEvent::Continuing)
        );

        // Speech resumes: timer resets
        detector.observe(&make_speech(1024, 3000));
        detector.observe(&make_speech(1024, 3000));
        assert!(detector.silence_start.is_none());

        // A fresh full gap is required before Ended
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        clock.advance(Duration::from_millis(2900));
        assert_eq!(
            detector.observe(&make_silence(1024)),
            Some(SpeechEvent::Continuing)
        );
        clock.advance(Duration::from_millis(200));
        assert!(matches!(
            detector.observe(&make_silence(1024)),
            Some(SpeechEvent::Ended(_))
        ));
    }

    #[test]
    fn test_detector_pause_policy_end_reason() {
        let clock = MockClock::new();
        let config = EndpointConfig::for_policy(SegmentationPolicy::Pause);
        assert_eq!(config.silence_gap_ms, 1500);

        let mut detector = EndpointDetector::with_clock(config, clock.clone());
        detector.observe(&make_speech(1024, 3000));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        clock.advance(Duration::from_millis(1600));
        assert_eq!(
            detector.observe(&make_silence(1024)),
            Some(SpeechEvent::Ended(EndReason::Pause))
        );
    }

    #[test]
    fn test_detector_ready_for_next_utterance_after_end() {
        let clock = MockClock::new();
        let mut detector = EndpointDetector::with_clock(test_config(), clock.clone());

        detector.observe(&make_speech(1024, 3000));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        detector.observe(&make_silence(1024));
        clock.advance(Duration::from_millis(3100));
        assert!(matches!(
            detector.observe(&make_silence(1024)),
            Some(SpeechEvent::Ended(_))
        ));

        // Idle again, then a new utterance starts cleanly
        assert_eq!(detector.observe(&make_silence(1024)), None);
        assert_eq!(
            detector.observe(&make_speech(1024, 3000)),
            Some(SpeechEvent::Started)
        );
    }

    #[test]
    fn test_detector_reset() {
        let mut detector = EndpointDetector::new(test_config());
        detector.observe(&make_speech(1024, 3000));
        assert!(detector.is_in_speech());

        detector.reset();
        assert!(!detector.is_in_speech());
        assert_eq!(
            detector.observe(&make_speech(1024, 3000)),
            Some(SpeechEvent::Started)
        );
    }

    #[test]
    fn test_policy_default_gaps() {
        assert_eq!(SegmentationPolicy::Pause.default_gap_ms(), 1500);
        assert_eq!(SegmentationPolicy::SustainedSilence.default_gap_ms(), 3000);
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&SegmentationPolicy::SustainedSilence).unwrap();
        assert_eq!(json, "\"sustained_silence\"");
        let parsed: SegmentationPolicy = serde_json::from_str("\"pause\"").unwrap();
        assert_eq!(parsed, SegmentationPolicy::Pause);
    }
}
