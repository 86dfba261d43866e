//! Session orchestration.
//!
//! Wires the capture thread to the transcription and merge stations:
//!
//!   capture thread -> [utterances] -> TranscriberStation
//!                  -> [transcripts] -> MergeStation -> chart
//!
//! The capture thread runs endpoint detection inline and seals utterances;
//! stations shut down by channel closure when the capture thread drops its
//! sender. The merge task's join handle yields the final chart.

use crate::audio::source::FrameSource;
use crate::chart::record::ChartRecord;
use crate::chart::store::ChartStore;
use crate::config::Config;
use crate::defaults;
use crate::error::{PerioError, Result};
use crate::extract::extractor::ChartExtractor;
use crate::pipeline::worker::{MergeStation, TranscriberStation};
use crate::segment::endpoint::{EndpointConfig, EndpointDetector, SpeechEvent};
use crate::segment::utterance::{Utterance, UtteranceBuffer, UtteranceBufferConfig};
use crate::stt::transcriber::Transcriber;
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything the session needs beyond its pluggable backends.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: EndpointConfig,
    pub buffer: UtteranceBufferConfig,
    pub sample_rate: u32,
    pub frame_samples: usize,
    pub language: String,
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
    pub quiet: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            buffer: UtteranceBufferConfig::default(),
            sample_rate: defaults::SAMPLE_RATE,
            frame_samples: defaults::FRAME_SAMPLES,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            queue_capacity: defaults::QUEUE_CAPACITY,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            quiet: false,
        }
    }
}

impl SessionConfig {
    /// Builds a session config from the app configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: EndpointConfig {
                policy: config.segmentation.policy,
                speech_threshold: config.segmentation.speech_threshold,
                silence_gap_ms: config.segmentation.gap_ms(),
                rolling_window: config.segmentation.rolling_window,
            },
            buffer: UtteranceBufferConfig {
                min_total_loudness: config.segmentation.min_utterance_loudness,
                min_frames: config.segmentation.min_utterance_frames,
            },
            sample_rate: config.audio.sample_rate,
            frame_samples: config.audio.frame_samples,
            language: config.transcription.language.clone(),
            queue_capacity: defaults::QUEUE_CAPACITY,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            quiet: false,
        }
    }
}

/// Handle for stopping a running session and inspecting how it ended.
#[derive(Clone)]
pub struct SessionHandle {
    running: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<PerioError>>>,
}

impl SessionHandle {
    /// Asks the capture thread to stop; in-flight audio is flushed and the
    /// stations drain before the session completes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The error that aborted capture, if any. A clean end (exhausted
    /// source or `stop()`) leaves this empty. Call after the merge task
    /// has resolved; a session that died on its audio device must not be
    /// mistaken for one that finished.
    pub fn take_failure(&self) -> Option<PerioError> {
        self.failure.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// A full charting session over one audio source.
pub struct ChartingSession {
    config: SessionConfig,
}

impl ChartingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Starts the session. Device errors surface here; once started, the
    /// session runs until the source is exhausted or the handle is stopped.
    /// Await the returned join handle for the final chart.
    pub fn start<T, E>(
        &self,
        mut source: Box<dyn FrameSource>,
        transcriber: Arc<T>,
        extractor: Arc<E>,
        store: ChartStore,
        initial: ChartRecord,
    ) -> Result<(SessionHandle, tokio::task::JoinHandle<ChartRecord>)>
    where
        T: Transcriber + ?Sized + 'static,
        E: ChartExtractor + ?Sized + 'static,
    {
        source.start()?;

        let (utterance_tx, utterance_rx) = mpsc::channel::<Utterance>(self.config.queue_capacity);
        let (transcript_tx, transcript_rx) = mpsc::channel(self.config.queue_capacity);

        let running = Arc::new(AtomicBool::new(true));
        let failure = Arc::new(Mutex::new(None));
        let handle = SessionHandle {
            running: running.clone(),
            failure: failure.clone(),
        };

        let capture_config = self.config.clone();
        std::thread::spawn(move || {
            capture_loop(source, capture_config, running, failure, utterance_tx);
        });

        let transcriber_station = TranscriberStation::new(
            transcriber,
            self.config.sample_rate,
            self.config.language.clone(),
            self.config.quiet,
        );
        tokio::spawn(transcriber_station.run(utterance_rx, transcript_tx));

        let merge_station = MergeStation::new(extractor, store, self.config.quiet);
        let merge_task = tokio::spawn(merge_station.run(transcript_rx, initial));

        Ok((handle, merge_task))
    }
}

/// The capture loop: reads samples, slices them into fixed frames, runs
/// endpoint detection, and seals utterances into the channel.
///
/// Runs on a dedicated OS thread; `blocking_send` applies backpressure
/// when transcription falls behind.
fn capture_loop(
    mut source: Box<dyn FrameSource>,
    config: SessionConfig,
    running: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<PerioError>>>,
    utterance_tx: mpsc::Sender<Utterance>,
) {
    let mut detector = EndpointDetector::new(config.endpoint);
    let mut buffer = UtteranceBuffer::new(config.buffer);
    let mut pending: Vec<i16> = Vec::new();
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    while running.load(Ordering::SeqCst) {
        let samples = match source.read_samples() {
            Ok(samples) => samples,
            Err(e) => {
                // Device failure is fatal: release the source, drain the
                // stations, and surface the error through the handle.
                eprintln!("{} audio source failed: {e}", "error:".red());
                if let Ok(mut slot) = failure.lock() {
                    *slot = Some(e);
                }
                break;
            }
        };
        let got_samples = !samples.is_empty();
        pending.extend(samples);

        while pending.len() >= config.frame_samples {
            let frame: Vec<i16> = pending.drain(..config.frame_samples).collect();
            match detector.observe(&frame) {
                Some(SpeechEvent::Started) | Some(SpeechEvent::Continuing) => {
                    buffer.append(&frame);
                }
                Some(SpeechEvent::Ended(_)) => {
                    if !send_sealed(&mut buffer, &utterance_tx, config.quiet) {
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                None => {}
            }
        }

        if source.is_exhausted() {
            break;
        }
        if !got_samples {
            std::thread::sleep(poll_interval);
        }
    }

    // Flush whatever was in flight when the loop stopped: a trailing
    // partial frame plus any unsealed utterance.
    if !pending.is_empty() && (detector.is_in_speech() || !buffer.is_empty()) {
        buffer.append(&pending);
    }
    if !buffer.is_empty() {
        send_sealed(&mut buffer, &utterance_tx, config.quiet);
    }

    if let Err(e) = source.stop() {
        eprintln!("{} failed to stop audio source: {e}", "warning:".yellow());
    }
    // Dropping the sender closes the channel and drains the stations.
}

/// Seals the buffer and sends the utterance if it was significant.
/// Returns false when the receiving side is gone.
fn send_sealed(
    buffer: &mut UtteranceBuffer,
    utterance_tx: &mpsc::Sender<Utterance>,
    quiet: bool,
) -> bool {
    let frames = buffer.frame_count();
    match buffer.seal() {
        Some(utterance) => {
            if !quiet {
                eprintln!(
                    "{} utterance {} sealed ({} frames)",
                    "capture".dimmed(),
                    utterance.id,
                    utterance.frame_count
                );
            }
            utterance_tx.blocking_send(utterance).is_ok()
        }
        None => {
            if !quiet && frames > 0 {
                eprintln!(
                    "{} discarded insignificant segment ({frames} frames)",
                    "capture".dimmed()
                );
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::ScriptedFrameSource;
    use crate::extract::extractor::mock::MockExtractor;
    use crate::stt::transcriber::mock::MockTranscriber;

    fn loud_samples(frames: usize) -> Vec<i16> {
        vec![3000i16; frames * defaults::FRAME_SAMPLES]
    }

    #[tokio::test]
    async fn test_session_over_finite_source_produces_chart() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChartStore::new(dir.path().join("chart_data.json"));

        let source = ScriptedFrameSource::new(loud_samples(20), defaults::FRAME_SAMPLES);
        let transcriber = Arc::new(
            MockTranscriber::new().with_response("tooth eight three two three"),
        );
        let extractor = Arc::new(
            MockExtractor::new().with_update_json(r#"{"teeth":{"8":{"pocket_depths":[3,2,3]}}}"#),
        );

        let session = ChartingSession::new(SessionConfig {
            quiet: true,
            ..Default::default()
        });
        let (_handle, merge_task) = session
            .start(
                Box::new(source),
                transcriber,
                extractor,
                store,
                ChartRecord::new(),
            )
            .unwrap();

        let chart = merge_task.await.unwrap();
        assert_eq!(chart.teeth[&8].pocket_depths, vec![3, 2, 3]);
    }

    #[tokio::test]
    async fn test_session_discards_insignificant_audio() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChartStore::new(dir.path().join("chart_data.json"));

        // Quiet audio never crosses the speech threshold: no utterances.
        let source = ScriptedFrameSource::new(
            vec![50i16; 20 * defaults::FRAME_SAMPLES],
            defaults::FRAME_SAMPLES,
        );
        let transcriber = Arc::new(MockTranscriber::new());
        let extractor = Arc::new(MockExtractor::new());

        let session = ChartingSession::new(SessionConfig {
            quiet: true,
            ..Default::default()
        });
        let (_handle, merge_task) = session
            .start(
                Box::new(source),
                transcriber.clone(),
                extractor,
                store,
                ChartRecord::new(),
            )
            .unwrap();

        let chart = merge_task.await.unwrap();
        assert!(chart.teeth.is_empty());
        assert!(transcriber.calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_start_fails_on_device_error() {
        use crate::audio::source::MockFrameSource;

        let dir = tempfile::tempdir().unwrap();
        let session = ChartingSession::new(SessionConfig::default());
        let result = session.start(
            Box::new(MockFrameSource::new().with_start_failure()),
            Arc::new(MockTranscriber::new()),
            Arc::new(MockExtractor::new()),
            ChartStore::new(dir.path().join("chart.json")),
            ChartRecord::new(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mid_session_read_failure_surfaces_on_handle() {
        use crate::audio::source::MockFrameSource;

        let dir = tempfile::tempdir().unwrap();
        let store = ChartStore::new(dir.path().join("chart_data.json"));

        let session = ChartingSession::new(SessionConfig {
            quiet: true,
            ..Default::default()
        });
        let (handle, merge_task) = session
            .start(
                Box::new(MockFrameSource::new().with_read_failure()),
                Arc::new(MockTranscriber::new()),
                Arc::new(MockExtractor::new()),
                store,
                ChartRecord::new(),
            )
            .unwrap();

        // The stations drain and the merge task still resolves...
        let chart = merge_task.await.unwrap();
        assert!(chart.teeth.is_empty());

        // ...but the device failure is reported, not swallowed.
        let failure = handle.take_failure().expect("read failure must surface");
        assert!(matches!(failure, PerioError::AudioCapture { .. }));
        // take_failure consumes the error
        assert!(handle.take_failure().is_none());
    }

    #[tokio::test]
    async fn test_clean_session_end_reports_no_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChartStore::new(dir.path().join("chart_data.json"));

        let source = ScriptedFrameSource::new(loud_samples(20), defaults::FRAME_SAMPLES);
        let session = ChartingSession::new(SessionConfig {
            quiet: true,
            ..Default::default()
        });
        let (handle, merge_task) = session
            .start(
                Box::new(source),
                Arc::new(MockTranscriber::new().with_response("tooth eight three")),
                Arc::new(MockExtractor::new()),
                store,
                ChartRecord::new(),
            )
            .unwrap();

        merge_task.await.unwrap();
        assert!(handle.take_failure().is_none());
    }

    #[tokio::test]
    async fn test_stop_handle_flushes_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChartStore::new(dir.path().join("chart_data.json"));

        let source = ScriptedFrameSource::new(loud_samples(20), defaults::FRAME_SAMPLES);
        let session = ChartingSession::new(SessionConfig {
            quiet: true,
            ..Default::default()
        });
        let (handle, merge_task) = session
            .start(
                Box::new(source),
                Arc::new(MockTranscriber::new().with_response("tooth four mobility two")),
                Arc::new(MockExtractor::new().with_update_json(r#"{"teeth":{"4":{"mobility":2}}}"#)),
                store,
                ChartRecord::new(),
            )
            .unwrap();

        handle.stop();
        assert!(!handle.is_running());

        let chart = merge_task.await.unwrap();
        // Depending on timing the stop lands before or after the audio is
        // consumed, but the session always completes cleanly.
        assert!(chart.teeth.is_empty() || chart.teeth[&4].mobility == Some(2));
    }
}
