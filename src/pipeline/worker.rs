//! Transcription and merge stations.
//!
//! Each station owns one end of an mpsc channel and runs until its input
//! closes. A single transcription worker keeps transcripts in seal order;
//! the merge station is the only writer of the chart record.

use crate::audio::wav::encode_wav;
use crate::chart::merger::ChartMerger;
use crate::chart::record::ChartRecord;
use crate::chart::store::ChartStore;
use crate::extract::extractor::ChartExtractor;
use crate::segment::utterance::Utterance;
use crate::stt::transcriber::{Transcriber, Transcript};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transcribes sealed utterances one at a time, preserving order.
pub struct TranscriberStation<T: Transcriber + ?Sized> {
    transcriber: Arc<T>,
    sample_rate: u32,
    language: String,
    quiet: bool,
}

impl<T: Transcriber + ?Sized + 'static> TranscriberStation<T> {
    pub fn new(transcriber: Arc<T>, sample_rate: u32, language: String, quiet: bool) -> Self {
        Self {
            transcriber,
            sample_rate,
            language,
            quiet,
        }
    }

    /// Receives utterances, transcribes them sequentially, and forwards
    /// non-empty transcripts. A failed or empty transcription drops that
    /// utterance and the station keeps going.
    pub async fn run(self, mut input: mpsc::Receiver<Utterance>, output: mpsc::Sender<Transcript>) {
        while let Some(utterance) = input.recv().await {
            let wav_bytes = match encode_wav(&utterance.samples, self.sample_rate) {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!(
                        "{} failed to encode utterance {}: {e}",
                        "warning:".yellow(),
                        utterance.id
                    );
                    continue;
                }
            };

            if !self.quiet {
                eprintln!(
                    "{} utterance {} ({} ms) -> {}",
                    "transcribing".dimmed(),
                    utterance.id,
                    utterance.duration_ms(self.sample_rate),
                    self.transcriber.engine_name()
                );
            }

            let text = match self.transcriber.transcribe(wav_bytes, &self.language).await {
                Ok(text) => text,
                Err(e) => {
                    eprintln!(
                        "{} transcription of utterance {} failed: {e}",
                        "warning:".yellow(),
                        utterance.id
                    );
                    continue;
                }
            };

            if text.trim().is_empty() {
                if !self.quiet {
                    eprintln!("{} utterance {} had no speech", "skipped".dimmed(), utterance.id);
                }
                continue;
            }

            let transcript = Transcript {
                utterance_id: utterance.id,
                text: text.trim().to_string(),
            };
            if output.send(transcript).await.is_err() {
                // Downstream is gone; nothing left to do.
                break;
            }
        }
    }
}

/// Extracts findings from each transcript and merges them into the chart.
pub struct MergeStation<E: ChartExtractor + ?Sized> {
    extractor: Arc<E>,
    merger: ChartMerger,
    store: ChartStore,
    quiet: bool,
}

impl<E: ChartExtractor + ?Sized + 'static> MergeStation<E> {
    pub fn new(extractor: Arc<E>, store: ChartStore, quiet: bool) -> Self {
        Self {
            extractor,
            merger: ChartMerger::new(),
            store,
            quiet,
        }
    }

    /// Receives transcripts until the channel closes, then returns the
    /// final chart. The chart snapshot on disk is rewritten after every
    /// merge that changed it; extraction failures skip that transcript.
    pub async fn run(
        self,
        mut input: mpsc::Receiver<Transcript>,
        mut chart: ChartRecord,
    ) -> ChartRecord {
        while let Some(transcript) = input.recv().await {
            if !self.quiet {
                eprintln!("{} {}", ">".green().bold(), transcript.text.green());
            }

            let update = match self.extractor.extract(&transcript.text).await {
                Ok(update) => update,
                Err(e) => {
                    eprintln!(
                        "{} extraction for utterance {} failed: {e}",
                        "warning:".yellow(),
                        transcript.utterance_id
                    );
                    continue;
                }
            };

            if update.is_empty() {
                if !self.quiet {
                    eprintln!("{}", "  (nothing chartable)".dimmed());
                }
                continue;
            }

            let outcome = self.merger.merge(&mut chart, &update);
            for note in &outcome.skipped {
                eprintln!("{} {note}", "warning:".yellow());
            }

            if outcome.changed() {
                if !self.quiet {
                    let teeth: Vec<String> =
                        outcome.applied_teeth.iter().map(|t| t.to_string()).collect();
                    eprintln!("{} tooth {}", "  updated".cyan(), teeth.join(", "));
                }
                if let Err(e) = self.store.save(&chart) {
                    eprintln!("{} failed to persist chart: {e}", "warning:".yellow());
                }
            }
        }

        chart
    }
}
