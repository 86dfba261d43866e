//! Charting application entry point.
//!
//! Orchestrates the complete flow:
//! capture -> segment -> transcribe -> extract -> merge -> persist

use crate::audio::source::FrameSource;
use crate::audio::wav::WavFrameSource;
use crate::chart::record::ChartRecord;
use crate::chart::store::ChartStore;
use crate::cli::Cli;
use crate::config::{Config, ExtractionBackend};
use crate::error::{PerioError, Result};
use crate::extract::extractor::ChartExtractor;
use crate::extract::keyword::KeywordExtractor;
use crate::extract::llm::{LlmExtractor, LlmExtractorConfig};
use crate::pipeline::orchestrator::{ChartingSession, SessionConfig};
use crate::stt::transcriber::Transcriber;
use crate::stt::whisper_api::{WhisperApiConfig, WhisperApiTranscriber};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::sync::Arc;

/// Runs one charting session: capture audio until the source ends or
/// Ctrl+C, then print the final chart as JSON on stdout.
pub async fn run_chart_command(mut config: Config, cli: &Cli) -> Result<()> {
    apply_cli_overrides(&mut config, cli);

    let store = ChartStore::new(config.chart.path.clone());
    let initial = if config.chart.preseed_full_arch {
        ChartRecord::full_arch()
    } else {
        ChartRecord::new()
    };

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        return Err(PerioError::ConfigInvalidValue {
            key: "OPENAI_API_KEY".to_string(),
            message: "environment variable must be set for transcription".to_string(),
        });
    }

    let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperApiTranscriber::new(WhisperApiConfig {
        api_base: config.transcription.api_base.clone(),
        api_key: api_key.clone(),
        model: config.transcription.model.clone(),
    }));

    let extractor: Arc<dyn ChartExtractor> = match config.extraction.backend {
        ExtractionBackend::Keyword => Arc::new(KeywordExtractor::new()),
        ExtractionBackend::Llm => Arc::new(LlmExtractor::new(LlmExtractorConfig {
            api_base: config.transcription.api_base.clone(),
            api_key,
            model: config.extraction.model.clone(),
        })),
    };

    let (source, live) = open_source(&config, cli)?;

    if !cli.quiet {
        eprintln!(
            "{} transcription={} extraction={} chart={}",
            "periovox".bold(),
            config.transcription.model,
            extractor.backend_name(),
            store.path().display()
        );
        if cli.verbose >= 1 {
            eprintln!(
                "{} policy={:?} threshold={} gap={}ms window={}",
                "segmentation".dimmed(),
                config.segmentation.policy,
                config.segmentation.speech_threshold,
                config.segmentation.gap_ms(),
                config.segmentation.rolling_window
            );
        }
        if live {
            eprintln!("{}", "listening... press Ctrl+C to finish".dimmed());
        }
    }

    let mut session_config = SessionConfig::from_config(&config);
    session_config.quiet = cli.quiet;

    let session = ChartingSession::new(session_config);
    let (handle, merge_task) = session.start(source, transcriber, extractor, store, initial)?;

    if live {
        // Run until interrupted, then flush whatever is in flight.
        if tokio::signal::ctrl_c().await.is_ok() {
            if !cli.quiet {
                eprintln!("{}", "stopping...".dimmed());
            }
            handle.stop();
        }
    }

    let chart = merge_task.await.map_err(|e| {
        PerioError::Other(format!("charting pipeline task failed: {e}"))
    })?;

    // A capture failure ends the session the same way a clean stop does
    // (drain, persist what was merged), but it must not exit as success.
    if let Some(err) = handle.take_failure() {
        return Err(err);
    }

    if !cli.quiet {
        eprintln!(
            "{} {} teeth charted",
            "done:".green().bold(),
            chart.charted_teeth()
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&chart)
            .map_err(|e| PerioError::Other(format!("failed to render chart: {e}")))?
    );

    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(language) = &cli.language {
        config.transcription.language = language.clone();
    }
    if let Some(policy) = cli.policy {
        config.segmentation.policy = policy.into();
    }
    if cli.keyword_extractor {
        config.extraction.backend = ExtractionBackend::Keyword;
    }
    if let Some(chart) = &cli.chart {
        config.chart.path = chart.clone();
    }
}

/// Opens the audio source. Returns the source and whether it is live
/// (microphone) as opposed to a finite file or stream.
fn open_source(config: &Config, cli: &Cli) -> Result<(Box<dyn FrameSource>, bool)> {
    if let Some(path) = &cli.wav {
        return Ok((Box::new(WavFrameSource::from_path(path)?), false));
    }
    if !std::io::stdin().is_terminal() {
        // Pipe mode: stdin carries WAV data
        return Ok((Box::new(WavFrameSource::from_stdin()?), false));
    }

    #[cfg(feature = "cpal-audio")]
    {
        use crate::audio::capture::CpalFrameSource;
        let source = CpalFrameSource::new(config.audio.device.as_deref())?;
        Ok((Box::new(source), true))
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = config;
        Err(PerioError::AudioCapture {
            message: "built without microphone support; use --wav or pipe WAV data".to_string(),
        })
    }
}
