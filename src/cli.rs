//! Command-line interface for periovox
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::segment::endpoint::SegmentationPolicy;

/// Voice-driven periodontal charting
#[derive(Parser, Debug)]
#[command(
    name = "periovox",
    version = crate::version_string(),
    about = "Voice-driven periodontal charting: speak findings, get a chart"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (the final chart is still printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-utterance detail, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device (e.g., hw:0)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Language code for transcription (e.g., en, de)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Segmentation policy override
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<PolicyArg>,

    /// Use the offline keyword extractor instead of the LLM backend
    #[arg(long)]
    pub keyword_extractor: bool,

    /// Chart a WAV file instead of the microphone
    #[arg(long, value_name = "PATH")]
    pub wav: Option<PathBuf>,

    /// Chart output path (default: chart_data.json)
    #[arg(long, value_name = "PATH")]
    pub chart: Option<PathBuf>,
}

/// Segmentation policy as a CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// End an utterance on any ~1.5s pause
    Pause,
    /// Require ~3s of sustained silence
    Sustained,
}

impl From<PolicyArg> for SegmentationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Pause => SegmentationPolicy::Pause,
            PolicyArg::Sustained => SegmentationPolicy::SustainedSilence,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommand actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default config file if none exists
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let cli = Cli::try_parse_from(["periovox"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.wav.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "periovox",
            "--device",
            "hw:1",
            "--language",
            "de",
            "--policy",
            "pause",
            "--chart",
            "/tmp/session.json",
        ])
        .unwrap();

        assert_eq!(cli.device.as_deref(), Some("hw:1"));
        assert_eq!(cli.language.as_deref(), Some("de"));
        assert_eq!(cli.policy, Some(PolicyArg::Pause));
        assert_eq!(cli.chart, Some(PathBuf::from("/tmp/session.json")));
    }

    #[test]
    fn test_parse_wav_mode_with_keyword_extractor() {
        let cli = Cli::try_parse_from([
            "periovox",
            "--wav",
            "exam.wav",
            "--keyword-extractor",
            "-q",
        ])
        .unwrap();

        assert_eq!(cli.wav, Some(PathBuf::from("exam.wav")));
        assert!(cli.keyword_extractor);
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["periovox", "devices"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Devices)));

        let cli = Cli::try_parse_from(["periovox", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_version_flag_reports_build_version() {
        let err = Cli::try_parse_from(["periovox", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        // The rendered version carries the git-stamped build string, not
        // just the bare crate version.
        assert!(err.to_string().contains(&crate::version_string()));
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["periovox", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_policy_maps_to_segmentation_policy() {
        assert_eq!(
            SegmentationPolicy::from(PolicyArg::Sustained),
            SegmentationPolicy::SustainedSilence
        );
        assert_eq!(
            SegmentationPolicy::from(PolicyArg::Pause),
            SegmentationPolicy::Pause
        );
    }
}
