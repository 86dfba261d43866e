use crate::defaults;
use crate::error::{PerioError, Result};
use crate::segment::endpoint::SegmentationPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub segmentation: SegmentationConfig,
    pub transcription: TranscriptionConfig,
    pub extraction: ExtractionConfig,
    pub chart: ChartConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub frame_samples: usize,
}

/// Utterance segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    pub policy: SegmentationPolicy,
    pub speech_threshold: f32,
    /// Silence gap override in milliseconds; when unset, the policy's
    /// default gap applies.
    pub silence_gap_ms: Option<u32>,
    pub rolling_window: usize,
    pub min_utterance_loudness: f32,
    pub min_utterance_frames: usize,
}

impl SegmentationConfig {
    /// Effective silence gap: the override, or the policy default.
    pub fn gap_ms(&self) -> u32 {
        self.silence_gap_ms
            .unwrap_or_else(|| self.policy.default_gap_ms())
    }
}

/// Transcription backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub model: String,
    pub language: String,
    pub api_base: String,
}

/// Extraction backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionBackend {
    #[default]
    Llm,
    Keyword,
}

/// Structured extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub backend: ExtractionBackend,
    pub model: String,
}

/// Chart persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub path: PathBuf,
    /// Pre-populate all 32 teeth at session start instead of adding teeth
    /// as findings come in.
    pub preseed_full_arch: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_samples: defaults::FRAME_SAMPLES,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            policy: SegmentationPolicy::SustainedSilence,
            speech_threshold: defaults::SPEECH_THRESHOLD,
            silence_gap_ms: None,
            rolling_window: defaults::ROLLING_WINDOW,
            min_utterance_loudness: defaults::MIN_UTTERANCE_LOUDNESS,
            min_utterance_frames: defaults::MIN_UTTERANCE_FRAMES,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: defaults::TRANSCRIPTION_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            api_base: defaults::API_BASE.to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: ExtractionBackend::Llm,
            model: defaults::EXTRACTION_MODEL.to_string(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::CHART_FILE),
            preseed_full_arch: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PerioError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                PerioError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults only when
    /// the file does not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(PerioError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Rejects values that would make the pipeline misbehave silently.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(PerioError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.frame_samples == 0 {
            return Err(PerioError::ConfigInvalidValue {
                key: "audio.frame_samples".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.segmentation.speech_threshold <= 0.0 {
            return Err(PerioError::ConfigInvalidValue {
                key: "segmentation.speech_threshold".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.segmentation.gap_ms() == 0 {
            return Err(PerioError::ConfigInvalidValue {
                key: "segmentation.silence_gap_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.segmentation.rolling_window == 0 {
            return Err(PerioError::ConfigInvalidValue {
                key: "segmentation.rolling_window".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - PERIOVOX_AUDIO_DEVICE → audio.device
    /// - PERIOVOX_LANGUAGE → transcription.language
    /// - PERIOVOX_API_BASE → transcription.api_base
    /// - PERIOVOX_CHART_PATH → chart.path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("PERIOVOX_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(language) = std::env::var("PERIOVOX_LANGUAGE")
            && !language.is_empty()
        {
            self.transcription.language = language;
        }

        if let Ok(api_base) = std::env::var("PERIOVOX_API_BASE")
            && !api_base.is_empty()
        {
            self.transcription.api_base = api_base;
        }

        if let Ok(path) = std::env::var("PERIOVOX_CHART_PATH")
            && !path.is_empty()
        {
            self.chart.path = PathBuf::from(path);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/periovox/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("periovox").join("config.toml"))
    }

    /// Serializes the current configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PerioError::Other(format!("failed to serialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_periovox_env() {
        remove_env("PERIOVOX_AUDIO_DEVICE");
        remove_env("PERIOVOX_LANGUAGE");
        remove_env("PERIOVOX_API_BASE");
        remove_env("PERIOVOX_CHART_PATH");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.frame_samples, 1024);

        assert_eq!(config.segmentation.policy, SegmentationPolicy::SustainedSilence);
        assert_eq!(config.segmentation.speech_threshold, 500.0);
        assert_eq!(config.segmentation.gap_ms(), 3000);
        assert_eq!(config.segmentation.rolling_window, 3);

        assert_eq!(config.transcription.model, "whisper-1");
        assert_eq!(config.transcription.language, "en");

        assert_eq!(config.extraction.backend, ExtractionBackend::Llm);
        assert_eq!(config.chart.path, PathBuf::from("chart_data.json"));
        assert!(!config.chart.preseed_full_arch);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [audio]
            device = "hw:0,0"
            sample_rate = 16000

            [segmentation]
            policy = "pause"
            speech_threshold = 750.0

            [extraction]
            backend = "keyword"

            [chart]
            path = "/tmp/session.json"
            preseed_full_arch = true
        "#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audio.device, Some("hw:0,0".to_string()));
        assert_eq!(config.segmentation.policy, SegmentationPolicy::Pause);
        assert_eq!(config.segmentation.speech_threshold, 750.0);
        // Pause policy default gap applies when no override is given
        assert_eq!(config.segmentation.gap_ms(), 1500);
        assert_eq!(config.extraction.backend, ExtractionBackend::Keyword);
        assert_eq!(config.chart.path, PathBuf::from("/tmp/session.json"));
        assert!(config.chart.preseed_full_arch);
        // Untouched sections keep defaults
        assert_eq!(config.transcription.model, "whisper-1");
    }

    #[test]
    fn test_explicit_gap_overrides_policy_default() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[segmentation]\npolicy = \"pause\"\nsilence_gap_ms = 2000\n")
            .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.segmentation.gap_ms(), 2000);
    }

    #[test]
    fn test_load_missing_file_is_not_found_error() {
        let err = Config::load(Path::new("/nonexistent/periovox.toml")).unwrap_err();
        assert!(matches!(err, PerioError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_load_or_default_missing_file_is_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/periovox.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"this is not [ valid toml").unwrap();

        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[segmentation]\nspeech_threshold = 0.0\n")
            .unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, PerioError::ConfigInvalidValue { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_periovox_env();

        set_env("PERIOVOX_AUDIO_DEVICE", "usb-mic");
        set_env("PERIOVOX_LANGUAGE", "de");
        set_env("PERIOVOX_CHART_PATH", "/tmp/override.json");

        let config = Config::default().with_env_overrides();
        assert_eq!(config.audio.device, Some("usb-mic".to_string()));
        assert_eq!(config.transcription.language, "de");
        assert_eq!(config.chart.path, PathBuf::from("/tmp/override.json"));

        clear_periovox_env();
    }

    #[test]
    fn test_env_overrides_ignore_empty_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_periovox_env();

        set_env("PERIOVOX_LANGUAGE", "");

        let config = Config::default().with_env_overrides();
        assert_eq!(config.transcription.language, "en");

        clear_periovox_env();
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
