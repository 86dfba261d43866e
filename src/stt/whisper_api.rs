//! Hosted Whisper transcription over the OpenAI-compatible audio API.

use crate::defaults;
use crate::error::{PerioError, Result};
use crate::stt::transcriber::Transcriber;
use async_trait::async_trait;
use reqwest::multipart;

/// Connection settings for the transcription endpoint.
#[derive(Debug, Clone)]
pub struct WhisperApiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl WhisperApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: defaults::API_BASE.to_string(),
            api_key: api_key.into(),
            model: defaults::TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

/// `Transcriber` backed by `POST {api_base}/audio/transcriptions`.
pub struct WhisperApiTranscriber {
    config: WhisperApiConfig,
    client: reqwest::Client,
}

impl WhisperApiTranscriber {
    pub fn new(config: WhisperApiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, wav_bytes: Vec<u8>, language: &str) -> Result<String> {
        let file_part = multipart::Part::bytes(wav_bytes)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| PerioError::Transcription {
                message: format!("failed to build upload part: {e}"),
            })?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("language", language.to_string())
            .text("response_format", "text");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PerioError::Transcription {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PerioError::Transcription {
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(PerioError::Transcription {
                message: format!("transcription API returned {status}: {body}"),
            });
        }

        Ok(body.trim().to_string())
    }

    fn engine_name(&self) -> &str {
        &self.config.model
    }
}
