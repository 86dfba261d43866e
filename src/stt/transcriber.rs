//! The transcription seam.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One transcribed utterance, in seal order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Id of the utterance this text came from.
    pub utterance_id: u64,
    /// The transcribed text, trimmed.
    pub text: String,
}

/// Converts WAV-encoded audio to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes one utterance. Returns the raw text, which may be empty
    /// when the audio contained no recognizable speech.
    async fn transcribe(&self, wav_bytes: Vec<u8>, language: &str) -> Result<String>;

    /// Short human-readable backend name for status output.
    fn engine_name(&self) -> &str;
}

#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe(&self, wav_bytes: Vec<u8>, language: &str) -> Result<String> {
        (**self).transcribe(wav_bytes, language).await
    }

    fn engine_name(&self) -> &str {
        (**self).engine_name()
    }
}

/// Test doubles. Compiled unconditionally so integration tests can use them.
#[allow(clippy::unwrap_used)]
pub mod mock {
    use super::*;
    use crate::error::PerioError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A scripted transcriber for tests: returns queued responses in order.
    pub struct MockTranscriber {
        responses: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<(usize, String)>>,
    }

    impl MockTranscriber {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(self, text: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(text.to_string()));
            self
        }

        pub fn with_failure(self, message: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(PerioError::Transcription {
                    message: message.to_string(),
                }));
            self
        }

        /// (wav byte length, language) for each call, in order.
        pub fn calls(&self) -> Vec<(usize, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(&self, wav_bytes: Vec<u8>, language: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((wav_bytes.len(), language.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        fn engine_name(&self) -> &str {
            "mock"
        }
    }
}
