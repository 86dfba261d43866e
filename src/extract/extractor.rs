//! The extraction seam and shared response parsing.

use crate::chart::record::ChartUpdate;
use crate::error::{PerioError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns one transcript line into a sparse chart update.
#[async_trait]
pub trait ChartExtractor: Send + Sync {
    /// Extracts structured findings from `transcript`. An empty update is
    /// the normal result for text with nothing chartable in it.
    async fn extract(&self, transcript: &str) -> Result<ChartUpdate>;

    /// Short human-readable backend name for status output.
    fn backend_name(&self) -> &str;
}

#[async_trait]
impl<T: ChartExtractor + ?Sized> ChartExtractor for Arc<T> {
    async fn extract(&self, transcript: &str) -> Result<ChartUpdate> {
        (**self).extract(transcript).await
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}

/// Strips a Markdown code fence from model output, if present.
///
/// Models wrap JSON in ```json fences often enough that parsing must
/// tolerate it.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses model output into a `ChartUpdate`, tolerating code fences.
pub fn parse_update(text: &str) -> Result<ChartUpdate> {
    let json = strip_code_fences(text);
    if json.is_empty() {
        return Ok(ChartUpdate::default());
    }
    serde_json::from_str(json).map_err(|e| PerioError::Extraction {
        message: format!("model returned unparseable JSON: {e}"),
    })
}

/// Test doubles. Compiled unconditionally so integration tests can use them.
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One scripted extractor response.
    pub enum MockStep {
        Update(ChartUpdate),
        Fail(String),
    }

    /// A scripted extractor for tests: returns queued steps in order,
    /// falling back to empty updates once the script runs out.
    pub struct MockExtractor {
        script: Mutex<VecDeque<MockStep>>,
        transcripts: Mutex<Vec<String>>,
    }

    impl MockExtractor {
        pub fn new() -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                transcripts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_update_json(self, json: &str) -> Self {
            let update = serde_json::from_str(json).expect("valid update json");
            self.script
                .lock()
                .unwrap()
                .push_back(MockStep::Update(update));
            self
        }

        pub fn with_failure(self, message: &str) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back(MockStep::Fail(message.to_string()));
            self
        }

        /// The transcripts this extractor was asked about, in order.
        pub fn transcripts(&self) -> Vec<String> {
            self.transcripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChartExtractor for MockExtractor {
        async fn extract(&self, transcript: &str) -> Result<ChartUpdate> {
            self.transcripts.lock().unwrap().push(transcript.to_string());
            match self.script.lock().unwrap().pop_front() {
                Some(MockStep::Update(update)) => Ok(update),
                Some(MockStep::Fail(message)) => Err(PerioError::Extraction { message }),
                None => Ok(ChartUpdate::default()),
            }
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }
}
