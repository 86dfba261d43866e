//! LLM-backed extraction over the chat completions API.

use crate::chart::record::ChartUpdate;
use crate::defaults;
use crate::error::{PerioError, Result};
use crate::extract::extractor::{parse_update, ChartExtractor};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// The system prompt that constrains model output to chart-update JSON.
const SYSTEM_INSTRUCTIONS: &str = r#"You are a dental charting assistant. The user message is one utterance spoken by a dentist during a periodontal examination. Extract any chartable findings and respond with ONLY a JSON object of this shape:

{"teeth": {"<tooth number>": {"pocket_depths": [..], "gingival_margin": [..], "bleeding": "<surface>", "mobility": <0-3>, "furcation_involvement": "<class>"}}}

Rules:
- Tooth numbers use the Universal Numbering System (1-32).
- Include ONLY fields the utterance explicitly states. Never guess or carry over values from earlier context.
- Normalize spoken numbers to integers ("three two three" -> [3, 2, 3]).
- pocket_depths and gingival_margin are millimeter lists in spoken order.
- If the utterance contains nothing chartable, respond with {}.
- Respond with raw JSON only. No prose, no code fences."#;

/// Connection settings for the extraction model.
#[derive(Debug, Clone)]
pub struct LlmExtractorConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl LlmExtractorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: defaults::API_BASE.to_string(),
            api_key: api_key.into(),
            model: defaults::EXTRACTION_MODEL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// `ChartExtractor` backed by `POST {api_base}/chat/completions`.
pub struct LlmExtractor {
    config: LlmExtractorConfig,
    client: reqwest::Client,
}

impl LlmExtractor {
    pub fn new(config: LlmExtractorConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChartExtractor for LlmExtractor {
    async fn extract(&self, transcript: &str) -> Result<ChartUpdate> {
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": SYSTEM_INSTRUCTIONS},
                {"role": "user", "content": transcript},
            ],
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PerioError::Extraction {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PerioError::Extraction {
                message: format!("extraction API returned {status}: {body}"),
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| PerioError::Extraction {
                message: format!("malformed API response: {e}"),
            })?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("");

        parse_update(content)
    }

    fn backend_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let mut config = LlmExtractorConfig::new("key");
        config.api_base = "https://api.openai.com/v1/".to_string();

        let extractor = LlmExtractor::new(config);
        assert_eq!(
            extractor.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_chat_response_shape_parses() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{}"));
    }

    #[test]
    fn test_system_prompt_demands_raw_json() {
        assert!(SYSTEM_INSTRUCTIONS.contains("ONLY a JSON object"));
        assert!(SYSTEM_INSTRUCTIONS.contains("1-32"));
    }
}
