use crate::config::LlmConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Port to the language-model collaborator: prompt in, raw text out,
/// with an enforced call timeout. Implementations must never panic on
/// malformed model output; callers own the JSON parsing and fallbacks.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Chat-completions client for any OpenAI-compatible endpoint
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatCompletionsClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Service(format!("Failed to create LLM client: {e}")))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout: Duration::from_secs(self.config.timeout_secs),
                }
            } else {
                Error::LanguageModel(format!("Request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("LLM endpoint returned HTTP {}", status);
            return Err(Error::LanguageModel(format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LanguageModel(format!("Malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::LanguageModel("Empty choices in response".to_string()))?;

        debug!("LLM returned {} bytes", content.len());
        Ok(content)
    }
}

/// Strip markdown code fences so `serde_json` sees bare JSON. Models
/// routinely wrap JSON output in ```json blocks despite instructions.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[tokio::test]
    async fn completes_against_mock_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}}]
            })))
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::new(config).unwrap();
        let out = client.complete("system", "user").await.unwrap();
        assert_eq!(out, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn http_error_maps_to_language_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::new(config).unwrap();
        assert!(matches!(
            client.complete("s", "u").await,
            Err(Error::LanguageModel(_))
        ));
    }
}
