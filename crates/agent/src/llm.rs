use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use leadscout_core::config::{LlmConfig, LlmProvider};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[async_trait]
impl<T> LlmClient for Box<T>
where
    T: LlmClient + ?Sized,
{
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        (**self).complete(system_prompt, user_prompt).await
    }
}

/// Failure of a single completion call.
#[derive(Debug, Error)]
enum CallError {
    #[error("llm request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("llm api error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CallError {
    /// Only failures that may clear up on their own are worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Other(_) => false,
        }
    }
}

/// Chat-completion client for the configured provider.
pub struct HttpLlmClient {
    provider: LlmProvider,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            provider: config.provider,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| anyhow!("llm api key is not configured"))
    }

    async fn call_once(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> std::result::Result<String, CallError> {
        let request = match self.provider {
            LlmProvider::OpenAi => self
                .client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(self.api_key()?)
                .json(&serde_json::json!({
                    "model": &self.model,
                    "temperature": 0.1,
                    "response_format": {"type": "json_object"},
                    "messages": [
                        {"role": "system", "content": system_prompt},
                        {"role": "user", "content": user_prompt}
                    ]
                })),
            LlmProvider::Anthropic => self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", self.api_key()?)
                .header("anthropic-version", "2023-06-01")
                .json(&serde_json::json!({
                    "model": &self.model,
                    "max_tokens": 1024,
                    "system": system_prompt,
                    "messages": [{"role": "user", "content": user_prompt}]
                })),
            LlmProvider::Ollama => self.client.post(format!("{}/api/chat", self.base_url)).json(
                &serde_json::json!({
                    "model": &self.model,
                    "stream": false,
                    "format": "json",
                    "messages": [
                        {"role": "system", "content": system_prompt},
                        {"role": "user", "content": user_prompt}
                    ]
                }),
            ),
        };

        let response = request.send().await.map_err(CallError::Transport)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Status { status, body });
        }

        let payload: serde_json::Value =
            response.json().await.context("llm response was not json")?;
        Ok(extract_text(self.provider, payload)?)
    }
}

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.call_once(system_prompt, user_prompt).await {
                Ok(text) => {
                    debug!(
                        event_name = "llm.completion.received",
                        provider = ?self.provider,
                        chars = text.len(),
                        "llm completion received"
                    );
                    return Ok(text);
                }
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "llm.completion.retry",
                        provider = ?self.provider,
                        attempt,
                        error = %error,
                        "llm call failed; retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com",
        LlmProvider::Anthropic => "https://api.anthropic.com",
        LlmProvider::Ollama => "http://localhost:11434",
    }
}

fn extract_text(provider: LlmProvider, payload: serde_json::Value) -> Result<String> {
    #[derive(Deserialize)]
    struct ChatMessage {
        content: Option<String>,
    }
    #[derive(Deserialize)]
    struct Choice {
        message: ChatMessage,
    }
    #[derive(Deserialize)]
    struct OpenAiResponse {
        choices: Vec<Choice>,
    }
    #[derive(Deserialize)]
    struct ContentBlock {
        text: Option<String>,
    }
    #[derive(Deserialize)]
    struct AnthropicResponse {
        content: Vec<ContentBlock>,
    }
    #[derive(Deserialize)]
    struct OllamaResponse {
        message: ChatMessage,
    }

    let text = match provider {
        LlmProvider::OpenAi => serde_json::from_value::<OpenAiResponse>(payload)?
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content),
        LlmProvider::Anthropic => serde_json::from_value::<AnthropicResponse>(payload)?
            .content
            .into_iter()
            .find_map(|block| block.text),
        LlmProvider::Ollama => serde_json::from_value::<OllamaResponse>(payload)?.message.content,
    };

    text.filter(|text| !text.trim().is_empty()).ok_or_else(|| anyhow!("llm returned no text"))
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use leadscout_core::config::LlmProvider;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{extract_text, CallError};

    fn status(code: StatusCode) -> CallError {
        CallError::Status { status: code, body: String::new() }
    }

    #[test]
    fn only_transient_failures_are_retried() {
        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(status(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(status(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());

        assert!(!status(StatusCode::BAD_REQUEST).is_retryable());
        assert!(!status(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!CallError::Other(anyhow!("llm returned no text")).is_retryable());
    }

    #[test]
    fn transport_errors_are_retried() {
        let error = reqwest::Client::new().get("not a url").build().expect_err("invalid url");
        assert!(CallError::Transport(error).is_retryable());
    }

    #[test]
    fn status_errors_keep_code_and_body() {
        let error = CallError::Status { status: StatusCode::UNAUTHORIZED, body: "bad key".to_string() };
        let message = anyhow::Error::from(error).to_string();
        assert!(message.contains("401"));
        assert!(message.contains("bad key"));
    }

    #[test]
    fn extracts_text_from_each_provider_shape() {
        let openai = json!({"choices": [{"message": {"content": "{\"titles\":[]}"}}]});
        let anthropic = json!({"content": [{"type": "text", "text": "hello"}]});
        let ollama = json!({"message": {"role": "assistant", "content": "hi"}});

        assert_eq!(extract_text(LlmProvider::OpenAi, openai).expect("openai"), "{\"titles\":[]}");
        assert_eq!(extract_text(LlmProvider::Anthropic, anthropic).expect("anthropic"), "hello");
        assert_eq!(extract_text(LlmProvider::Ollama, ollama).expect("ollama"), "hi");
    }

    #[test]
    fn empty_completion_is_an_error() {
        let payload = json!({"choices": [{"message": {"content": "  "}}]});
        assert!(extract_text(LlmProvider::OpenAi, payload).is_err());
    }
}
