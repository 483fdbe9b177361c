//! OpenAI-compatible chat-completion client (OpenRouter by default).

use crate::domain::ports::ModelClient;
use crate::utils::error::{DocumentError, EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-nemo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the model endpoint.
#[derive(Clone)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model_id: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model_id: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_id", &self.model_id)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct ChatCompletionClient {
    client: Client,
    url: String,
    api_key: String,
}

impl ChatCompletionClient {
    /// Fails when no credential is configured; that is a whole-run error
    /// raised before any document is touched.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "model.api_key".to_string(),
            })?
            .to_string();

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

fn transport_error(error: reqwest::Error) -> DocumentError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("could not connect: {}", error)
    } else {
        error.to_string()
    };
    DocumentError::ModelInvocation {
        message,
        status: error.status().map(|s| s.as_u16()),
    }
}

#[async_trait]
impl ModelClient for ChatCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        model_id: &str,
        temperature: f32,
    ) -> std::result::Result<String, DocumentError> {
        let body = ChatRequest {
            model: model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        tracing::debug!(
            "POST {} (model: {}, prompt: {} chars)",
            self.url,
            model_id,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(DocumentError::ModelInvocation {
                message: format!("endpoint returned {}: {}", status, message),
                status: Some(status.as_u16()),
            });
        }

        let completion: ChatResponse = response.json().await.map_err(transport_error)?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| DocumentError::invocation("model returned an empty completion"))?;

        tracing::debug!("completion received ({} chars)", content.chars().count());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config_for(server: &MockServer) -> ModelConfig {
        ModelConfig {
            endpoint: server.base_url(),
            api_key: Some("test-key".to_string()),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = ChatCompletionClient::new(&ModelConfig::default()).unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { .. }));

        let blank = ModelConfig {
            api_key: Some("   ".to_string()),
            ..ModelConfig::default()
        };
        assert!(ChatCompletionClient::new(&blank).is_err());
    }

    #[test]
    fn test_debug_output_redacts_credential() {
        let config = ModelConfig {
            api_key: Some("sk-secret".to_string()),
            ..ModelConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_url_joins_endpoint() {
        let config = ModelConfig {
            endpoint: "https://openrouter.ai/api/v1/".to_string(),
            api_key: Some("k".to_string()),
            ..ModelConfig::default()
        };
        let client = ChatCompletionClient::new(&config).unwrap();
        assert_eq!(client.url(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_returns_content() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("\"model\":\"mistralai/mistral-nemo\"")
                    .body_contains("\"temperature\":0.0")
                    .body_contains("\"role\":\"user\"");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "  {\"name\": \"Ada\"}  "}}]
                }));
            })
            .await;

        let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
        let text = client
            .complete("parse this", DEFAULT_MODEL, 0.0)
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(text, "{\"name\": \"Ada\"}");
    }

    #[tokio::test]
    async fn test_error_status_maps_to_invocation_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429)
                    .json_body(serde_json::json!({"error": {"message": "rate limited"}}));
            })
            .await;

        let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
        let err = client.complete("p", DEFAULT_MODEL, 0.0).await.unwrap_err();

        match err {
            DocumentError::ModelInvocation { message, status } => {
                assert_eq!(status, Some(429));
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_invocation_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(serde_json::json!({"choices": []}));
            })
            .await;

        let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
        let err = client.complete("p", DEFAULT_MODEL, 0.0).await.unwrap_err();
        assert!(matches!(err, DocumentError::ModelInvocation { .. }));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_invocation_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(serde_json::json!({"choices": []}));
            })
            .await;

        let config = ModelConfig {
            timeout: Duration::from_millis(200),
            ..config_for(&server)
        };
        let client = ChatCompletionClient::new(&config).unwrap();
        let err = client.complete("p", DEFAULT_MODEL, 0.0).await.unwrap_err();

        match err {
            DocumentError::ModelInvocation { message, .. } => {
                assert!(message.contains("timed out"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
