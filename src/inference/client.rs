//! Ollama inference client.
//!
//! Talks to a local Ollama server over its native HTTP API: model listing,
//! model inspection, and streamed chat.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client as HttpClient;

use super::config::AppConfig;
use super::errors::InferenceError;
use super::streaming::{parse_ndjson_stream, FragmentStream};
use super::types::{
    ChatMessage, ChatOptions, ChatRequest, ModelDetails, ModelSummary, ShowRequest, TagsResponse,
};

// ─── ChatBackend ─────────────────────────────────────────────────────────────

/// The narrow slice of the inference service the chat core consumes.
///
/// [`OllamaClient`] is the production implementation; tests substitute an
/// in-memory backend.
#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    /// Identifiers of all locally available models, in server order.
    async fn list_models(&self) -> Result<Vec<ModelSummary>, InferenceError>;

    /// Format, family, size and quantization details for one model.
    async fn show(&self, model: &str) -> Result<ModelDetails, InferenceError>;

    /// Open a streamed chat call and return its content fragments.
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, InferenceError>;
}

// ─── OllamaClient ────────────────────────────────────────────────────────────

/// Client for the local Ollama endpoint.
pub struct OllamaClient {
    /// HTTP client for listing and `show`.
    http: HttpClient,
    /// HTTP client for streamed chat (longer total timeout).
    http_stream: HttpClient,
    base_url: String,
    temperature: Option<f32>,
    request_timeout_secs: u64,
    stream_timeout_secs: u64,
}

impl OllamaClient {
    /// Build a client from the configuration. Does NOT check connectivity.
    pub fn new(config: &AppConfig) -> Result<Self, InferenceError> {
        let base_url = config.api_root().to_string();
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

        let http = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let http_stream = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .timeout(Duration::from_secs(config.stream_timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: base_url.clone(),
                reason: format!("failed to build streaming HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            http_stream,
            base_url,
            temperature: config.temperature,
            request_timeout_secs: config.request_timeout_secs,
            stream_timeout_secs: config.stream_timeout_secs,
        })
    }

    /// The endpoint root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn chat_request(&self, model: &str, messages: &[ChatMessage]) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            stream: true,
            options: self.temperature.map(|t| ChatOptions {
                temperature: Some(t),
            }),
        }
    }

    /// Turn a non-2xx response into `HttpError`.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(InferenceError::HttpError {
            status: status.as_u16(),
            body,
        })
    }
}

impl ChatBackend for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelSummary>, InferenceError> {
        let url = self.endpoint("/api/tags");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| InferenceError::from_send(&url, e, self.request_timeout_secs))?;
        let response = Self::check_status(response).await?;

        let tags: TagsResponse =
            response.json().await.map_err(|e| InferenceError::InvalidResponse {
                reason: format!("failed to parse model list: {e}"),
            })?;
        let models = tags.models.unwrap_or_default();
        tracing::debug!(count = models.len(), "listed local models");
        Ok(models)
    }

    async fn show(&self, model: &str) -> Result<ModelDetails, InferenceError> {
        let url = self.endpoint("/api/show");
        let response = self
            .http
            .post(&url)
            .json(&ShowRequest {
                model: model.to_string(),
            })
            .send()
            .await
            .map_err(|e| InferenceError::from_send(&url, e, self.request_timeout_secs))?;
        let response = Self::check_status(response).await?;

        response.json().await.map_err(|e| InferenceError::InvalidResponse {
            reason: format!("failed to parse model details: {e}"),
        })
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, InferenceError> {
        let url = self.endpoint("/api/chat");
        let body = self.chat_request(model, messages);

        // Log the request metadata (not the prompt text)
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            "=== CHAT REQUEST ==="
        );

        let response = self
            .http_stream
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::from_send(&url, e, self.stream_timeout_secs))?;
        let response = Self::check_status(response).await?;

        Ok(parse_ndjson_stream(response.bytes_stream()).boxed())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_trimmed_base_url() {
        let config = AppConfig {
            base_url: "http://127.0.0.1:11434/".into(),
            ..AppConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
        assert_eq!(client.endpoint("/api/chat"), "http://127.0.0.1:11434/api/chat");
    }

    #[test]
    fn test_chat_request_carries_temperature() {
        let config = AppConfig {
            temperature: Some(0.3),
            ..AppConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let req = client.chat_request("deepseek-r1:1.5b", &[ChatMessage::user("hi")]);
        assert!(req.stream);
        assert_eq!(req.options.unwrap().temperature, Some(0.3));
    }

    #[test]
    fn test_chat_request_without_temperature_has_no_options() {
        let client = OllamaClient::new(&AppConfig::default()).unwrap();
        let req = client.chat_request("llama3:latest", &[]);
        assert!(req.options.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_to_list() {
        // Port 9 (discard) on localhost is not an Ollama server.
        let config = AppConfig {
            base_url: "http://127.0.0.1:9".into(),
            connect_timeout_secs: 1,
            request_timeout_secs: 2,
            ..AppConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert!(client.list_models().await.is_err());
    }
}
