//! Shared types for the inference client.
//!
//! These mirror Ollama's native HTTP API (`/api/tags`, `/api/show`,
//! `/api/chat`), used for both request building and response parsing.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Sampling options forwarded in the `options` object.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
}

/// Request body for `POST /api/show`.
#[derive(Debug, Clone, Serialize)]
pub struct ShowRequest {
    pub model: String,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Raw `GET /api/tags` response shape.
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Option<Vec<ModelSummary>>,
}

/// One locally available model, as listed by `/api/tags`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelSummary {
    /// Display name, e.g. `"deepseek-r1:1.5b"`.
    pub name: String,
    /// Model identifier used for chat calls. Older Ollama versions omit it.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub details: Option<ModelDetailsInfo>,
}

impl ModelSummary {
    /// The identifier to pass to `/api/chat`.
    pub fn identifier(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.name)
    }
}

/// `details` sub-object shared by `/api/tags` and `/api/show`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelDetailsInfo {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

/// Raw `POST /api/show` response, trimmed to what the client displays.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub details: Option<ModelDetailsInfo>,
    /// Modelfile `PARAMETER` lines; shown when `parameter_size` is missing.
    #[serde(default)]
    pub parameters: Option<String>,
}

/// One NDJSON line of a streamed `/api/chat` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseLine {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Present instead of `message` when the server fails mid-generation.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// The `message` object inside a chat response line.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
