//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility — these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the Ollama endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the Ollama endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Non-2xx HTTP response from the endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// NDJSON stream parsing, transport, or server-reported mid-stream error.
    #[error("stream error: {reason}")]
    StreamError {
        reason: String,
    },

    /// A model list or model details body could not be decoded.
    #[error("invalid response: {reason}")]
    InvalidResponse {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// Whether Ollama reported that the requested model does not exist locally.
    ///
    /// Ollama answers `404` with `{"error":"model '…' not found"}` when a chat
    /// names a model that was never pulled.
    pub fn is_model_not_found(&self) -> bool {
        matches!(
            self,
            InferenceError::HttpError { status: 404, body } if body.contains("not found")
        )
    }

    /// Extract the error body text, if this is an `HttpError`.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            InferenceError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Map a `reqwest` send error onto the matching variant.
    pub(crate) fn from_send(endpoint: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout {
                duration_secs: timeout_secs,
            }
        } else {
            InferenceError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_model_not_found_true() {
        let err = InferenceError::HttpError {
            status: 404,
            body: r#"{"error":"model 'deepseek-r1:7b' not found"}"#.to_string(),
        };
        assert!(err.is_model_not_found());
    }

    #[test]
    fn test_is_model_not_found_false_different_status() {
        let err = InferenceError::HttpError {
            status: 500,
            body: "model not found".to_string(),
        };
        assert!(!err.is_model_not_found());
    }

    #[test]
    fn test_error_body_http_error() {
        let err = InferenceError::HttpError {
            status: 500,
            body: "test body".to_string(),
        };
        assert_eq!(err.error_body(), Some("test body"));
    }

    #[test]
    fn test_error_body_non_http() {
        let err = InferenceError::Timeout { duration_secs: 5 };
        assert!(err.error_body().is_none());
    }

    #[test]
    fn test_display_stream_error() {
        let err = InferenceError::StreamError {
            reason: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "stream error: connection reset");
    }
}
