//! Per-turn chat errors.
//!
//! None of these are fatal: [`ChatSession`](super::ChatSession) turns each one
//! into an assistant transcript entry and keeps accepting prompts.

use thiserror::Error;

use crate::inference::InferenceError;

use super::transcript::ReplyStatus;

/// Errors that end a single chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No local model identifier matches the requested family.
    #[error("{family} model is not available. {reason}")]
    ModelUnavailable { family: String, reason: String },

    /// The streamed call failed before generation completed.
    #[error("generation failed: {reason}")]
    StreamFailure { reason: String },

    /// The stream completed but left no visible answer.
    #[error("no content generated")]
    EmptyGeneration,
}

impl ChatError {
    /// The transcript status recorded for this error.
    pub fn status(&self) -> ReplyStatus {
        match self {
            ChatError::ModelUnavailable { .. } => ReplyStatus::ModelUnavailable,
            ChatError::StreamFailure { .. } => ReplyStatus::StreamFailure,
            ChatError::EmptyGeneration => ReplyStatus::EmptyGeneration,
        }
    }
}

impl From<InferenceError> for ChatError {
    fn from(e: InferenceError) -> Self {
        ChatError::StreamFailure {
            reason: e.to_string(),
        }
    }
}
