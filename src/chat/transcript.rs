//! Transcript — the ordered, append-only history of one chat session.

use serde::Serialize;

use crate::inference::ChatMessage;

use super::errors::ChatError;
use super::reconciler::Extraction;

/// Shown in place of an answer when the model produced no visible text.
pub const NO_CONTENT_SENTINEL: &str = "🤖 No response generated.";

/// How an assistant entry came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Complete,
    ModelUnavailable,
    StreamFailure,
    EmptyGeneration,
}

/// A prompt as the user typed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserEntry {
    pub content: String,
    pub timestamp: String,
}

impl UserEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A finalized assistant reply.
///
/// `response` never contains reasoning markers; `think` is never blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantEntry {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<String>,
    /// Model that produced the reply; `None` when no model was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: ReplyStatus,
    pub timestamp: String,
}

impl AssistantEntry {
    /// Entry for a completed stream. An empty answer becomes the sentinel.
    pub fn from_extraction(extraction: Extraction, model: &str) -> Self {
        let (response, status) = if extraction.response.is_empty() {
            (
                NO_CONTENT_SENTINEL.to_string(),
                ChatError::EmptyGeneration.status(),
            )
        } else {
            (extraction.response, ReplyStatus::Complete)
        };
        Self {
            response,
            think: extraction.think,
            model: Some(model.to_string()),
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Entry describing a failed turn. Never carries reasoning.
    pub fn from_error(err: &ChatError, model: Option<&str>) -> Self {
        let response = match err {
            ChatError::EmptyGeneration => NO_CONTENT_SENTINEL.to_string(),
            _ => format!("❌ Error: {err}"),
        };
        Self {
            response,
            think: None,
            model: model.map(str::to_string),
            status: err.status(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.status,
            ReplyStatus::ModelUnavailable | ReplyStatus::StreamFailure
        )
    }
}

/// One transcript line, tagged by role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum TranscriptEntry {
    User(UserEntry),
    Assistant(AssistantEntry),
}

/// Entries in display order. Grows by exactly one user/assistant pair per turn.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished turn.
    pub fn record_turn(&mut self, prompt: UserEntry, reply: AssistantEntry) {
        self.entries.push(TranscriptEntry::User(prompt));
        self.entries.push(TranscriptEntry::Assistant(reply));
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed turns.
    pub fn turns(&self) -> usize {
        self.entries.len() / 2
    }

    /// Prior turns as chat context: prompts and successful answers only.
    ///
    /// Reasoning is never sent back, and a turn whose reply failed is skipped
    /// entirely so the model does not see error text as its own words.
    pub fn history_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.entries.len());
        for pair in self.entries.chunks(2) {
            if let [TranscriptEntry::User(user), TranscriptEntry::Assistant(reply)] = pair {
                if reply.status == ReplyStatus::Complete {
                    messages.push(ChatMessage::user(user.content.clone()));
                    messages.push(ChatMessage::assistant(reply.response.clone()));
                }
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Role;

    fn reply(response: &str, think: Option<&str>) -> AssistantEntry {
        AssistantEntry::from_extraction(
            Extraction {
                response: response.into(),
                think: think.map(str::to_string),
            },
            "deepseek-r1:1.5b",
        )
    }

    #[test]
    fn test_empty_extraction_becomes_sentinel() {
        let entry = reply("", Some("thought only"));
        assert_eq!(entry.response, NO_CONTENT_SENTINEL);
        assert_eq!(entry.status, ReplyStatus::EmptyGeneration);
        assert_eq!(entry.think.as_deref(), Some("thought only"));
    }

    #[test]
    fn test_error_entry_has_no_think() {
        let err = ChatError::StreamFailure {
            reason: "connection reset".into(),
        };
        let entry = AssistantEntry::from_error(&err, Some("llama3:latest"));
        assert_eq!(entry.response, "❌ Error: generation failed: connection reset");
        assert!(entry.think.is_none());
        assert!(entry.is_error());
    }

    #[test]
    fn test_record_turn_keeps_order() {
        let mut t = Transcript::new();
        t.record_turn(UserEntry::new("first"), reply("one", None));
        t.record_turn(UserEntry::new("second"), reply("two", Some("hmm")));

        assert_eq!(t.len(), 4);
        assert_eq!(t.turns(), 2);
        match &t.entries()[2] {
            TranscriptEntry::User(u) => assert_eq!(u.content, "second"),
            other => panic!("expected user entry, got {other:?}"),
        }
    }

    #[test]
    fn test_history_skips_failed_turns_and_think() {
        let mut t = Transcript::new();
        t.record_turn(UserEntry::new("hi"), reply("hello", Some("be polite")));
        t.record_turn(
            UserEntry::new("again"),
            AssistantEntry::from_error(&ChatError::EmptyGeneration, None),
        );

        let history = t.history_messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "hello");
    }

    #[test]
    fn test_entry_serializes_with_role_tag() {
        let user = serde_json::to_value(TranscriptEntry::User(UserEntry::new("Say hi"))).unwrap();
        assert_eq!(user["role"], "user");
        assert_eq!(user["content"], "Say hi");

        let plain = serde_json::to_value(TranscriptEntry::Assistant(reply("Hi!", None))).unwrap();
        assert_eq!(plain["role"], "assistant");
        assert_eq!(plain["response"], "Hi!");
        assert!(plain.get("think").is_none());
        assert_eq!(plain["status"], "complete");
    }
}
