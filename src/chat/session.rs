//! ChatSession — the explicitly owned state of one conversation.
//!
//! A session owns its transcript and the last resolved model name. Each
//! [`ChatSession::submit`] runs one turn end to end: resolve a model, open a
//! streamed call, reconcile the fragments, and append the user/assistant
//! pair. Taking `&mut self` keeps a second turn from starting on the same
//! transcript while one is in flight.

use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::inference::{AppConfig, ChatBackend, ChatMessage};

use super::errors::ChatError;
use super::reconciler::{reconcile, Extraction, ThinkTags, ViewObserver};
use super::selector::ModelSelector;
use super::transcript::{AssistantEntry, Transcript, UserEntry};

/// Per-session behavior, usually derived from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Family prefix used to pick the model each turn.
    pub model_family: String,
    /// Model named in the `ollama pull` hint when the family is missing.
    pub pull_model: String,
    /// Send earlier turns along with the new prompt.
    pub send_history: bool,
    pub tags: ThinkTags,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            model_family: config.model_family.clone(),
            pull_model: config.pull_model.clone(),
            send_history: config.send_history,
            tags: ThinkTags::DEFAULT,
        }
    }
}

pub struct ChatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    settings: SessionSettings,
    transcript: Transcript,
    /// Model resolved by the most recent successful selection.
    model: Option<String>,
}

impl ChatSession {
    pub fn new(settings: SessionSettings) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            family = %settings.model_family,
            send_history = settings.send_history,
            "chat session started"
        );
        Self {
            id,
            started_at: Utc::now(),
            settings,
            transcript: Transcript::new(),
            model: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Run one turn and return the assistant entry appended for it.
    ///
    /// Every failure is folded into the returned entry; the session stays
    /// usable afterward.
    pub async fn submit<B, O>(&mut self, backend: &B, prompt: &str, observer: &mut O) -> AssistantEntry
    where
        B: ChatBackend,
        O: ViewObserver + ?Sized,
    {
        let started = Instant::now();
        let user = UserEntry::new(prompt);

        let reply = match self.resolve_model(backend).await {
            Err(err) => AssistantEntry::from_error(&err, None),
            Ok(model) => {
                let messages = self.request_messages(prompt);
                match stream_reply(backend, &model, &messages, self.settings.tags, observer).await {
                    Ok(extraction) => AssistantEntry::from_extraction(extraction, &model),
                    Err(err) => AssistantEntry::from_error(&err, Some(&model)),
                }
            }
        };

        tracing::info!(
            session = %self.id,
            turn = self.transcript.turns() + 1,
            model = reply.model.as_deref().unwrap_or("none"),
            status = ?reply.status,
            has_think = reply.think.is_some(),
            response_chars = reply.response.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn finished"
        );

        self.transcript.record_turn(user, reply.clone());
        reply
    }

    /// Resolve the model family once for this turn. No call is attempted
    /// when this fails.
    async fn resolve_model<B: ChatBackend>(&mut self, backend: &B) -> Result<String, ChatError> {
        let family = &self.settings.model_family;
        match ModelSelector::new(backend).resolve(family).await {
            Ok(Some(model)) => {
                self.model = Some(model.clone());
                Ok(model)
            }
            Ok(None) => {
                tracing::warn!(family = %family, "no local model matches family");
                Err(ChatError::ModelUnavailable {
                    family: family.clone(),
                    reason: format!(
                        "Please make sure it's pulled with 'ollama pull {}'.",
                        self.settings.pull_model
                    ),
                })
            }
            Err(e) => {
                tracing::warn!(family = %family, error = %e, "model listing failed");
                Err(ChatError::ModelUnavailable {
                    family: family.clone(),
                    reason: format!("Could not list local models: {e}"),
                })
            }
        }
    }

    /// Messages for the next call: optional prior turns, then the prompt.
    fn request_messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = if self.settings.send_history {
            self.transcript.history_messages()
        } else {
            Vec::new()
        };
        messages.push(ChatMessage::user(prompt));
        messages
    }
}

async fn stream_reply<B, O>(
    backend: &B,
    model: &str,
    messages: &[ChatMessage],
    tags: ThinkTags,
    observer: &mut O,
) -> Result<Extraction, ChatError>
where
    B: ChatBackend,
    O: ViewObserver + ?Sized,
{
    let fragments = backend.stream_chat(model, messages).await.map_err(|e| {
        tracing::warn!(model, error = %e, "chat request failed");
        // The model can disappear between listing and the call.
        if e.is_model_not_found() {
            ChatError::ModelUnavailable {
                family: model.to_string(),
                reason: e.error_body().unwrap_or_default().to_string(),
            }
        } else {
            ChatError::from(e)
        }
    })?;
    reconcile(fragments, tags, observer).await.map_err(|e| {
        tracing::warn!(model, error = %e, "chat stream failed");
        ChatError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::reconciler::LiveView;
    use crate::chat::testing::FakeBackend;
    use crate::chat::transcript::{ReplyStatus, TranscriptEntry, NO_CONTENT_SENTINEL};
    use crate::inference::Role;

    fn session() -> ChatSession {
        ChatSession::new(SessionSettings::from(&AppConfig::default()))
    }

    fn ignore() -> impl FnMut(&LiveView) {
        |_: &LiveView| {}
    }

    #[tokio::test]
    async fn test_greeting_turn() {
        let backend = FakeBackend::with_models(&["llama3:latest", "deepseek-r1:1.5b"])
            .replying(&["<thi", "nk>Planning a greeting</think>Hi there!"]);
        let mut s = session();

        let mut reasoning_seen = Vec::new();
        let reply = s
            .submit(&backend, "Say hi", &mut |v: &LiveView| {
                if let Some(r) = &v.reasoning {
                    reasoning_seen.push(r.text.clone());
                }
            })
            .await;

        assert_eq!(reply.response, "Hi there!");
        assert_eq!(reply.think.as_deref(), Some("Planning a greeting"));
        assert_eq!(reply.model.as_deref(), Some("deepseek-r1:1.5b"));
        assert_eq!(reply.status, ReplyStatus::Complete);
        assert_eq!(reasoning_seen.last().map(String::as_str), Some("Planning a greeting"));
        assert_eq!(s.current_model(), Some("deepseek-r1:1.5b"));
        let replied_at = chrono::DateTime::parse_from_rfc3339(&reply.timestamp).unwrap();
        assert!(s.started_at() <= replied_at.with_timezone(&Utc));
    }

    #[tokio::test]
    async fn test_missing_model_short_circuits() {
        let backend = FakeBackend::with_models(&["llama3:latest"]).replying(&["unused"]);
        let mut s = session();

        let reply = s.submit(&backend, "Say hi", &mut ignore()).await;

        assert_eq!(backend.stream_calls.get(), 0, "no call may be attempted");
        assert_eq!(reply.status, ReplyStatus::ModelUnavailable);
        assert!(reply.think.is_none());
        assert!(reply.response.contains("ollama pull deepseek-r1:1.5b"));
        assert_eq!(s.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_model_unavailable() {
        let backend = FakeBackend::unreachable();
        let mut s = session();
        let reply = s.submit(&backend, "hello?", &mut ignore()).await;
        assert_eq!(reply.status, ReplyStatus::ModelUnavailable);
        assert!(reply.response.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_whitespace_reply_is_sentinel() {
        let backend = FakeBackend::with_models(&["deepseek-r1:1.5b"]).replying(&["   "]);
        let mut s = session();
        let reply = s.submit(&backend, "anything", &mut ignore()).await;
        assert_eq!(reply.response, NO_CONTENT_SENTINEL);
        assert_eq!(reply.status, ReplyStatus::EmptyGeneration);
    }

    #[tokio::test]
    async fn test_model_removed_before_call() {
        let backend = FakeBackend::with_models(&["deepseek-r1:1.5b"]).model_gone_on_chat();
        let mut s = session();
        let reply = s.submit(&backend, "hi", &mut ignore()).await;
        assert_eq!(reply.status, ReplyStatus::ModelUnavailable);
        assert!(reply.response.contains("not found"));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_drops_partial_reasoning() {
        let backend = FakeBackend::with_models(&["deepseek-r1:1.5b"])
            .replying(&["<think>Let me con"])
            .then_failing("model runner has unexpectedly stopped");
        let mut s = session();

        let reply = s.submit(&backend, "Explain", &mut ignore()).await;

        assert_eq!(reply.status, ReplyStatus::StreamFailure);
        assert!(reply.think.is_none());
        assert!(reply.response.starts_with("❌ Error:"));
        assert!(reply.response.contains("unexpectedly stopped"));
        assert!(!reply.response.contains("Let me con"));
    }

    #[tokio::test]
    async fn test_turns_append_pairs_in_order() {
        let backend = FakeBackend::with_models(&["deepseek-r1:1.5b"]).replying(&["ok"]);
        let mut s = session();
        s.submit(&backend, "one", &mut ignore()).await;
        s.submit(&backend, "two", &mut ignore()).await;

        let roles: Vec<&str> = s
            .transcript()
            .entries()
            .iter()
            .map(|e| match e {
                TranscriptEntry::User(_) => "user",
                TranscriptEntry::Assistant(_) => "assistant",
            })
            .collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
    }

    #[tokio::test]
    async fn test_prompt_sent_alone_by_default() {
        let backend = FakeBackend::with_models(&["deepseek-r1:1.5b"]).replying(&["ok"]);
        let mut s = session();
        s.submit(&backend, "one", &mut ignore()).await;
        s.submit(&backend, "two", &mut ignore()).await;

        let sent = backend.sent.borrow();
        assert_eq!(sent[1], vec![ChatMessage::user("two")]);
    }

    #[tokio::test]
    async fn test_history_sent_when_enabled() {
        let backend = FakeBackend::with_models(&["deepseek-r1:1.5b"])
            .replying(&["<think>hm</think>first answer"]);
        let mut settings = SessionSettings::from(&AppConfig::default());
        settings.send_history = true;
        let mut s = ChatSession::new(settings);

        s.submit(&backend, "one", &mut ignore()).await;
        s.submit(&backend, "two", &mut ignore()).await;

        let sent = backend.sent.borrow();
        let second = &sent[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(second[1].content, "first answer");
        assert_eq!(second[2].content, "two");
    }
}
