//! In-memory `ChatBackend` for unit tests.

use std::cell::{Cell, RefCell};

use futures::stream::{self, StreamExt};

use crate::inference::types::ModelDetailsInfo;
use crate::inference::{
    ChatBackend, ChatMessage, FragmentStream, InferenceError, ModelDetails, ModelSummary,
};

/// One scripted stream item.
enum Step {
    Text(String),
    Fail(String),
}

pub(crate) struct FakeBackend {
    pub models: Vec<ModelSummary>,
    pub details: Option<ModelDetails>,
    unreachable: bool,
    /// `stream_chat` answers 404 as if the model was deleted.
    model_gone: bool,
    script: Vec<Step>,
    /// Number of `stream_chat` calls made.
    pub stream_calls: Cell<usize>,
    /// Messages passed to each `stream_chat` call.
    pub sent: RefCell<Vec<Vec<ChatMessage>>>,
}

impl FakeBackend {
    pub fn with_models(names: &[&str]) -> Self {
        let models = names
            .iter()
            .map(|name| ModelSummary {
                name: name.to_string(),
                model: Some(name.to_string()),
                size: 1_117_322_599,
                modified_at: Some("2025-01-28T10:15:00Z".into()),
                details: None,
            })
            .collect();
        Self {
            models,
            details: None,
            unreachable: false,
            model_gone: false,
            script: Vec::new(),
            stream_calls: Cell::new(0),
            sent: RefCell::new(Vec::new()),
        }
    }

    /// A backend whose server cannot be reached.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::with_models(&[])
        }
    }

    pub fn model_gone_on_chat(mut self) -> Self {
        self.model_gone = true;
        self
    }

    /// Fragments every `stream_chat` call yields.
    pub fn replying(mut self, fragments: &[&str]) -> Self {
        self.script = fragments.iter().map(|f| Step::Text(f.to_string())).collect();
        self
    }

    /// Append a mid-stream failure after the scripted fragments.
    pub fn then_failing(mut self, reason: &str) -> Self {
        self.script.push(Step::Fail(reason.to_string()));
        self
    }

    pub fn with_details(mut self, format: &str, family: &str, size: Option<&str>) -> Self {
        self.details = Some(ModelDetails {
            modified_at: Some("2025-01-28T10:15:00Z".into()),
            details: Some(ModelDetailsInfo {
                format: Some(format.into()),
                family: Some(family.into()),
                parameter_size: size.map(str::to_string),
                quantization_level: None,
            }),
            parameters: Some("stop \"<｜end▁of▁sentence｜>\"".into()),
        });
        self
    }

    fn connection_error() -> InferenceError {
        InferenceError::ConnectionFailed {
            endpoint: "http://localhost:11434".into(),
            reason: "connection refused".into(),
        }
    }
}

impl ChatBackend for FakeBackend {
    async fn list_models(&self) -> Result<Vec<ModelSummary>, InferenceError> {
        if self.unreachable {
            return Err(Self::connection_error());
        }
        Ok(self.models.clone())
    }

    async fn show(&self, model: &str) -> Result<ModelDetails, InferenceError> {
        if self.unreachable {
            return Err(Self::connection_error());
        }
        self.details.clone().ok_or_else(|| InferenceError::HttpError {
            status: 404,
            body: format!(r#"{{"error":"model '{model}' not found"}}"#),
        })
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, InferenceError> {
        if self.unreachable {
            return Err(Self::connection_error());
        }
        if self.model_gone {
            return Err(InferenceError::HttpError {
                status: 404,
                body: format!(r#"{{"error":"model '{model}' not found"}}"#),
            });
        }
        self.stream_calls.set(self.stream_calls.get() + 1);
        self.sent.borrow_mut().push(messages.to_vec());

        let items: Vec<Result<String, InferenceError>> = self
            .script
            .iter()
            .map(|step| match step {
                Step::Text(t) => Ok(t.clone()),
                Step::Fail(reason) => Err(InferenceError::StreamError {
                    reason: reason.clone(),
                }),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}
