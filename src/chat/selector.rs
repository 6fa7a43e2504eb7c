//! ModelSelector — picks a local model identifier by family prefix.

use crate::inference::{ChatBackend, InferenceError, ModelSummary};

/// First identifier in `models` that starts with `family`.
pub fn select_model<'a>(family: &str, models: &'a [ModelSummary]) -> Option<&'a str> {
    models
        .iter()
        .map(ModelSummary::identifier)
        .find(|id| id.starts_with(family))
}

/// Resolves a family prefix against the backend's current model list.
pub struct ModelSelector<'a, B> {
    backend: &'a B,
}

impl<'a, B: ChatBackend> ModelSelector<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// `Ok(None)` when the server answered but no model matches.
    pub async fn resolve(&self, family: &str) -> Result<Option<String>, InferenceError> {
        let models = self.backend.list_models().await?;
        let selected = select_model(family, &models).map(str::to_string);
        tracing::debug!(
            family,
            available = models.len(),
            selected = selected.as_deref().unwrap_or("none"),
            "model selection"
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::FakeBackend;

    fn summaries(names: &[&str]) -> Vec<ModelSummary> {
        FakeBackend::with_models(names).models
    }

    #[test]
    fn test_select_by_prefix() {
        let models = summaries(&["llama3:latest", "deepseek-r1:1.5b"]);
        assert_eq!(select_model("deepseek-r1", &models), Some("deepseek-r1:1.5b"));
    }

    #[test]
    fn test_select_first_of_several() {
        let models = summaries(&["deepseek-r1:7b", "deepseek-r1:1.5b"]);
        assert_eq!(select_model("deepseek-r1", &models), Some("deepseek-r1:7b"));
    }

    #[test]
    fn test_select_none() {
        let models = summaries(&["llama3:latest"]);
        assert_eq!(select_model("deepseek-r1", &models), None);
    }

    #[test]
    fn test_prefix_not_substring() {
        let models = summaries(&["my-deepseek-r1:latest"]);
        assert_eq!(select_model("deepseek-r1", &models), None);
    }

    #[tokio::test]
    async fn test_resolve_through_backend() {
        let backend = FakeBackend::with_models(&["llama3:latest", "deepseek-r1:1.5b"]);
        let selector = ModelSelector::new(&backend);
        assert_eq!(
            selector.resolve("deepseek-r1").await.unwrap().as_deref(),
            Some("deepseek-r1:1.5b")
        );
        assert_eq!(selector.resolve("qwen3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_propagates_listing_error() {
        let backend = FakeBackend::unreachable();
        assert!(ModelSelector::new(&backend).resolve("llama3").await.is_err());
    }
}
