//! Model listing and model information.
//!
//! Used by the `models` and `info` subcommands and by `/models` and `/info`
//! inside the chat loop.

use crate::chat::ModelSelector;
use crate::inference::{ChatBackend, InferenceError, ModelDetails, ModelSummary};
use crate::render::{Style, BOLD, YELLOW};

/// Human-readable model size, in decimal units as `ollama list` prints them.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// One line per local model, in server order.
pub fn format_model_list(models: &[ModelSummary]) -> String {
    if models.is_empty() {
        return "No local models found. Pull one with 'ollama pull <model>'.\n".to_string();
    }
    let mut text = String::from("Available models:\n");
    for model in models {
        let size = if model.size > 0 {
            format!(" ({})", format_size(model.size))
        } else {
            String::new()
        };
        text.push_str(&format!("- {}{size}\n", model.identifier()));
    }
    text
}

/// Model information block.
///
/// Parameters fall back from `parameter_size` to the modelfile `parameters`;
/// a missing quantization level reads as "Not quantized".
pub fn format_model_info(model: &str, info: &ModelDetails, style: Style) -> String {
    let field = |label: &str, value: &str| format!("{} {value}\n", style.paint(BOLD, label));

    let mut text = field("Model:", model);
    text.push_str(&field(
        "Modified At:",
        info.modified_at.as_deref().unwrap_or("N/A"),
    ));

    let Some(details) = &info.details else {
        text.push_str(&style.paint(
            YELLOW,
            "No detailed information available for this model.",
        ));
        text.push('\n');
        return text;
    };

    text.push_str(&field("Format:", details.format.as_deref().unwrap_or("N/A")));
    text.push_str(&field("Family:", details.family.as_deref().unwrap_or("N/A")));

    let parameters = non_empty(details.parameter_size.as_deref())
        .or(non_empty(info.parameters.as_deref()))
        .unwrap_or("N/A");
    text.push_str(&field("Parameters:", parameters));

    let quantization =
        non_empty(details.quantization_level.as_deref()).unwrap_or("Not quantized");
    text.push_str(&field("Quantization:", quantization));
    text
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// List local models as display text.
pub async fn list<B: ChatBackend>(backend: &B) -> Result<String, InferenceError> {
    let models = backend.list_models().await?;
    Ok(format_model_list(&models))
}

/// Information for `model`, or for the first model of `family` when no
/// model is named.
pub async fn info<B: ChatBackend>(
    backend: &B,
    model: Option<&str>,
    family: &str,
    pull_model: &str,
    style: Style,
) -> Result<String, InferenceError> {
    let model = match model {
        Some(name) => name.to_string(),
        None => match ModelSelector::new(backend).resolve(family).await? {
            Some(name) => name,
            None => {
                return Ok(format!(
                    "{}\n",
                    style.paint(
                        YELLOW,
                        &format!(
                            "⚠️ {family} model is not available. Please run 'ollama pull {pull_model}' to download it."
                        ),
                    )
                ));
            }
        },
    };

    let details = backend.show(&model).await?;
    tracing::debug!(model = %model, has_details = details.details.is_some(), "model info");
    Ok(format_model_info(&model, &details, style))
}
