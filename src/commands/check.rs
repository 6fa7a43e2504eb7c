//! Installation check: is Ollama running, is the model family pulled, and
//! does the model answer a short probe prompt.

use std::fmt::Display;
use std::io::{self, Write};

use crate::chat::{reconcile, select_model, LiveView, ThinkTags};
use crate::inference::{AppConfig, ChatBackend, ChatMessage};
use crate::render::{Style, DIM, GREEN, RED, YELLOW};

/// Prompt sent to confirm the model generates text.
pub const PROBE_PROMPT: &str = "Say hello in one short sentence.";

/// Run the check, writing progress to `out`. Returns whether every step passed.
pub async fn run_check<B, W>(
    backend: &B,
    config: &AppConfig,
    out: &mut W,
    style: Style,
) -> io::Result<bool>
where
    B: ChatBackend,
    W: Write,
{
    writeln!(out, "Checking Ollama installation...")?;

    let models = match backend.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!(error = %e, "check: model listing failed");
            troubleshoot(out, config, &e, style)?;
            return Ok(false);
        }
    };

    writeln!(out, "Ollama is running. Available models:")?;
    for model in &models {
        writeln!(out, "- {}", model.identifier())?;
    }

    let family = &config.model_family;
    let Some(model) = select_model(family, &models).map(str::to_string) else {
        writeln!(
            out,
            "\n{}",
            style.paint(YELLOW, &format!("{family} model not found. You need to pull it:"))
        )?;
        writeln!(out, "Run: ollama pull {}", config.pull_model)?;
        return Ok(false);
    };

    writeln!(out, "\nTesting {model} with a simple query...")?;

    let probe = async {
        let fragments = backend
            .stream_chat(&model, &[ChatMessage::user(PROBE_PROMPT)])
            .await?;
        reconcile(fragments, ThinkTags::DEFAULT, &mut |_: &LiveView| {}).await
    };
    let extraction = match probe.await {
        Ok(extraction) => extraction,
        Err(e) => {
            tracing::warn!(model = %model, error = %e, "check: probe failed");
            troubleshoot(out, config, &e, style)?;
            return Ok(false);
        }
    };

    if extraction.response.is_empty() {
        troubleshoot(out, config, &"the model returned no content", style)?;
        return Ok(false);
    }

    if let Some(think) = &extraction.think {
        writeln!(out, "\n{}", style.paint(DIM, &format!("Reasoning: {think}")))?;
    }
    writeln!(out, "\nModel response: {}", extraction.response)?;
    writeln!(
        out,
        "\n{}",
        style.paint(GREEN, &format!("Ollama and {model} are working correctly!"))
    )?;
    tracing::info!(model = %model, "check passed");
    Ok(true)
}

fn troubleshoot<W: Write>(
    out: &mut W,
    config: &AppConfig,
    error: &dyn Display,
    style: Style,
) -> io::Result<()> {
    writeln!(out, "\n{}", style.paint(RED, &format!("Error: {error}")))?;
    writeln!(out, "\nTroubleshooting steps:")?;
    writeln!(out, "1. Make sure Ollama is installed and running")?;
    writeln!(
        out,
        "2. Check if you've pulled the {} model with: ollama pull {}",
        config.model_family, config.pull_model
    )?;
    writeln!(
        out,
        "3. Verify that the Ollama service is accessible at {}",
        config.api_root()
    )
}
