//! Interactive chat loop.
//!
//! Lines starting with `/` are commands; everything else is a prompt sent
//! through the session. `//` sends a prompt that starts with a slash, and a
//! leading path such as `/etc/hosts` is a prompt too. Input and output are generic so the loop can be
//! driven from tests.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::chat::{ChatSession, ModelSelector, SessionSettings};
use crate::inference::{AppConfig, ChatBackend};
use crate::render::{write_entry, LiveRenderer, Style, BOLD, CYAN, DIM, GREEN, RED, YELLOW};

use super::models;

const HELP: &str = "\
Commands:
  /models         List locally available models
  /info [MODEL]   Show model information (defaults to the selected model)
  /history        Show this conversation
  /help           Show this help
  /quit           Leave the chat
  //TEXT          Send /TEXT as a prompt";

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Prompt(&'a str),
    Models,
    Info(Option<&'a str>),
    History,
    Help,
    Quit,
    Unknown(&'a str),
    Empty,
}

pub fn parse_line(line: &str) -> ReplCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Prompt(line);
    };
    if command.starts_with('/') {
        return ReplCommand::Prompt(command);
    }

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim()).filter(|a| !a.is_empty())),
        None => (command, None),
    };
    if name.contains('/') {
        return ReplCommand::Prompt(line);
    }
    match name {
        "models" => ReplCommand::Models,
        "info" => ReplCommand::Info(arg),
        "history" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line),
    }
}

/// Run the chat loop until `/quit` or end of input.
pub async fn run_chat<B, R, W>(
    backend: &B,
    config: &AppConfig,
    input: R,
    out: &mut W,
    style: Style,
) -> io::Result<()>
where
    B: ChatBackend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write_banner(backend, config, out, style).await?;

    let mut session = ChatSession::new(SessionSettings::from(config));
    let mut lines = input.lines();

    loop {
        write!(out, "\n{} ", style.paint(CYAN, "you ›"))?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Unknown(cmd) => writeln!(
                out,
                "{}",
                style.paint(YELLOW, &format!("Unknown command {cmd}. Type /help for commands."))
            )?,
            ReplCommand::Models => match models::list(backend).await {
                Ok(text) => write!(out, "{text}")?,
                Err(e) => writeln!(
                    out,
                    "{}",
                    style.paint(YELLOW, &format!("⚠️ Could not list models. Error: {e}"))
                )?,
            },
            ReplCommand::Info(name) => {
                let name = name.or(session.current_model());
                let result = models::info(
                    backend,
                    name,
                    &config.model_family,
                    &config.pull_model,
                    style,
                )
                .await;
                match result {
                    Ok(text) => write!(out, "{text}")?,
                    Err(e) => writeln!(
                        out,
                        "{}",
                        style.paint(YELLOW, &format!("⚠️ Could not retrieve model info. Error: {e}"))
                    )?,
                }
            }
            ReplCommand::History => {
                if session.transcript().is_empty() {
                    writeln!(out, "{}", style.paint(DIM, "No messages yet."))?;
                }
                for entry in session.transcript().entries() {
                    write_entry(out, entry, style, config.show_thinking)?;
                }
            }
            ReplCommand::Prompt(prompt) => {
                let previous = session.current_model().map(str::to_string);
                writeln!(out, "{}", style.paint(GREEN, "assistant ›"))?;

                let mut renderer = LiveRenderer::new(&mut *out, style, config.show_thinking);
                let reply = session.submit(backend, prompt, &mut renderer).await;
                renderer.finish(&reply);

                if let Some(model) = session.current_model() {
                    if previous.as_deref() != Some(model) {
                        writeln!(out, "{}", style.paint(DIM, &format!("Model selected: {model}")))?;
                    }
                }
            }
        }
    }

    tracing::info!(
        session = %session.id(),
        turns = session.transcript().turns(),
        duration_secs = (chrono::Utc::now() - session.started_at()).num_seconds(),
        "chat session ended"
    );
    Ok(())
}

/// Title plus which local model will answer.
async fn write_banner<B, W>(backend: &B, config: &AppConfig, out: &mut W, style: Style) -> io::Result<()>
where
    B: ChatBackend,
    W: Write,
{
    let family = &config.model_family;
    writeln!(
        out,
        "{}",
        style.paint(BOLD, &format!("🤖 {family} chatbot"))
    )?;
    writeln!(out, "Chat with the {family} model running locally on Ollama")?;

    match ModelSelector::new(backend).resolve(family).await {
        Ok(Some(model)) => {
            writeln!(out, "{}", style.paint(GREEN, &format!("Using model: {model}")))?;
            writeln!(out, "You can run this model directly with: ollama run {model}")?;
        }
        Ok(None) => {
            writeln!(out, "{}", style.paint(RED, &format!("No {family} model found")))?;
            writeln!(out, "Please pull the model with: ollama pull {}", config.pull_model)?;
        }
        Err(e) => {
            writeln!(
                out,
                "{}",
                style.paint(RED, &format!("Could not reach Ollama at {}: {e}", config.api_root()))
            )?;
        }
    }
    writeln!(out, "{}", style.paint(DIM, "Type /help for commands."))
}
