use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use thinkchat::commands::{check, models, repl};
use thinkchat::inference::config::{find_config_path, load_config};
use thinkchat::inference::{AppConfig, OllamaClient, Preset};
use thinkchat::render::Style;
use thinkchat::{init_tracing, LogOptions};

#[derive(Debug, Parser)]
#[command(
    name = "thinkchat",
    version,
    about = "Chat with local Ollama models, with their reasoning shown apart from the answer"
)]
struct Cli {
    /// Config file (default: $THINKCHAT_CONFIG, then ./thinkchat.yaml upward, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model preset
    #[arg(long, value_enum, global = true)]
    preset: Option<Preset>,

    /// Ollama endpoint, e.g. http://localhost:11434
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model family prefix, e.g. deepseek-r1
    #[arg(long = "family", global = true)]
    model_family: Option<String>,

    /// Do not show the model's reasoning
    #[arg(long, global = true)]
    hide_thinking: bool,

    /// Send earlier turns as context
    #[arg(long, global = true)]
    history: bool,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Interactive chat (default)
    Chat,
    /// List locally available models
    Models,
    /// Show model information
    Info {
        /// Model to inspect (default: first model of the configured family)
        model: Option<String>,
    },
    /// Check that Ollama is running and the model family answers
    Check,
}

/// Config file values, then the preset, then explicit flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let cwd = std::env::current_dir().context("cannot read current directory")?;
            find_config_path(&cwd)
        }
    };

    let mut config = match &path {
        Some(path) => {
            load_config(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => AppConfig::default(),
    };

    if let Some(preset) = cli.preset {
        preset.apply(&mut config);
    }
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(family) = &cli.model_family {
        config.model_family = family.clone();
        config.pull_model = family.clone();
    }
    if cli.hide_thinking {
        config.show_thinking = false;
    }
    if cli.history {
        config.send_history = true;
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = Some(temperature);
    }

    config.validate()?;
    tracing::info!(
        config_file = %path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "none".into()),
        base_url = %config.api_root(),
        family = %config.model_family,
        show_thinking = config.show_thinking,
        send_history = config.send_history,
        "configuration resolved"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(LogOptions {
        verbose: cli.verbose,
        json: cli.log_json,
    }) {
        eprintln!("warning: logging disabled: {e}");
    }

    let config = resolve_config(&cli)?;
    let client = OllamaClient::new(&config)?;
    let style = Style::detect();
    let mut stdout = std::io::stdout();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let stdin = BufReader::new(tokio::io::stdin());
            repl::run_chat(&client, &config, stdin, &mut stdout, style).await?;
        }
        Command::Models => {
            let text = models::list(&client).await?;
            print!("{text}");
        }
        Command::Info { model } => {
            let text = models::info(
                &client,
                model.as_deref(),
                &config.model_family,
                &config.pull_model,
                style,
            )
            .await?;
            print!("{text}");
        }
        Command::Check => {
            if !check::run_check(&client, &config, &mut stdout, style).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
