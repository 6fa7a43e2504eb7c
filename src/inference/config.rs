//! Client configuration loading and validation.
//!
//! Reads `thinkchat.yaml` and resolves environment variables. Every field has
//! a default, so a missing file yields a working configuration that talks to
//! Ollama on `localhost:11434` and prefers the DeepSeek-R1 family.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::InferenceError;

/// File name searched for by [`find_config_path`].
pub const CONFIG_FILE_NAME: &str = "thinkchat.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "THINKCHAT_CONFIG";

// ─── Public Types ────────────────────────────────────────────────────────────

/// Runtime configuration for the chat client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ollama endpoint root, without the `/api` suffix.
    pub base_url: String,
    /// Model family prefix used to pick a local model, e.g. `"deepseek-r1"`.
    pub model_family: String,
    /// Model suggested in `ollama pull` hints when the family is missing.
    pub pull_model: String,
    /// Render the reasoning segment live and in `/history`.
    pub show_thinking: bool,
    /// Send earlier turns as context. Off by default: each prompt stands alone.
    pub send_history: bool,
    /// Optional sampling temperature forwarded to the model.
    pub temperature: Option<f32>,
    pub connect_timeout_secs: u64,
    /// Timeout for model listing and `show` calls.
    pub request_timeout_secs: u64,
    /// Upper bound on a whole streamed generation.
    pub stream_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Preset::Deepseek.config()
    }
}

/// Built-in model presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// DeepSeek-R1 (emits `<think>` reasoning).
    Deepseek,
    /// LLaMA 3.
    Llama3,
}

impl Preset {
    /// The full default configuration for this preset.
    pub fn config(self) -> AppConfig {
        let (family, pull) = match self {
            Preset::Deepseek => ("deepseek-r1", "deepseek-r1:1.5b"),
            Preset::Llama3 => ("llama3", "llama3:latest"),
        };
        AppConfig {
            base_url: "http://localhost:11434".into(),
            model_family: family.into(),
            pull_model: pull.into(),
            show_thinking: true,
            send_history: false,
            temperature: None,
            connect_timeout_secs: 5,
            request_timeout_secs: 120,
            stream_timeout_secs: 600,
        }
    }

    /// Switch `config` to this preset's model family, keeping everything else.
    pub fn apply(self, config: &mut AppConfig) {
        let preset = self.config();
        config.model_family = preset.model_family;
        config.pull_model = preset.pull_model;
    }
}

impl AppConfig {
    /// Check field values that serde cannot.
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.base_url.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "base_url must not be empty".into(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(InferenceError::ConfigError {
                reason: format!("base_url must be an http(s) URL, got '{}'", self.base_url),
            });
        }
        if self.model_family.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "model_family must not be empty".into(),
            });
        }
        Ok(())
    }

    /// `base_url` without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Order: the `THINKCHAT_CONFIG` env var, then `thinkchat.yaml` in `start` or
/// any ancestor, then `<config_dir>/thinkchat/thinkchat.yaml`. Returns `None`
/// when no file exists; defaults apply in that case.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    // 1. Check env var
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(expand_tilde(&path));
        if candidate.exists() {
            return Some(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_ENV_VAR} points to a missing file");
    }

    // 2. Walk upward from `start`
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    // 3. Per-user config directory
    dirs::config_dir()
        .map(|d| d.join("thinkchat").join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load, interpolate, and validate a config file.
///
/// Performs environment-variable interpolation on string values matching
/// `${VAR_NAME}` or `${VAR_NAME:-default}`.
pub fn load_config(path: &Path) -> Result<AppConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    let interpolated = interpolate_env_vars(&raw);

    // An empty file deserializes to `null`; treat it as "all defaults".
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let parse_error = |e: serde_yaml::Error| InferenceError::ConfigError {
        reason: format!("failed to parse {}: {e}", path.display()),
    };
    let doc: serde_yaml::Value = serde_yaml::from_str(&interpolated).map_err(parse_error)?;
    let sets_family = doc.get("model_family").is_some();
    let sets_pull = doc.get("pull_model").is_some();
    let mut config: AppConfig = serde_yaml::from_value(doc).map_err(parse_error)?;

    // The default pull hint belongs to the default family.
    if sets_family && !sets_pull {
        config.pull_model = config.model_family.clone();
    }

    config.validate()?;
    Ok(config)
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
