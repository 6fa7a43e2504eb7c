//! Inference Client — Ollama HTTP API client for local LLM inference.
//!
//! This module handles all communication with the local Ollama server:
//! - Model listing (`/api/tags`) and inspection (`/api/show`)
//! - Streamed chat (`/api/chat`)
//! - NDJSON stream parsing into content fragments
//! - Client configuration loading from `thinkchat.yaml`

pub mod client;
pub mod config;
pub mod errors;
pub mod streaming;
pub mod types;

// Re-exports for convenience
pub use client::{ChatBackend, OllamaClient};
pub use config::{AppConfig, Preset};
pub use errors::InferenceError;
pub use streaming::FragmentStream;
pub use types::{ChatMessage, ModelDetails, ModelSummary, Role};
