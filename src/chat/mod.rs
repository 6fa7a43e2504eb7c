//! Chat core — turns a prompt into a finalized transcript entry.
//!
//! Submodules:
//! - `reconciler`: live think/answer segmentation of a streamed reply
//! - `selector`: model resolution by family prefix
//! - `session`: explicitly owned per-conversation state and the turn handler
//! - `transcript`: append-only user/assistant history
//! - `errors`: per-turn error taxonomy

pub mod errors;
pub mod reconciler;
pub mod selector;
pub mod session;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use errors::ChatError;
pub use reconciler::{
    extract, reconcile, Extraction, LiveView, Reasoning, StreamReconciler, ThinkTags, ViewObserver,
};
pub use selector::{select_model, ModelSelector};
pub use session::{ChatSession, SessionSettings};
pub use transcript::{
    AssistantEntry, ReplyStatus, Transcript, TranscriptEntry, UserEntry, NO_CONTENT_SENTINEL,
};
