//! Core of a chat-driven project generator.
//!
//! `keel` sits between a chat front end and an LLM provider. It keeps
//! conversations bounded before they are sent to a model, and it turns the
//! model's semi-structured "file name → file content" answers into files on
//! disk.
//!
//! # Where to find things
//!
//! - **Bound a conversation before sending it:** see
//!   [`ContextCompactor`](context::ContextCompactor). Older turns are
//!   summarized by the model, the most recent window is kept verbatim, and a
//!   word-count budget trims whatever is still too large.
//!
//! - **Turn model output into files:** see
//!   [`extract_file_tree`](materialize::extract_file_tree) for parsing and
//!   repair, [`write_file_tree`](materialize::write_file_tree) for the
//!   best-effort batch write, and [`Materializer`](materialize::Materializer)
//!   when the intermediate artifacts should be kept for inspection.
//!
//! - **Talk to a model:** implement [`ModelProvider`](provider::ModelProvider),
//!   or use [`OpenRouterProvider`](provider::OpenRouterProvider) /
//!   [`OllamaProvider`](provider::OllamaProvider). Models are looked up by id
//!   in a [`ModelRegistry`](registry::ModelRegistry).
//!
//! - **Run a chat turn end to end:** see [`ChatService`](chat::ChatService),
//!   which wires the [`ConversationStore`](store::ConversationStore), prompt
//!   selection, and compaction together.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Summarize-and-trim compaction of conversation history |
//! | [`materialize`] | Extraction, repair, and writing of model-produced file trees |
//! | [`provider`] | Provider seam, OpenRouter / Ollama backends, scripted provider |
//! | [`registry`] | Model ids → provider backends |
//! | [`store`] | Per-session conversation storage |
//! | [`prompt`] | Prompt-kind detection and system prompt templates |
//! | [`chat`] | Chat-turn orchestration |
//! | [`config`] | Chat tuning knobs |
//! | [`error`] | Provider, parse, and write error types |

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod materialize;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod store;

use serde::{Deserialize, Serialize};

pub use config::ChatConfig;
pub use error::{ParseError, ProviderError, WriteError};

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Capitalized label used when a transcript is rendered as plain text.
    pub fn label(self) -> &'static str {
        match self {
            MessageRole::System => "System",
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Whitespace-delimited word count of the content.
    ///
    /// Used as a cheap stand-in for a token count when budgeting context.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Truncate `text` to at most `max_chars` characters, appending `...` when
/// anything was cut. Operates on `char` boundaries.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
