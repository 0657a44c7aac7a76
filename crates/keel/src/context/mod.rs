//! Conversation compaction.
//!
//! The full history of a session is kept in the store; what goes to the
//! model is a bounded view of it built by [`ContextCompactor`]. The
//! summarization call lives in [`summarizer`].

pub mod compactor;
pub mod summarizer;

pub use compactor::{CompactedContext, CompactionConfig, ContextCompactor, total_words, trim_to_budget};
