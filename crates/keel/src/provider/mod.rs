//! Model-provider seam and its backends.
//!
//! Everything that talks to an LLM goes through [`ModelProvider`]:
//!
//! - [`ModelProvider::converse`]: one aggregate completion. Used for
//!   summaries and the one-shot generator.
//! - [`ModelProvider::converse_stream`]: a lazy, finite [`ChunkStream`] of
//!   [`ProviderChunk`]s. An [`Error`](ProviderChunk::Error) chunk is terminal.
//!   Dropping the stream stops reading from the network.
//!
//! Backends:
//!
//! - [`OpenRouterProvider`]: OpenRouter chat completions (SSE streaming).
//! - [`OllamaProvider`]: a local Ollama server (NDJSON streaming).
//! - [`ScriptedProvider`]: replays canned replies; for tests and offline runs.

mod lines;
pub mod ollama;
pub mod openrouter;
pub mod scripted;

pub use ollama::OllamaProvider;
pub use openrouter::OpenRouterProvider;
pub use scripted::ScriptedProvider;

use std::future::Future;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::Message;
use crate::error::ProviderError;

/// Default maximum tokens for a single model response.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Boxed future returned by [`ModelProvider::converse`].
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stream of chunks returned by [`ModelProvider::converse_stream`].
pub type ChunkStream = Pin<Box<dyn Stream<Item = ProviderChunk> + Send>>;

/// One element of a streamed model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChunk {
    /// An incremental piece of the response text.
    Content(String),
    /// The provider failed; no further chunks follow.
    Error(String),
}

impl ProviderChunk {
    pub fn is_error(&self) -> bool {
        matches!(self, ProviderChunk::Error(_))
    }
}

/// Sampling options sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A model that can answer a conversation.
///
/// Implementors return boxed futures/streams so the trait stays
/// object-safe and can be shared as `Arc<dyn ModelProvider>`.
pub trait ModelProvider: Send + Sync {
    /// Short human-readable label for logs (e.g. `"ollama:llama3.2:latest"`).
    fn name(&self) -> &str;

    /// Send `messages` and wait for the complete response text.
    fn converse<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> ProviderFuture<'a, Result<String, ProviderError>>;

    /// Send `messages` and stream the response as it is generated.
    fn converse_stream(&self, messages: Vec<Message>) -> ChunkStream;
}

/// Drain a chunk stream into one string, failing on the first error chunk.
pub async fn collect_stream(mut stream: ChunkStream) -> Result<String, ProviderError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            ProviderChunk::Content(delta) => text.push_str(&delta),
            ProviderChunk::Error(e) => return Err(ProviderError::Stream(e)),
        }
    }
    Ok(text)
}
