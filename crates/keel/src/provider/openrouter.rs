//! OpenRouter chat completions backend.
//!
//! Non-streaming calls read `choices[0].message.content`. Streaming calls set
//! `"stream": true` and parse Server-Sent Events: `data: {json}` lines with
//! incremental `delta.content`, `:` comment lines (keep-alives), and a final
//! `data: [DONE]`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::lines::{self, LineEvent};
use super::{ChunkStream, GenerationOptions, ModelProvider, ProviderChunk, ProviderFuture};
use crate::Message;
use crate::error::ProviderError;

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Environment variable holding the OpenRouter API key.
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_KEY";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Raw SSE data chunk.
#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Option<Vec<StreamChoice>>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: Option<StreamDelta>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StreamDelta {
    content: Option<String>,
}

// ── Provider ───────────────────────────────────────────────────────

/// A single OpenRouter model.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    referer: String,
    title: String,
    model: String,
    label: String,
    options: GenerationOptions,
}

impl OpenRouterProvider {
    /// Create a provider for `model` with default headers.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_headers(api_key, model, "https://github.com/keel-rs/keel", "keel")
    }

    /// Create a provider with custom `HTTP-Referer` and `X-Title` headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        model: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("keel/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;
        let model = model.into();
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
            label: format!("openrouter:{model}"),
            model,
            options: GenerationOptions::default(),
        })
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            stream,
        };
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(&body).map_or(0, |s| s.len())
        );
        self.client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            self.model,
            messages.len(),
            self.options.max_tokens,
            self.options.temperature,
        );
        let start = Instant::now();

        let resp = lines::open(self.request(messages, false)).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Decode(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response in {:.1}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            text.len()
        );
        parse_completion(&text)
    }
}

impl ModelProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn converse<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> ProviderFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.chat(messages))
    }

    fn converse_stream(&self, messages: Vec<Message>) -> ChunkStream {
        debug!(
            "Sending streaming chat request: model={}, messages={}",
            self.model,
            messages.len()
        );
        lines::line_stream(self.request(&messages, true), parse_sse_line)
    }
}

/// Parse a non-streaming completion body.
fn parse_completion(text: &str) -> Result<String, ProviderError> {
    let parsed: RawChatResponse = serde_json::from_str(text)
        .map_err(|e| ProviderError::Decode(format!("failed to parse response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(ProviderError::Stream(err.message));
    }

    parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(ProviderError::Empty)
}

/// Parse a single SSE line.
fn parse_sse_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return LineEvent::Skip;
    }
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return LineEvent::Skip;
    };
    if data == "[DONE]" {
        return LineEvent::Done;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            if let Some(err) = chunk.error {
                return LineEvent::Chunk(ProviderChunk::Error(err.message));
            }
            let mut text = String::new();
            for choice in chunk.choices.unwrap_or_default() {
                if let Some(content) = choice.delta.and_then(|d| d.content) {
                    text.push_str(&content);
                }
                if choice.finish_reason.is_some() {
                    trace!("Stream finish_reason: {:?}", choice.finish_reason);
                }
            }
            if text.is_empty() {
                LineEvent::Skip
            } else {
                LineEvent::Chunk(ProviderChunk::Content(text))
            }
        }
        Err(e) => {
            warn!("Failed to parse SSE chunk: {e} (data: {data})");
            LineEvent::Skip
        }
    }
}
