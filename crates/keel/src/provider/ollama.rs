//! Local Ollama backend (`POST {base}/api/chat`).
//!
//! Streaming responses are newline-delimited JSON objects of the form
//! `{"message": {"content": "..."}, "done": false}`, ending with a
//! `"done": true` line. Failures arrive as `{"error": "..."}`.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::lines::{self, LineEvent};
use super::{ChunkStream, GenerationOptions, ModelProvider, ProviderChunk, ProviderFuture};
use crate::Message;
use crate::error::ProviderError;

/// Default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Environment variable overriding the Ollama server address.
pub const OLLAMA_URL_ENV: &str = "OLLAMA_URL";

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// A single model served by Ollama.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    label: String,
    options: GenerationOptions,
}

impl OllamaProvider {
    /// Create a provider for `model` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            label: format!("ollama:{model}"),
            model,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        let body = OllamaRequest {
            model: &self.model,
            messages,
            stream,
            options: OllamaOptions {
                num_predict: self.options.max_tokens,
                temperature: self.options.temperature,
            },
        };
        self.client.post(self.endpoint()).json(&body)
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        debug!(
            "Ollama request: model={}, messages={}",
            self.model,
            messages.len()
        );
        let start = Instant::now();
        let resp = lines::open(self.request(messages, false)).await?;
        let parsed: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        debug!("Ollama response in {:.1}s", start.elapsed().as_secs_f64());

        if let Some(err) = parsed.error {
            return Err(ProviderError::Stream(err));
        }
        parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::Empty)
    }
}

impl ModelProvider for OllamaProvider {
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
            "Ollama streaming request: model={}, messages={}",
            self.model,
            messages.len()
        );
        lines::line_stream(self.request(&messages, true), parse_ndjson_line)
    }
}

fn parse_ndjson_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() {
        return LineEvent::Skip;
    }
    match serde_json::from_str::<OllamaResponse>(line) {
        Ok(resp) => {
            if let Some(err) = resp.error {
                return LineEvent::Chunk(ProviderChunk::Error(err));
            }
            let content = resp.message.map(|m| m.content).unwrap_or_default();
            if !content.is_empty() {
                LineEvent::Chunk(ProviderChunk::Content(content))
            } else if resp.done {
                LineEvent::Done
            } else {
                LineEvent::Skip
            }
        }
        Err(e) => {
            warn!("Failed to parse Ollama line: {e} (line: {line})");
            LineEvent::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_content_line() {
        let line = r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#;
        assert!(matches!(
            parse_ndjson_line(line),
            LineEvent::Chunk(ProviderChunk::Content(ref c)) if c == "Hi"
        ));
    }

    #[test]
    fn ndjson_done_line() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":true}"#;
        assert!(matches!(parse_ndjson_line(line), LineEvent::Done));
    }

    #[test]
    fn ndjson_error_line() {
        let line = r#"{"error":"model 'x' not found"}"#;
        assert!(matches!(
            parse_ndjson_line(line),
            LineEvent::Chunk(ProviderChunk::Error(ref e)) if e.contains("not found")
        ));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.2:latest");
        assert_eq!(provider.endpoint(), "http://localhost:11434/api/chat");
        assert_eq!(provider.name(), "ollama:llama3.2:latest");
    }

    #[test]
    fn request_maps_generation_options() {
        let messages = vec![Message::system("s")];
        let body = OllamaRequest {
            model: "llama3.2:latest",
            messages: &messages,
            stream: true,
            options: OllamaOptions {
                num_predict: 256,
                temperature: 0.2,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["options"]["num_predict"], 256);
    }

    #[test]
    fn configured_options_sent_with_request() {
        let provider = OllamaProvider::new(DEFAULT_OLLAMA_URL, "llama3.2:latest").with_options(
            GenerationOptions {
                max_tokens: 64,
                temperature: 0.0,
            },
        );
        let request = provider
            .request(&[Message::user("hi")], false)
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:11434/api/chat");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["options"]["temperature"], 0.0);
        assert_eq!(json["stream"], false);
    }
}
