//! In-process provider that replays canned replies.
//!
//! Each call to [`converse`](ModelProvider::converse) or
//! [`converse_stream`](ModelProvider::converse_stream) consumes the next
//! scripted step. The conversations it received are recorded for
//! assertions.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChunkStream, ModelProvider, ProviderChunk, ProviderFuture};
use crate::Message;
use crate::error::ProviderError;

#[derive(Debug, Clone)]
enum Step {
    Reply(String),
    Fail(String),
    Chunks(Vec<ProviderChunk>),
}

/// Provider whose answers are queued up front.
///
/// When the queue runs dry every call fails, so a test that makes more calls
/// than it scripted sees an error instead of hanging.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()))
    }

    /// Queue a failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    /// Queue an exact chunk sequence for the next streaming call.
    pub fn chunks(self, chunks: Vec<ProviderChunk>) -> Self {
        self.push(Step::Chunks(chunks))
    }

    fn push(self, step: Step) -> Self {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
        self
    }

    /// Conversations received so far, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_step(&self, messages: &[Message]) -> Option<Step> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        self.steps.lock().ok().and_then(|mut s| s.pop_front())
    }
}

impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn converse<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> ProviderFuture<'a, Result<String, ProviderError>> {
        let step = self.next_step(messages);
        Box::pin(async move {
            match step {
                Some(Step::Reply(text)) => Ok(text),
                Some(Step::Fail(e)) => Err(ProviderError::Stream(e)),
                Some(Step::Chunks(chunks)) => {
                    let mut text = String::new();
                    for chunk in chunks {
                        match chunk {
                            ProviderChunk::Content(c) => text.push_str(&c),
                            ProviderChunk::Error(e) => return Err(ProviderError::Stream(e)),
                        }
                    }
                    Ok(text)
                }
                None => Err(ProviderError::Unavailable("no scripted reply left".into())),
            }
        })
    }

    fn converse_stream(&self, messages: Vec<Message>) -> ChunkStream {
        let chunks = match self.next_step(&messages) {
            Some(Step::Reply(text)) => text
                .split_inclusive(' ')
                .map(|word| ProviderChunk::Content(word.to_string()))
                .collect(),
            Some(Step::Fail(e)) => vec![ProviderChunk::Error(e)],
            Some(Step::Chunks(chunks)) => chunks,
            None => vec![ProviderChunk::Error("no scripted reply left".into())],
        };
        Box::pin(futures::stream::iter(chunks))
    }
}
