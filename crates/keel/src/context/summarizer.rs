//! Summaries of the turns that fall out of the recent window.
//!
//! One non-streaming model call condenses the earlier span into a few
//! sentences. Any failure (error, timeout, blank answer) degrades to a
//! deterministic placeholder, so summarizing never fails.

use std::time::Duration;

use tracing::{debug, warn};

use crate::Message;
use crate::error::ProviderError;
use crate::provider::ModelProvider;

/// Instruction sent as the system message of the summarization call.
pub const SUMMARIZATION_PROMPT: &str =
    "Create a brief summary (2-3 sentences) of the key points from the following conversation.";

/// Prefix of the synthetic system message that carries the summary.
pub const SUMMARY_PREFIX: &str = "Earlier conversation summary: ";

/// Render messages as `Role: content` lines.
pub fn transcript(span: &[Message]) -> String {
    let mut text = String::new();
    for msg in span {
        text.push_str(msg.role.label());
        text.push_str(": ");
        text.push_str(&msg.content);
        text.push('\n');
    }
    text
}

/// The (system, user) message pair for summarizing `span`.
pub fn build_summarization_request(span: &[Message]) -> Vec<Message> {
    vec![
        Message::system(SUMMARIZATION_PROMPT),
        Message::user(format!(
            "Please summarize this conversation:\n\n{}",
            transcript(span)
        )),
    ]
}

/// Placeholder used when the model cannot produce a summary.
pub fn fallback_summary(message_count: usize) -> String {
    format!("Conversation with {message_count} messages about various topics.")
}

/// Summarize `span` with `provider`, falling back to
/// [`fallback_summary`] on any failure.
pub async fn summarize(
    provider: &dyn ModelProvider,
    span: &[Message],
    timeout: Duration,
) -> String {
    let request = build_summarization_request(span);
    let result = match tokio::time::timeout(timeout, provider.converse(&request)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    };

    match result {
        Ok(summary) if !summary.trim().is_empty() => {
            debug!(
                "Summarized {} message(s) via {} ({} chars)",
                span.len(),
                provider.name(),
                summary.len()
            );
            summary.trim().to_string()
        }
        Ok(_) => {
            warn!("Summary from {} was empty; using placeholder", provider.name());
            fallback_summary(span.len())
        }
        Err(e) => {
            warn!("Summarization via {} failed: {e}; using placeholder", provider.name());
            fallback_summary(span.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedProvider;
    use crate::provider::{ChunkStream, ProviderFuture};

    #[test]
    fn transcript_prefixes_capitalized_roles() {
        let span = vec![Message::user("hi"), Message::assistant("hello")];
        assert_eq!(transcript(&span), "User: hi\nAssistant: hello\n");
    }

    #[test]
    fn request_carries_instruction_and_transcript() {
        let span = vec![Message::user("Build me a todo app")];
        let request = build_summarization_request(&span);
        assert_eq!(request.len(), 2);
        assert!(request[0].content.contains("brief summary"));
        assert!(request[1].content.starts_with("Please summarize this conversation:"));
        assert!(request[1].content.contains("User: Build me a todo app"));
    }

    #[test]
    fn fallback_counts_messages() {
        assert_eq!(
            fallback_summary(7),
            "Conversation with 7 messages about various topics."
        );
    }

    #[tokio::test]
    async fn successful_summary_is_trimmed() {
        let provider = ScriptedProvider::new().reply("  The user wants a todo app.\n");
        let summary = summarize(&provider, &[Message::user("x")], Duration::from_secs(1)).await;
        assert_eq!(summary, "The user wants a todo app.");
    }

    #[tokio::test]
    async fn provider_error_falls_back() {
        let provider = ScriptedProvider::new().fail("connection refused");
        let span = vec![Message::user("a"), Message::assistant("b")];
        let summary = summarize(&provider, &span, Duration::from_secs(1)).await;
        assert_eq!(summary, fallback_summary(2));
    }

    #[tokio::test]
    async fn blank_summary_falls_back() {
        let provider = ScriptedProvider::new().reply("   ");
        let summary = summarize(&provider, &[Message::user("a")], Duration::from_secs(1)).await;
        assert_eq!(summary, fallback_summary(1));
    }

    struct Stalled;

    impl ModelProvider for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn converse<'a>(
            &'a self,
            _messages: &'a [Message],
        ) -> ProviderFuture<'a, Result<String, ProviderError>> {
            Box::pin(futures::future::pending())
        }

        fn converse_stream(&self, _messages: Vec<Message>) -> ChunkStream {
            Box::pin(futures::stream::pending())
        }
    }

    #[tokio::test]
    async fn timeout_falls_back() {
        let span = vec![Message::user("a"); 3];
        let summary = summarize(&Stalled, &span, Duration::from_millis(20)).await;
        assert_eq!(summary, fallback_summary(3));
    }
}
