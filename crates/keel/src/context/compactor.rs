//! Summarize-and-trim compaction.
//!
//! A conversation no longer than the recent window is passed through as-is.
//! A longer one becomes:
//!
//! ```text
//! [system: "Earlier conversation summary: …"] + last `recent_window` messages
//! ```
//!
//! after which whole messages are dropped from the front of the recent part
//! (index 1 onward) until the word total fits the budget. Index 0, the
//! summary, is never dropped.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::summarizer::{self, SUMMARY_PREFIX};
use crate::Message;
use crate::config::{DEFAULT_RECENT_WINDOW, DEFAULT_SUMMARY_TIMEOUT, DEFAULT_TOKEN_BUDGET};
use crate::provider::ModelProvider;

/// Compaction settings.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Most-recent messages kept verbatim.
    pub recent_window: usize,
    /// Word budget for the whole compacted context.
    pub token_budget: usize,
    /// Deadline for the summarization call.
    pub summary_timeout: Duration,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            token_budget: DEFAULT_TOKEN_BUDGET,
            summary_timeout: DEFAULT_SUMMARY_TIMEOUT,
        }
    }
}

/// Context ready to send to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactedContext {
    pub messages: Vec<Message>,
    /// Earlier messages folded into the summary (0 when no compaction ran).
    pub summarized: usize,
    /// Recent messages dropped to meet the word budget.
    pub evicted: usize,
    /// Word total of `messages`.
    pub words: usize,
}

impl CompactedContext {
    fn passthrough(messages: Vec<Message>) -> Self {
        let words = total_words(&messages);
        Self {
            messages,
            summarized: 0,
            evicted: 0,
            words,
        }
    }

    /// Whether an earlier span was replaced by a summary.
    pub fn is_compacted(&self) -> bool {
        self.summarized > 0
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Sum of [`Message::word_count`] over `messages`.
pub fn total_words(messages: &[Message]) -> usize {
    messages.iter().map(Message::word_count).sum()
}

/// Drop messages at index 1 until the word total is within `budget` or only
/// the first message remains.
///
/// Returns the number of messages removed.
pub fn trim_to_budget(context: &mut Vec<Message>, budget: usize) -> usize {
    let mut total = total_words(context);
    let mut removed = 0;
    while total > budget && context.len() > 1 {
        let dropped = context.remove(1);
        total -= dropped.word_count();
        removed += 1;
    }
    removed
}

/// Produces bounded contexts from full conversations.
pub struct ContextCompactor {
    summarizer: Arc<dyn ModelProvider>,
    config: CompactionConfig,
}

impl ContextCompactor {
    /// Create a compactor that summarizes with `summarizer`.
    pub fn new(summarizer: Arc<dyn ModelProvider>, config: CompactionConfig) -> Self {
        Self { summarizer, config }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Compact `conversation` into a context that fits the configured window
    /// and budget.
    pub async fn compact(&self, conversation: &[Message]) -> CompactedContext {
        let window = self.config.recent_window.max(1);
        if conversation.len() <= window {
            return CompactedContext::passthrough(conversation.to_vec());
        }

        let split = conversation.len() - window;
        let (earlier, recent) = conversation.split_at(split);

        let summary = summarizer::summarize(
            self.summarizer.as_ref(),
            earlier,
            self.config.summary_timeout,
        )
        .await;

        let mut context = Vec::with_capacity(recent.len() + 1);
        context.push(Message::system(format!("{SUMMARY_PREFIX}{summary}")));
        context.extend_from_slice(recent);

        let evicted = trim_to_budget(&mut context, self.config.token_budget);
        let words = total_words(&context);

        debug!(
            "Compacted {} message(s): summarized {}, kept {}, evicted {}, {} words (budget {})",
            conversation.len(),
            earlier.len(),
            context.len() - 1,
            evicted,
            words,
            self.config.token_budget,
        );

        CompactedContext {
            messages: context,
            summarized: earlier.len(),
            evicted,
            words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use crate::context::summarizer::fallback_summary;
    use crate::provider::ScriptedProvider;

    fn conversation(len: usize) -> Vec<Message> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {i}"))
                } else {
                    Message::assistant(format!("answer {i}"))
                }
            })
            .collect()
    }

    fn compactor(provider: ScriptedProvider, window: usize, budget: usize) -> ContextCompactor {
        ContextCompactor::new(
            Arc::new(provider),
            CompactionConfig {
                recent_window: window,
                token_budget: budget,
                summary_timeout: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test]
    async fn short_conversation_is_unchanged() {
        let provider = Arc::new(ScriptedProvider::new());
        let compactor = ContextCompactor::new(provider.clone(), CompactionConfig::default());
        for len in 0..=5 {
            let conv = conversation(len);
            let ctx = compactor.compact(&conv).await;
            assert_eq!(ctx.messages, conv);
            assert!(!ctx.is_compacted());
        }
        assert!(provider.requests().is_empty(), "no summary call expected");
    }

    #[tokio::test]
    async fn long_conversation_gets_summary_plus_window() {
        let ctx = compactor(ScriptedProvider::new().reply("They discussed apps."), 5, 10_000)
            .compact(&conversation(12))
            .await;

        assert_eq!(ctx.messages.len(), 6);
        assert_eq!(ctx.messages[0].role, MessageRole::System);
        assert_eq!(
            ctx.messages[0].content,
            "Earlier conversation summary: They discussed apps."
        );
        assert_eq!(ctx.messages[1..], conversation(12)[7..]);
        assert_eq!(ctx.summarized, 7);
        assert_eq!(ctx.evicted, 0);
    }

    #[tokio::test]
    async fn summary_request_contains_only_earlier_span() {
        let provider = Arc::new(ScriptedProvider::new().reply("summary"));
        let compactor = ContextCompactor::new(
            provider.clone(),
            CompactionConfig {
                recent_window: 2,
                ..Default::default()
            },
        );
        compactor.compact(&conversation(4)).await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let transcript = &requests[0][1].content;
        assert!(transcript.contains("User: question 0"));
        assert!(transcript.contains("Assistant: answer 1"));
        assert!(!transcript.contains("question 2"));
    }

    #[tokio::test]
    async fn provider_failure_uses_placeholder_with_exact_count() {
        let ctx = compactor(ScriptedProvider::new().fail("offline"), 5, 10_000)
            .compact(&conversation(12))
            .await;
        assert_eq!(
            ctx.messages[0].content,
            format!("Earlier conversation summary: {}", fallback_summary(7))
        );
        assert!(
            ctx.messages[0]
                .content
                .ends_with("Conversation with 7 messages about various topics.")
        );
    }

    #[tokio::test]
    async fn budget_trims_oldest_recent_messages_first() {
        // Summary is 4 words ("Earlier conversation summary: short"), each
        // recent message 2 words. Budget 9 keeps the summary + 2 messages.
        let ctx = compactor(ScriptedProvider::new().reply("short"), 5, 9)
            .compact(&conversation(8))
            .await;

        assert_eq!(ctx.messages.len(), 3);
        assert_eq!(ctx.evicted, 3);
        assert_eq!(ctx.messages[1].content, "question 6");
        assert_eq!(ctx.messages[2].content, "answer 7");
        assert_eq!(ctx.words, 8);
    }

    #[tokio::test]
    async fn tiny_budget_keeps_only_summary() {
        let ctx = compactor(ScriptedProvider::new().reply("a long summary text"), 3, 1)
            .compact(&conversation(10))
            .await;
        assert_eq!(ctx.messages.len(), 1);
        assert!(ctx.messages[0].content.starts_with("Earlier conversation summary:"));
        assert_eq!(ctx.evicted, 3);
    }

    #[test]
    fn trim_never_removes_first_message() {
        let mut context = vec![
            Message::system("one two three four five"),
            Message::user("six seven"),
            Message::user("eight"),
        ];
        let removed = trim_to_budget(&mut context, 0);
        assert_eq!(removed, 2);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].content, "one two three four five");
    }

    #[test]
    fn trim_within_budget_is_noop() {
        let mut context = vec![Message::system("a"), Message::user("b c")];
        assert_eq!(trim_to_budget(&mut context, 3), 0);
        assert_eq!(context.len(), 2);
    }
}
