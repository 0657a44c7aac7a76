//! Chat-turn orchestration.
//!
//! A turn is split in two so the caller can stream the reply in between:
//!
//! ```text
//! begin_turn ─▶ (system prompt upsert, user append, compaction) ─▶ PreparedTurn
//!     caller streams PreparedTurn::provider.converse_stream(context)
//! finish_turn ─▶ assistant append (only for a completed reply)
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ChatConfig;
use crate::context::ContextCompactor;
use crate::error::ProviderError;
use crate::prompt::{detect_prompt_kind, system_prompt};
use crate::provider::ModelProvider;
use crate::registry::ModelRegistry;
use crate::store::ConversationStore;
use crate::{Message, preview};

/// Everything needed to run the model call for one turn.
pub struct PreparedTurn {
    /// Bounded context to send.
    pub context: Vec<Message>,
    /// Provider for the requested model.
    pub provider: Arc<dyn ModelProvider>,
    /// Number of messages stored for the session, including this turn.
    pub history_len: usize,
}

/// Ties the store, the model registry and compaction together.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    registry: ModelRegistry,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>, registry: ModelRegistry, config: ChatConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Record the user's message and build the context for the model call.
    ///
    /// An unknown `model_id` fails before the conversation is touched.
    pub async fn begin_turn(
        &self,
        session_id: &str,
        message: &str,
        model_id: Option<&str>,
    ) -> Result<PreparedTurn, ProviderError> {
        let provider = self.registry.provider(model_id)?;

        let kind = detect_prompt_kind(message);
        debug!(
            "Session '{session_id}': {kind:?} prompt for '{}'",
            preview(message, 60)
        );
        self.store
            .set_system_prompt(session_id, system_prompt(kind, message));
        self.store.append(session_id, Message::user(message));

        let history = self.store.get(session_id);
        let compacted = self.compactor(&provider).compact(&history).await;
        if compacted.is_compacted() {
            info!(
                "Session '{session_id}': compacted {} message(s) to {} ({} words)",
                history.len(),
                compacted.messages.len(),
                compacted.words
            );
        }

        Ok(PreparedTurn {
            context: compacted.into_messages(),
            provider,
            history_len: history.len(),
        })
    }

    /// Append the completed assistant reply.
    pub fn finish_turn(&self, session_id: &str, reply: impl Into<String>) {
        self.store.append(session_id, Message::assistant(reply));
    }

    /// Empty the session's conversation.
    pub fn clear(&self, session_id: &str) {
        info!("Session '{session_id}': cleared");
        self.store.clear(session_id);
    }

    /// Summaries use the configured summary model, else the registry
    /// default, else the turn's own provider.
    fn compactor(&self, turn_provider: &Arc<dyn ModelProvider>) -> ContextCompactor {
        let summarizer = self
            .registry
            .provider(self.config.summary_model.as_deref())
            .unwrap_or_else(|_| Arc::clone(turn_provider));
        ContextCompactor::new(summarizer, self.config.compaction())
    }
}
