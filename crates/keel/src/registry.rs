//! Model ids → provider backends.
//!
//! Front ends refer to models by short ids (`"llama"`, `"claude"`). The
//! [`ModelRegistry`] maps each id to a display name and a shared
//! [`ModelProvider`], and knows which id is the default.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::provider::ollama::{DEFAULT_OLLAMA_URL, OLLAMA_URL_ENV};
use crate::provider::openrouter::OPENROUTER_KEY_ENV;
use crate::provider::{ModelProvider, OllamaProvider, OpenRouterProvider};

/// Id of the built-in local model.
pub const LLAMA_ID: &str = "llama";
/// Model served by the built-in local entry.
pub const LLAMA_MODEL: &str = "llama3.2:latest";
/// Id of the built-in hosted model.
pub const CLAUDE_ID: &str = "claude";
/// Model served by the built-in hosted entry.
pub const CLAUDE_MODEL: &str = "anthropic/claude-sonnet-4";

/// One registered model.
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    /// Backend label shown in listings (e.g. `"ollama"`).
    pub backend: String,
    provider: Arc<dyn ModelProvider>,
}

/// Public description of a model, as served by `GET /api/models`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub backend: String,
}

/// Serializable registry listing.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelListing {
    pub models: BTreeMap<String, ModelInfo>,
    pub default: String,
}

/// Ordered set of models with a default.
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    default_id: String,
}

impl ModelRegistry {
    /// Create an empty registry whose default is `default_id`.
    pub fn new(default_id: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            default_id: default_id.into(),
        }
    }

    /// Register (or replace) a model.
    pub fn register(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        backend: impl Into<String>,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        let entry = ModelEntry {
            id: id.into(),
            name: name.into(),
            backend: backend.into(),
            provider,
        };
        if let Some(idx) = self.entries.iter().position(|e| e.id == entry.id) {
            self.entries[idx] = entry;
        } else {
            self.entries.push(entry);
        }
        self
    }

    /// The built-in models: a local Ollama model (the default) and, when an
    /// OpenRouter key is given, a hosted model.
    pub fn builtin(ollama_url: &str, openrouter_key: Option<&str>) -> Result<Self, ProviderError> {
        let mut registry = Self::new(LLAMA_ID).register(
            LLAMA_ID,
            "Llama 3.2",
            "ollama",
            Arc::new(OllamaProvider::new(ollama_url, LLAMA_MODEL)),
        );

        match openrouter_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                registry = registry.register(
                    CLAUDE_ID,
                    "Claude Sonnet",
                    "openrouter",
                    Arc::new(OpenRouterProvider::new(key, CLAUDE_MODEL)?),
                );
            }
            None => warn!(
                "{OPENROUTER_KEY_ENV} not set; the '{CLAUDE_ID}' model is unavailable"
            ),
        }

        info!(
            "Model registry: {} model(s), default '{}'",
            registry.entries.len(),
            registry.default_id
        );
        Ok(registry)
    }

    /// [`builtin`](Self::builtin) configured from `OLLAMA_URL` and
    /// `OPENROUTER_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let ollama_url =
            std::env::var(OLLAMA_URL_ENV).unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let key = std::env::var(OPENROUTER_KEY_ENV).ok();
        Self::builtin(&ollama_url, key.as_deref())
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Look up the provider for `id`, or for the default when `id` is `None`.
    pub fn provider(&self, id: Option<&str>) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        let id = id.unwrap_or(self.default_id.as_str());
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| Arc::clone(&e.provider))
            .ok_or_else(|| ProviderError::Unavailable(format!("unknown model '{id}'")))
    }

    pub fn listing(&self) -> ModelListing {
        ModelListing {
            models: self
                .entries
                .iter()
                .map(|e| {
                    (
                        e.id.clone(),
                        ModelInfo {
                            name: e.name.clone(),
                            backend: e.backend.clone(),
                        },
                    )
                })
                .collect(),
            default: self.default_id.clone(),
        }
    }
}
