//! Chat tuning knobs with defaults.
//!
//! [`ChatConfig`] is what binaries fill in from their CLI flags; library
//! components take the pieces they need from it.

use std::time::Duration;

use crate::context::CompactionConfig;

/// Default number of most-recent messages kept verbatim.
pub const DEFAULT_RECENT_WINDOW: usize = 5;

/// Default word budget for a compacted context.
pub const DEFAULT_TOKEN_BUDGET: usize = 10_000;

/// Default deadline for the summarization call.
pub const DEFAULT_SUMMARY_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for chat turns.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Messages always preserved verbatim. Default: `5`.
    pub recent_window: usize,
    /// Approximate budget, counted in whitespace-delimited words. Default: `10000`.
    pub token_budget: usize,
    /// Deadline for the summarization call. Default: 60 seconds.
    pub summary_timeout: Duration,
    /// Registry id of the model used for summaries. `None` uses the
    /// registry default.
    pub summary_model: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            token_budget: DEFAULT_TOKEN_BUDGET,
            summary_timeout: DEFAULT_SUMMARY_TIMEOUT,
            summary_model: None,
        }
    }
}

impl ChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recent window. Values below 1 are raised to 1.
    pub fn with_recent_window(mut self, window: usize) -> Self {
        self.recent_window = window.max(1);
        self
    }

    /// Set the word budget. Values below 1 are raised to 1.
    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget.max(1);
        self
    }

    pub fn with_summary_timeout(mut self, timeout: Duration) -> Self {
        self.summary_timeout = timeout;
        self
    }

    pub fn with_summary_model(mut self, model_id: impl Into<String>) -> Self {
        self.summary_model = Some(model_id.into());
        self
    }

    /// The compaction settings derived from this config.
    pub fn compaction(&self) -> CompactionConfig {
        CompactionConfig {
            recent_window: self.recent_window,
            token_budget: self.token_budget,
            summary_timeout: self.summary_timeout,
        }
    }
}
