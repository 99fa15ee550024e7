//! Configuration for the [`SessionRunner`](super::runner::SessionRunner).
//!
//! Optional modules (decay, the end-of-session summary) are **enabled by
//! default**. Override them through [`SessionConfig`] fields or the
//! builder methods.
//!
//! # Examples
//!
//! Minimal configuration:
//!
//! ```
//! use dwell::agent::config::SessionConfig;
//!
//! let config = SessionConfig::new("anthropic/claude-sonnet-4", "You live in a small house.");
//! assert!(config.decay.enabled);
//! ```
//!
//! Customized:
//!
//! ```
//! use dwell::agent::config::{SessionConfig, Toggle};
//! use dwell::context::compaction::CompactionConfig;
//!
//! let config = SessionConfig {
//!     decay: Toggle::disabled(),
//!     ..SessionConfig::new("anthropic/claude-sonnet-4", "You live here.")
//! }
//! .with_budget(200_000, 20_000)
//! .with_start_room("study")
//! .with_compaction(CompactionConfig::new().with_recent_messages_to_keep(20));
//! assert_eq!(config.start_room, "study");
//! ```

use crate::context::budget::{BudgetTracker, DEFAULT_TOTAL_TOKENS, DEFAULT_WARNING_THRESHOLD};
use crate::context::compaction::CompactionConfig;
use crate::context::decay::DecayConfig;
use crate::tools::DEFAULT_MAX_RESULT_CHARS;

/// Room an agent wakes up in unless configured otherwise.
pub const DEFAULT_START_ROOM: &str = "bedroom";

// ── Generic toggle ────────────────────────────────────────────────

/// Generic enabled/disabled wrapper for module configurations.
///
/// When `enabled` is `false`, the module is skipped regardless of the inner
/// config values.
#[derive(Debug, Clone)]
pub struct Toggle<T: Default> {
    pub enabled: bool,
    pub config: T,
}

impl<T: Default> Toggle<T> {
    pub fn enabled(config: T) -> Self {
        Self {
            enabled: true,
            config,
        }
    }

    /// A disabled instance with default inner config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            config: T::default(),
        }
    }

    /// The inner config when enabled.
    pub fn active(&self) -> Option<&T> {
        self.enabled.then_some(&self.config)
    }
}

impl<T: Default> Default for Toggle<T> {
    fn default() -> Self {
        Self::enabled(T::default())
    }
}

// ── Session summary ───────────────────────────────────────────────

/// System prompt for the end-of-session summary.
pub const SESSION_SUMMARY_PROMPT: &str = "\
The day is over and you are about to fall asleep. In a few sentences, \
written in the second person, note what you did today, anything you left \
unfinished, and what you might want to do next time you wake. This note is \
all you will remember of today.";

/// The best-effort summary requested when a session ends. It is handed to
/// the next session's wake message.
#[derive(Debug, Clone)]
pub struct SessionSummaryConfig {
    pub prompt: String,
    pub max_tokens: u32,
    /// Model override; `None` uses the session model.
    pub model: Option<String>,
}

impl Default for SessionSummaryConfig {
    fn default() -> Self {
        Self {
            prompt: SESSION_SUMMARY_PROMPT.to_string(),
            max_tokens: 1024,
            model: None,
        }
    }
}

// ── SessionConfig ─────────────────────────────────────────────────

/// Everything a single session needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model for the main turn calls.
    pub model: String,
    pub system_prompt: String,
    pub start_room: String,
    /// Token allowance (input + output) for the session.
    pub total_budget: u64,
    /// Remaining-token level at which the model is warned, once.
    pub warning_threshold: u64,
    /// Replaces the default low-budget notice text.
    pub budget_warning_message: Option<String>,
    /// Response token cap per turn call. `None` uses the client default.
    pub max_tokens: Option<u32>,
    /// Tool results longer than this many characters are truncated.
    pub max_tool_result_chars: usize,
    /// Append a "where you are" section to the system prompt each turn.
    pub location_in_prompt: bool,
    pub compaction: CompactionConfig,
    pub decay: Toggle<DecayConfig>,
    pub session_summary: Toggle<SessionSummaryConfig>,
}

impl SessionConfig {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            start_room: DEFAULT_START_ROOM.to_string(),
            total_budget: DEFAULT_TOTAL_TOKENS,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            budget_warning_message: None,
            max_tokens: None,
            max_tool_result_chars: DEFAULT_MAX_RESULT_CHARS,
            location_in_prompt: true,
            compaction: CompactionConfig::default(),
            decay: Toggle::default(),
            session_summary: Toggle::default(),
        }
    }

    pub fn with_budget(mut self, total: u64, warning_threshold: u64) -> Self {
        self.total_budget = total;
        self.warning_threshold = warning_threshold;
        self
    }

    pub fn with_budget_warning(mut self, message: impl Into<String>) -> Self {
        self.budget_warning_message = Some(message.into());
        self
    }

    pub fn with_start_room(mut self, room: impl Into<String>) -> Self {
        self.start_room = room.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_tool_result_chars(mut self, chars: usize) -> Self {
        self.max_tool_result_chars = chars;
        self
    }

    pub fn with_location_in_prompt(mut self, enabled: bool) -> Self {
        self.location_in_prompt = enabled;
        self
    }

    pub fn with_compaction(mut self, compaction: CompactionConfig) -> Self {
        self.compaction = compaction;
        self
    }

    pub fn with_decay(mut self, decay: DecayConfig) -> Self {
        self.decay = Toggle::enabled(decay);
        self
    }

    pub fn without_decay(mut self) -> Self {
        self.decay = Toggle::disabled();
        self
    }

    pub fn without_session_summary(mut self) -> Self {
        self.session_summary = Toggle::disabled();
        self
    }

    /// A fresh tracker for this config's budget.
    pub fn budget_tracker(&self) -> BudgetTracker {
        let tracker = BudgetTracker::new(self.total_budget, self.warning_threshold);
        match self.budget_warning_message {
            Some(ref msg) => tracker.with_warning_message(msg.clone()),
            None => tracker,
        }
    }
}
