//! Language-model collaborator: the [`LlmClient`] trait and its implementations.
//!
//! The turn loop and the compaction engine only ever see `&dyn LlmClient`.
//! Implementations in this module:
//!
//! - [`openrouter`]: [`OpenRouterClient`], chat completions over reqwest.
//! - [`mock`]: [`ScriptedClient`], replays canned responses for tests.
//!
//! Supporting modules:
//!
//! - [`retry`]: transient error detection (429, 5xx, network timeouts) with
//!   exponential backoff. Never retries 400/401 errors.
//! - [`pricing`]: per-model pricing tables for cost estimates when the
//!   provider does not report cost itself.

pub mod mock;
pub mod openrouter;
pub mod pricing;
pub mod retry;

use crate::{Message, ToolCall, ToolDef};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub use mock::ScriptedClient;
pub use openrouter::OpenRouterClient;
pub use pricing::{ModelPricing, pricing_for_model};
pub use retry::RetryConfig;

/// Boxed future returned by [`LlmClient::send`].
pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Result<LlmResponse, String>> + Send + 'a>>;

/// One call to the model.
#[derive(Debug, Clone, Copy)]
pub struct LlmRequest<'a> {
    pub system_prompt: &'a str,
    pub messages: &'a [Message],
    /// Tool definitions, or `None` for plain completions (summaries).
    pub tools: Option<&'a [ToolDef]>,
    /// Override the client's default model for this call.
    pub model: Option<&'a str>,
    /// Override the client's default response token limit for this call.
    pub max_tokens: Option<u32>,
}

impl<'a> LlmRequest<'a> {
    pub fn new(system_prompt: &'a str, messages: &'a [Message]) -> Self {
        Self {
            system_prompt,
            messages,
            tools: None,
            model: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: &'a [ToolDef]) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_model(mut self, model: Option<&'a str>) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage for one call.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// USD cost, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl LlmUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cost: None,
        }
    }
}

/// Why the model stopped generating.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`.
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            None | Some("stop") | Some("end_turn") => StopReason::EndTurn,
            Some("tool_calls") | Some("tool_use") => StopReason::ToolUse,
            Some("length") | Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }
}

/// What the model sent back.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: LlmUsage,
    pub stop_reason: StopReason,
}

impl LlmResponse {
    /// A text-only reply.
    pub fn text(content: impl Into<String>, usage: LlmUsage) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            usage,
            stop_reason: StopReason::EndTurn,
        }
    }

    /// A reply that requests tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>, usage: LlmUsage) -> Self {
        Self {
            content: None,
            tool_calls: calls,
            usage,
            stop_reason: StopReason::ToolUse,
        }
    }

    /// Attach narration text to a tool-call reply (builder pattern).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// A chat-completion capable language model.
///
/// Uses a boxed future so that the trait is dyn-compatible; the runner holds
/// `&dyn LlmClient`. Errors are strings so [`retry`] can classify them.
pub trait LlmClient: Send + Sync {
    fn send<'a>(&'a self, request: LlmRequest<'a>) -> LlmFuture<'a>;

    /// Default model identifier, recorded alongside compactions.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_from_finish_reason() {
        assert_eq!(StopReason::from_finish_reason(None), StopReason::EndTurn);
        assert_eq!(
            StopReason::from_finish_reason(Some("tool_calls")),
            StopReason::ToolUse
        );
        assert_eq!(
            StopReason::from_finish_reason(Some("length")),
            StopReason::MaxTokens
        );
        assert_eq!(
            StopReason::from_finish_reason(Some("content_filter")),
            StopReason::Other("content_filter".into())
        );
    }

    #[test]
    fn request_builder() {
        let messages = vec![Message::user("hi")];
        let tools = vec![ToolDef::new("t", "d", serde_json::json!({"type": "object"}))];
        let req = LlmRequest::new("sys", &messages)
            .with_tools(&tools)
            .with_model(Some("cheap/model"))
            .with_max_tokens(256);
        assert_eq!(req.tools.map(|t| t.len()), Some(1));
        assert_eq!(req.model, Some("cheap/model"));
        assert_eq!(req.max_tokens, Some(256));
    }
}
