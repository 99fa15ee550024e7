//! Session runtime for an LLM agent that lives in a simulated house.
//!
//! `dwell` runs one bounded *session* of an autonomous agent: it wakes in a
//! room, calls a language model in a loop, executes the tools the model asks
//! for, moves between rooms, and eventually goes to sleep or runs out of
//! token budget. The core abstraction is the
//! [`SessionRunner`](agent::runner::SessionRunner), a turn loop that keeps
//! five lifecycles consistent with each other:
//!
//! - a token [`BudgetTracker`](context::budget::BudgetTracker),
//! - a context window under [compaction](context::compaction) pressure,
//! - a [decaying](context::decay) transcript,
//! - a [room](rooms) transition state machine,
//! - a durable [transcript store](store) whose sequence numbers survive
//!   summarization (see [`SequenceMap`](context::sequence::SequenceMap)).
//!
//! # Getting started
//!
//! ```ignore
//! use dwell::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api_key = std::env::var("OPENROUTER_KEY")?;
//!     let client = OpenRouterClient::new(api_key, "anthropic/claude-sonnet-4")?;
//!     let store = MemoryStore::new();
//!
//!     let mut rooms = RoomRegistry::new();
//!     rooms.register(Room::new("bedroom", "Bedroom").with_description("A quiet room."));
//!
//!     let config = SessionConfig::new("anthropic/claude-sonnet-4", "You live here.")
//!         .with_budget(200_000, 20_000)
//!         .with_start_room("bedroom");
//!
//!     let outcome = SessionRunner::new(&client, &store, &mut rooms, config)
//!         .with_event_handler(&LoggingHandler)
//!         .run("resident")
//!         .await?;
//!
//!     println!("{} after {} turns", outcome.end_reason, outcome.turns);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`agent`] | [`SessionRunner`](agent::runner::SessionRunner) turn loop, [`AgentHost`](agent::host::AgentHost), config, events |
//! | [`context`] | Budget tracker, decay engine, compaction engine, sequence map |
//! | [`rooms`] | [`Room`](rooms::Room), [`RoomRegistry`](rooms::RoomRegistry), universal tools |
//! | [`tools`] | [`Tool`](tools::Tool) trait, [`ToolOutcome`](tools::ToolOutcome), commands, argument validation |
//! | [`store`] | [`TranscriptStore`](store::TranscriptStore) trait, in-memory and file-backed stores |
//! | [`api`] | [`LlmClient`](api::LlmClient) trait, OpenRouter client, retry, pricing, scripted mock |

pub mod agent;
pub mod api;
pub mod context;
pub mod error;
pub mod prelude;
pub mod rooms;
pub mod store;
pub mod tools;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use context::decay::DecayMeta;
pub use error::{SessionError, StoreError};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Tool input schemas are built this way so the
/// argument struct a tool deserializes into is also what the model sees.
///
/// # Example
///
/// ```
/// use dwell::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct MoveArgs {
///     room: String,
/// }
///
/// let schema = json_schema_for::<MoveArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"room".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A message in the session transcript.
///
/// `decay` is bookkeeping for the [decay engine](context::decay). It is
/// skipped by serde, so it never reaches the model or the durable store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip)]
    pub decay: Option<DecayMeta>,
}

impl Message {
    fn with_role(role: MessageRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            decay: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, Some(content.into()))
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, Some(content.into()))
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::assistant(None, calls)
    }

    /// Assistant message carrying optional text alongside optional tool calls.
    pub fn assistant(content: Option<String>, calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::with_role(MessageRole::Assistant, content);
        if !calls.is_empty() {
            msg.tool_calls = Some(calls);
        }
        msg
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(MessageRole::Tool, Some(content.into()));
        msg.tool_call_id = Some(call_id.into());
        msg
    }

    /// Attach decay metadata (builder pattern).
    pub fn with_decay(mut self, turn: u32, tool_name: impl Into<String>) -> Self {
        self.decay = Some(DecayMeta {
            turn,
            tool_name: tool_name.into(),
        });
        self
    }

    /// Text content, or `""` when the message carries none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Names of the tools this message calls, in order.
    pub fn called_tool_names(&self) -> Vec<&str> {
        self.tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| c.function.name.as_str())
            .collect()
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition sent to the model (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    /// Create a function-calling tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool call returned by the model.
///
/// Arguments stay in their wire form (a JSON string) until the turn loop
/// validates them against the tool's schema.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

// ── Text helpers ───────────────────────────────────────────────────

/// Keep the first `max_chars` characters of `s`, appending `suffix` when
/// anything was cut. Works on char boundaries, never bytes.
pub fn truncate_chars(s: &str, max_chars: usize, suffix: &str) -> String {
    if s.chars().nth(max_chars).is_none() {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str(suffix);
    out
}
