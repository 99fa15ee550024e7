//! Tool abstraction for the agent's function-calling.
//!
//! The [`Tool`] trait defines the interface every room tool implements: a
//! static API definition (name, description, JSON schema) and an async
//! `execute` method. Tools do not touch the session directly. They return a
//! [`ToolOutcome`] carrying their text result, an optional room-state patch,
//! and any [`Command`]s for the turn loop (sleep, move).

use crate::context::budget::BudgetState;
use crate::rooms::{RoomRegistry, RoomState};
use crate::{ToolDef, truncate_chars};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, trace};

/// Maximum tool output, in characters, before truncation.
pub const DEFAULT_MAX_RESULT_CHARS: usize = 30_000;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolOutcome> + Send + 'a>>;

// ── Commands ───────────────────────────────────────────────────────

/// A request from a tool to the turn loop.
///
/// Commands are drained into the session's signals after each tool call.
/// A move is applied at the end of the turn, after all tools have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// End the session after this turn.
    Sleep,
    /// Move to the given room id at the end of this turn.
    MoveTo(String),
}

// ── ToolOutcome ────────────────────────────────────────────────────

/// Result of one tool execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: String,
    /// Shallow patch for the state of the room the tool ran in.
    pub state_update: Option<RoomState>,
    pub commands: Vec<Command>,
}

impl ToolOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            ..Self::default()
        }
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_state_update(mut self, patch: RoomState) -> Self {
        self.state_update = Some(patch);
        self
    }

    /// Text for the tool-result message. Failures read `"Error: ..."`.
    pub fn to_content(&self) -> String {
        if self.success || self.output.starts_with("Error:") {
            self.output.clone()
        } else {
            format!("Error: {}", self.output)
        }
    }
}

// ── ToolContext ────────────────────────────────────────────────────

/// Read-only view of the session handed to [`Tool::execute`].
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub agent_id: &'a str,
    /// `None` when the session runs unpersisted.
    pub session_id: Option<&'a str>,
    pub session_number: u32,
    pub current_room: &'a str,
    pub turn: u32,
    pub budget: &'a BudgetState,
    pub rooms: &'a RoomRegistry,
}

impl<'a> ToolContext<'a> {
    /// State of the room the tool is running in, if it keeps any.
    pub fn room_state(&self) -> Option<&'a RoomState> {
        self.rooms.room_state(self.current_room)
    }
}

impl fmt::Debug for ToolContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("agent_id", &self.agent_id)
            .field("session_id", &self.session_id)
            .field("current_room", &self.current_room)
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool the agent can invoke via function-calling.
///
/// Arguments arrive already parsed and validated against the definition's
/// schema. Errors should be returned as [`ToolOutcome::failure`] rather than
/// panicking; the loop passes the text back to the model regardless.
///
/// # Example
///
/// ```ignore
/// struct Look;
///
/// impl Tool for Look {
///     fn definition(&self) -> ToolDef {
///         ToolDef::new("look", "Look around the room.", json!({"type": "object"}))
///     }
///
///     fn name(&self) -> &str {
///         "look"
///     }
///
///     fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolContext<'a>) -> ToolFuture<'a> {
///         Box::pin(async move {
///             let text = ctx.rooms.describe(ctx.current_room).unwrap_or_default();
///             ToolOutcome::ok(text)
///         })
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// The tool definition sent to the model.
    fn definition(&self) -> ToolDef;

    /// The name the model calls the tool by. Must match the definition.
    fn name(&self) -> &str;

    /// Execute the tool with validated JSON arguments.
    ///
    /// Uses a boxed future so the trait stays dyn-compatible.
    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolContext<'a>) -> ToolFuture<'a>;
}

// ── FnTool ─────────────────────────────────────────────────────────

type ErasedHandler = Box<dyn Fn(Value, &ToolContext<'_>) -> ToolOutcome + Send + Sync>;

/// A synchronous closure-based tool.
///
/// Most room tools only read and patch room state, so they need no I/O.
/// The handler receives typed arguments deserialized from the validated
/// JSON; a deserialization failure becomes a tool failure.
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct WaterArgs { plant: String }
///
/// let tool = FnTool::new(
///     ToolDef::new("water", "Water a plant.", json_schema_for::<WaterArgs>()),
///     |args: WaterArgs, _ctx| ToolOutcome::ok(format!("You water the {}.", args.plant)),
/// );
/// ```
pub struct FnTool {
    def: ToolDef,
    handler: ErasedHandler,
}

impl FnTool {
    pub fn new<A, F>(def: ToolDef, handler: F) -> Self
    where
        A: serde::de::DeserializeOwned + 'static,
        F: Fn(A, &ToolContext<'_>) -> ToolOutcome + Send + Sync + 'static,
    {
        let erased = move |raw: Value, ctx: &ToolContext<'_>| match serde_json::from_value::<A>(raw)
        {
            Ok(args) => handler(args, ctx),
            Err(e) => ToolOutcome::failure(format!("invalid tool arguments: {e}")),
        };
        Self {
            def,
            handler: Box::new(erased),
        }
    }
}

impl Tool for FnTool {
    fn definition(&self) -> ToolDef {
        self.def.clone()
    }

    fn name(&self) -> &str {
        &self.def.function.name
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolContext<'a>) -> ToolFuture<'a> {
        let outcome = (self.handler)(args, ctx);
        Box::pin(std::future::ready(outcome))
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.def.function.name)
            .finish()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Parse and validate raw tool-call arguments against a tool's schema.
///
/// An empty argument string is read as `{}`, which some providers send for
/// parameterless calls. On failure the message is meant for the model,
/// so it can correct itself.
pub fn validate_tool_arguments(def: &ToolDef, arguments: &str) -> Result<Value, String> {
    let name = def.name();
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        format!(
            "invalid JSON arguments for tool '{name}': {e}. \
             Please provide valid JSON matching the tool's parameter schema."
        )
    })?;

    // An invalid schema is the tool author's bug; don't punish the model.
    let Ok(validator) = jsonschema::validator_for(&def.function.parameters) else {
        debug!("Skipping validation for {name}: schema does not compile");
        return Ok(value);
    };

    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(format!(
            "argument validation failed for tool '{name}':\n{}\n\
             Please fix the arguments and try again.",
            errors.join("\n")
        ))
    }
}

/// Log a tool call at INFO level with a truncated preview of arguments.
pub fn log_tool_call(name: &str, arguments: &str) {
    info!("[tool] {name}({})", truncate_chars(arguments, 120, "..."));
    trace!("[tool] {name} arguments: {arguments}");
}

/// Truncate a tool result to at most `max_chars` characters, appending a
/// notice if trimmed.
pub fn truncate_result(s: String, max_chars: usize) -> String {
    let total = s.chars().count();
    if total > max_chars {
        format!(
            "{}\n[truncated: {total} chars total]",
            truncate_chars(&s, max_chars, "...")
        )
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::budget::BudgetTracker;
    use crate::json_schema_for;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct NoteArgs {
        text: String,
        #[serde(default)]
        pinned: bool,
    }

    fn note_def() -> ToolDef {
        ToolDef::new("write_note", "Write a note.", json_schema_for::<NoteArgs>())
    }

    #[test]
    fn valid_arguments_parse() {
        let value = validate_tool_arguments(&note_def(), r#"{"text": "hello"}"#).unwrap();
        assert_eq!(value["text"], "hello");
    }

    #[test]
    fn empty_arguments_read_as_empty_object() {
        let def = ToolDef::new("look", "Look.", json!({"type": "object", "properties": {}}));
        assert_eq!(validate_tool_arguments(&def, "").unwrap(), json!({}));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = validate_tool_arguments(&note_def(), "{text: hello").unwrap_err();
        assert!(err.contains("invalid JSON arguments for tool 'write_note'"));
    }

    #[test]
    fn schema_violation_names_the_path() {
        let err = validate_tool_arguments(&note_def(), r#"{"text": 5}"#).unwrap_err();
        assert!(err.contains("argument validation failed for tool 'write_note'"));
        assert!(err.contains("/text"));

        let err = validate_tool_arguments(&note_def(), "{}").unwrap_err();
        assert!(err.contains("text"));
    }

    #[test]
    fn failure_content_is_prefixed_once() {
        assert_eq!(ToolOutcome::failure("no such room").to_content(), "Error: no such room");
        assert_eq!(ToolOutcome::failure("Error: already").to_content(), "Error: already");
        assert_eq!(ToolOutcome::ok("fine").to_content(), "fine");
    }

    #[test]
    fn outcome_builders_accumulate() {
        let mut patch = RoomState::new();
        patch.insert("lamp".into(), json!("on"));
        let outcome = ToolOutcome::ok("done")
            .with_command(Command::MoveTo("garden".into()))
            .with_command(Command::Sleep)
            .with_state_update(patch.clone());
        assert_eq!(
            outcome.commands,
            vec![Command::MoveTo("garden".into()), Command::Sleep]
        );
        assert_eq!(outcome.state_update, Some(patch));
    }

    #[tokio::test]
    async fn fn_tool_deserializes_and_runs() {
        let tool = FnTool::new(note_def(), |args: NoteArgs, ctx| {
            ToolOutcome::ok(format!(
                "{} in {} (pinned: {})",
                args.text, ctx.current_room, args.pinned
            ))
        });
        let rooms = RoomRegistry::new();
        let budget = BudgetTracker::new(1000, 100).state();
        let ctx = ToolContext {
            agent_id: "resident",
            session_id: None,
            session_number: 1,
            current_room: "study",
            turn: 1,
            budget: &budget,
            rooms: &rooms,
        };

        let outcome = tool.execute(json!({"text": "hi"}), &ctx).await;
        assert!(outcome.success);
        assert_eq!(outcome.output, "hi in study (pinned: false)");

        let outcome = tool.execute(json!({"text": 1}), &ctx).await;
        assert!(!outcome.success);
        assert!(outcome.to_content().starts_with("Error: invalid tool arguments"));
    }

    #[test]
    fn truncate_short_unchanged() {
        assert_eq!(truncate_result("hello".into(), 100), "hello");
    }

    #[test]
    fn truncate_long_is_cut() {
        let result = truncate_result("é".repeat(200), 50);
        assert!(result.starts_with(&"é".repeat(50)));
        assert!(result.contains("[truncated: 200 chars total]"));
    }
}
