//! Tool abstractions for the agent's function-calling.
//!
//! Every room capability (writing a note, tending a plant, going to sleep)
//! is a [`Tool`] implementor registered on a [`Room`](crate::rooms::Room).
//! Tools receive validated JSON arguments and a read-only [`ToolContext`],
//! and return a [`ToolOutcome`]. Side effects on the session are expressed
//! as [`Command`]s and room-state patches, which the turn loop applies.
//!
//! # Defining tools
//!
//! - **[`FnTool`]**: closure-based, synchronous, auto-parses arguments. Enough
//!   for tools that only read or patch room state.
//! - **`impl Tool`**: full struct with [`Tool::definition()`] and an async
//!   [`Tool::execute()`]. Use this when a tool awaits I/O.
//!
//! The universal tools (`move_to`, `check_budget`) live in
//! [`rooms::universal`](crate::rooms::universal).

pub mod core;
pub mod names;

pub use core::{
    Command, DEFAULT_MAX_RESULT_CHARS, FnTool, Tool, ToolContext, ToolFuture, ToolOutcome,
    log_tool_call, truncate_result, validate_tool_arguments,
};
