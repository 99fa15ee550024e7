//! Convenience re-exports for common `dwell` types.
//!
//! ```ignore
//! use dwell::prelude::*;
//! ```
//!
//! Covers what a typical resident needs: a client, a store, rooms and
//! tools, the runner or host, and event handlers. Lower-level pieces
//! (sequence maps, the compaction engine, store records) stay in their
//! modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Message, ToolCall, ToolDef, json_schema_for};

// ── Model clients ───────────────────────────────────────────────────
pub use crate::api::{LlmClient, LlmUsage, OpenRouterClient, RetryConfig, ScriptedClient};

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{
    AgentHost, CompositeEventHandler, EventHandler, FnEventHandler, Inbox, InboxFuture,
    LoggingHandler, NoopHandler, SessionConfig, SessionEvent, SessionOutcome, SessionRunner,
    Toggle,
};
pub use crate::error::{SessionError, StoreError};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{BudgetState, CompactionConfig, DecayConfig};

// ── Rooms and tools ─────────────────────────────────────────────────
pub use crate::rooms::{Room, RoomRegistry, RoomState};
pub use crate::tools::{Command, FnTool, Tool, ToolContext, ToolFuture, ToolOutcome};

// ── Stores ──────────────────────────────────────────────────────────
pub use crate::store::{EndReason, FileStore, MemoryStore, TranscriptStore};
