//! Durable session transcripts.
//!
//! The turn loop persists every message it appends, one record per model
//! turn, each compaction (as a range of message sequence numbers), and a
//! closing [`SessionEnd`]. All writes are best-effort from the loop's point
//! of view: a failed write is logged and the session carries on.
//!
//! Sequence numbers are 1-based and monotonic per session. Nothing is ever
//! deleted; compacted messages are marked, not removed.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: everything behind a mutex, with accessors for tests.
//! - [`FileStore`]: one directory per session with a JSON manifest and
//!   JSON-lines logs.

pub mod files;
pub mod memory;

pub use files::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::{Message, ToolCall};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`TranscriptStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Why a session ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The agent went to sleep on its own.
    Sleep,
    BudgetExhausted,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Sleep => write!(f, "sleep"),
            EndReason::BudgetExhausted => write!(f, "budget_exhausted"),
        }
    }
}

/// A summarized range of the transcript.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompactionRecord {
    /// First durable seq covered, inclusive.
    pub start_seq: u64,
    /// Last durable seq covered, inclusive.
    pub end_seq: u64,
    pub summary_text: String,
    /// Output tokens of the summarization call.
    pub summary_tokens: u64,
    /// Model that wrote the summary.
    pub model: String,
    /// Input tokens of the summarization call.
    pub source_tokens: u64,
}

/// A tool's result as recorded in a [`TurnRecord`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolResultRecord {
    pub name: String,
    pub result: String,
}

/// One model turn. Immutable once appended.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TurnRecord {
    /// 1-based turn number within the session.
    pub sequence: u32,
    /// Room the turn started in.
    pub room: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub tool_results: Vec<ToolResultRecord>,
}

/// Closing data for a session. After [`TranscriptStore::end_session`] the
/// session is sealed and further writes fail with
/// [`StoreError::SessionSealed`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionEnd {
    pub end_reason: EndReason,
    pub total_spent: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub total_cost: f64,
}

/// Overview of one stored session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionSummaryRow {
    pub id: String,
    pub agent_id: String,
    pub number: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_reason: Option<EndReason>,
    #[serde(default)]
    pub total_spent: u64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub summary: Option<String>,
    /// Messages appended so far, which is also the last assigned seq.
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub turn_count: u32,
}

impl SessionSummaryRow {
    fn open(id: String, agent_id: &str, number: u32) -> Self {
        Self {
            id,
            agent_id: agent_id.to_string(),
            number,
            started_at: Utc::now(),
            ended_at: None,
            end_reason: None,
            total_spent: 0,
            total_cost: 0.0,
            summary: None,
            message_count: 0,
            turn_count: 0,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.ended_at.is_some()
    }

    fn seal(&mut self, end: SessionEnd) {
        self.ended_at = Some(Utc::now());
        self.end_reason = Some(end.end_reason);
        self.total_spent = end.total_spent;
        self.total_cost = end.total_cost;
        self.summary = end.summary;
    }

    /// Newer of two sessions for the same agent: higher number wins, then
    /// later start.
    fn is_newer_than(&self, other: &SessionSummaryRow) -> bool {
        (self.number, self.started_at) > (other.number, other.started_at)
    }
}

/// A persisted transcript message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub seq: u64,
    pub message: Message,
    /// Room the agent was in when the message was appended.
    pub room: String,
    /// Turn number, `None` for messages appended before the first turn.
    #[serde(default)]
    pub turn: Option<u32>,
    /// Set once a compaction covers this message.
    #[serde(default)]
    pub compacted: bool,
    pub created_at: DateTime<Utc>,
}

/// Durable log of sessions, messages, compactions and turns.
///
/// Implementations must be object-safe and are shared across tasks, so
/// every method returns a boxed `Send` future.
pub trait TranscriptStore: Send + Sync {
    /// Open a new session and return its id.
    fn create_session<'a>(&'a self, agent_id: &'a str, number: u32) -> StoreFuture<'a, String>;

    /// Append a message and return its sequence number.
    fn append_message<'a>(
        &'a self,
        session_id: &'a str,
        message: &'a Message,
        room: &'a str,
        turn: Option<u32>,
    ) -> StoreFuture<'a, u64>;

    fn record_compaction<'a>(
        &'a self,
        session_id: &'a str,
        record: CompactionRecord,
    ) -> StoreFuture<'a, ()>;

    fn record_turn<'a>(&'a self, session_id: &'a str, record: TurnRecord) -> StoreFuture<'a, ()>;

    /// Seal the session.
    fn end_session<'a>(&'a self, session_id: &'a str, end: SessionEnd) -> StoreFuture<'a, ()>;

    /// The agent's most recent session, sealed or not.
    fn latest_session<'a>(&'a self, agent_id: &'a str)
    -> StoreFuture<'a, Option<SessionSummaryRow>>;
}

/// Build a session id: agent, zero-padded number, and start time. Characters
/// outside `[A-Za-z0-9_-]` in the agent id are replaced so the id is safe as
/// a directory name.
pub fn session_id_for(agent_id: &str, number: u32, at: DateTime<Utc>) -> String {
    let agent: String = agent_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{agent}-{number:04}-{}", at.format("%Y%m%dT%H%M%S%3f"))
}
