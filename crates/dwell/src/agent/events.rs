//! Events and handlers for observing a session.
//!
//! The [`SessionRunner`](super::runner::SessionRunner) reports what it does
//! through [`SessionEvent`] variants covering the whole session, from wake
//! to sleep. Callers implement [`EventHandler`] for logging, metrics, or a
//! live view. Handlers observe only; they cannot steer the loop.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use crate::context::budget::BudgetState;
use crate::context::sequence::SeqRange;
use crate::error::StoreError;
use crate::store::EndReason;
use tracing::{debug, info, warn};

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the runner during a session.
#[derive(Debug)]
pub enum SessionEvent<'a> {
    /// The session is open and the agent is in its start room.
    SessionStarted {
        agent_id: &'a str,
        /// `None` when the store could not create the session.
        session_id: Option<&'a str>,
        number: u32,
        room: &'a str,
    },
    /// A new turn is starting.
    TurnStart {
        turn: u32,
        room: &'a str,
        budget: &'a BudgetState,
    },
    /// The model returned text (may be alongside tool calls).
    Text(&'a str),
    /// Token usage for the turn call, already charged to the budget.
    TokenUsage {
        input_tokens: u64,
        output_tokens: u64,
        cost: Option<f64>,
    },
    /// Older turns were summarized.
    Compacted {
        turn: u32,
        original_count: usize,
        compacted_count: usize,
        /// Reported, never charged to the budget.
        summary_tokens: u64,
        /// Durable span covered, `None` if none of it was stored.
        range: Option<SeqRange>,
    },
    /// A tool is about to run.
    ToolExecuting { name: &'a str, arguments: &'a str },
    /// A tool finished (or was rejected before running).
    ToolResult {
        name: &'a str,
        call_id: &'a str,
        result: &'a str,
        success: bool,
    },
    /// A tool call failed validation and was not executed.
    ToolRejected { name: &'a str, reason: &'a str },
    /// The agent walked into another room.
    RoomChanged {
        from: &'a str,
        to: &'a str,
        atmosphere: Option<&'a str>,
    },
    /// A pending move was dropped because the transition is not allowed.
    MoveRejected { from: &'a str, to: &'a str },
    /// The one-shot low-budget warning fired.
    BudgetWarning { remaining: i64 },
    /// The combined end-of-turn notice appended to the transcript.
    Notification(&'a str),
    /// Old tool results were stubbed.
    Decayed {
        turn: u32,
        stubbed: usize,
        freed_chars: usize,
    },
    /// A store write failed; the session continues.
    StoreFailure {
        operation: &'a str,
        error: &'a StoreError,
    },
    /// A tool asked the agent to sleep; the session ends after this turn.
    SleepRequested { turn: u32 },
    /// The session is over.
    SessionEnded {
        end_reason: EndReason,
        turns: u32,
        total_spent: u64,
        summary: Option<&'a str>,
    },
}

/// Handler for session events.
///
/// # Example
///
/// ```ignore
/// struct Tally(AtomicU32);
///
/// impl EventHandler for Tally {
///     fn on_event(&self, event: &SessionEvent<'_>) {
///         if let SessionEvent::RoomChanged { .. } = event {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SessionEvent<'_>) {
        let _ = event;
    }
}

/// A handler that ignores everything.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let SessionEvent::Text(text) = event {
///         println!("{text}");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&SessionEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&SessionEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&SessionEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &SessionEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches every event to each inner handler, in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(my_metrics);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Conditionally add a handler without breaking the builder chain.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &SessionEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// An event handler that logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &SessionEvent<'_>) {
        match event {
            SessionEvent::SessionStarted {
                agent_id,
                session_id,
                number,
                room,
            } => {
                info!(
                    "{agent_id} woke in {room} (session #{number}, id {})",
                    session_id.unwrap_or("unpersisted")
                );
            }
            SessionEvent::TurnStart { turn, room, budget } => {
                info!("[turn {turn}] in {room}; {}", budget.to_log_string());
            }
            SessionEvent::Text(text) => {
                let preview: String = text.chars().take(200).collect();
                debug!(
                    "Model text: {preview}{}",
                    if text.chars().nth(200).is_some() { "..." } else { "" }
                );
            }
            SessionEvent::TokenUsage {
                input_tokens,
                output_tokens,
                cost,
            } => {
                debug!(
                    "Tokens: input={input_tokens}, output={output_tokens}, cost=${:.4}",
                    cost.unwrap_or(0.0)
                );
            }
            SessionEvent::Compacted {
                turn,
                original_count,
                compacted_count,
                summary_tokens,
                range,
            } => {
                info!(
                    "Turn {turn}: compacted {original_count} -> {compacted_count} messages \
                     ({summary_tokens} summary tokens, seqs {})",
                    range.map_or("none".to_string(), |r| format!("{}..={}", r.start_seq, r.end_seq))
                );
            }
            SessionEvent::ToolExecuting { name, .. } => {
                debug!("Executing tool: {name}");
            }
            SessionEvent::ToolResult {
                name,
                result,
                success,
                ..
            } => {
                debug!(
                    "Tool {name} {}: {} chars",
                    if *success { "ok" } else { "failed" },
                    result.chars().count()
                );
            }
            SessionEvent::ToolRejected { name, reason } => {
                info!("Rejected call to {name}: {reason}");
            }
            SessionEvent::RoomChanged { from, to, .. } => {
                info!("Moved {from} -> {to}");
            }
            SessionEvent::MoveRejected { from, to } => {
                warn!("Dropped move {from} -> {to}: transition not allowed");
            }
            SessionEvent::BudgetWarning { remaining } => {
                info!("Budget warning issued ({remaining} tokens left)");
            }
            SessionEvent::Notification(text) => {
                debug!("Notification: {text}");
            }
            SessionEvent::Decayed {
                turn,
                stubbed,
                freed_chars,
            } => {
                debug!("Turn {turn}: decayed {stubbed} tool result(s), freed {freed_chars} chars");
            }
            SessionEvent::StoreFailure { operation, .. } => {
                debug!("Store failure event for {operation}");
            }
            SessionEvent::SleepRequested { turn } => {
                info!("Sleep requested on turn {turn}");
            }
            SessionEvent::SessionEnded {
                end_reason,
                turns,
                total_spent,
                summary,
            } => {
                info!(
                    "Session ended ({end_reason}) after {turns} turns, {total_spent} tokens{}",
                    if summary.is_some() { ", summary saved" } else { "" }
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    impl EventHandler for Counter {
        fn on_event(&self, _event: &SessionEvent<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn composite_dispatches_to_all() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = CompositeEventHandler::new()
            .with(Counter(Arc::clone(&hits)))
            .with(NoopHandler)
            .with_if(false, Counter(Arc::clone(&hits)))
            .with(Counter(Arc::clone(&hits)));

        assert_eq!(handler.len(), 3);
        handler.on_event(&SessionEvent::SleepRequested { turn: 4 });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fn_handler_sees_events() {
        let moves = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&moves);
        let handler = FnEventHandler::new(move |event: &SessionEvent<'_>| {
            if let SessionEvent::RoomChanged { to, .. } = event {
                assert_eq!(*to, "garden");
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        handler.on_event(&SessionEvent::RoomChanged {
            from: "hallway",
            to: "garden",
            atmosphere: None,
        });
        handler.on_event(&SessionEvent::Text("hello"));
        assert_eq!(moves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn logging_handler_accepts_every_event() {
        let error = StoreError::Backend("disk full".into());
        let budget = crate::context::budget::BudgetTracker::new(10, 1).state();
        let events = [
            SessionEvent::TurnStart {
                turn: 1,
                room: "bedroom",
                budget: &budget,
            },
            SessionEvent::StoreFailure {
                operation: "append_message",
                error: &error,
            },
            SessionEvent::Compacted {
                turn: 2,
                original_count: 30,
                compacted_count: 11,
                summary_tokens: 40,
                range: Some(SeqRange {
                    start_seq: 1,
                    end_seq: 20,
                }),
            },
            SessionEvent::SessionEnded {
                end_reason: EndReason::Sleep,
                turns: 3,
                total_spent: 9,
                summary: None,
            },
        ];
        for event in &events {
            LoggingHandler.on_event(event);
        }
    }
}
