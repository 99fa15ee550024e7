//! The turn loop: one session from wake to sleep.
//!
//! Each turn:
//!
//! 1. Call the model with the system prompt (plus a "where you are"
//!    section), the transcript, and the current room's tools.
//! 2. Charge the call's tokens to the budget.
//! 3. Compact the transcript if the call's input neared the context window,
//!    recording the summarized span in durable sequence numbers.
//! 4. Validate and run each tool call in order, applying state patches to
//!    the room the tool ran in and folding commands into [`Signals`].
//! 5. Apply a pending move (exit hook, switch, enter hook).
//! 6. Append at most one notification: arrival, budget warning, new mail.
//! 7. Persist every message appended this turn, then the turn record.
//! 8. Decay old tool results.
//!
//! The loop ends when the agent asks to sleep or the budget is spent.
//! Store failures are logged and skipped; model and compaction failures
//! end the session with an error.

use crate::agent::config::SessionConfig;
use crate::agent::events::{EventHandler, NoopHandler, SessionEvent};
use crate::agent::notify::{Inbox, Notification, Wake, location_section, wake_message};
use crate::api::{LlmClient, LlmRequest};
use crate::context::budget::{BudgetState, BudgetTracker};
use crate::context::compaction::CompactionEngine;
use crate::context::decay::decay;
use crate::context::sequence::SequenceMap;
use crate::error::{SessionError, StoreError};
use crate::rooms::RoomRegistry;
use crate::store::{
    CompactionRecord, EndReason, SessionEnd, ToolResultRecord, TranscriptStore, TurnRecord,
};
use crate::tools::{
    Command, ToolContext, ToolOutcome, log_tool_call, truncate_result, validate_tool_arguments,
};
use crate::{Message, ToolCall};
use tracing::{debug, info, warn};

/// Final user message of the end-of-session summary request.
const SUMMARY_REQUEST: &str = "[Before you fall asleep, write your note for tomorrow.]";

// ── Signals ────────────────────────────────────────────────────────

/// What tools have asked of the loop this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    pub requested_sleep: bool,
    /// Consumed at the end of the turn it was set in.
    pub requested_move: Option<String>,
}

impl Signals {
    /// Fold one tool's commands in. A later move replaces an earlier one.
    pub fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Sleep => self.requested_sleep = true,
                Command::MoveTo(room) => self.requested_move = Some(room),
            }
        }
    }
}

// ── Outcome ────────────────────────────────────────────────────────

/// How a session went.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// `None` when the store could not create the session.
    pub session_id: Option<String>,
    pub session_number: u32,
    pub end_reason: EndReason,
    pub turns: u32,
    pub budget: BudgetState,
    pub final_room: String,
    /// The agent's note for next time, if it wrote one.
    pub summary: Option<String>,
    /// The in-memory transcript as it stood at the end.
    pub messages: Vec<Message>,
}

// ── Session state ──────────────────────────────────────────────────

/// A message appended but not yet written to the store.
struct PendingWrite {
    index: usize,
    room: String,
    turn: Option<u32>,
}

struct SessionState<'s> {
    agent_id: &'s str,
    session_id: Option<String>,
    number: u32,
    room: String,
    turn: u32,
    budget: BudgetTracker,
    /// `messages[i]` is stored under `seqs.get(i)`; the two stay the same length.
    messages: Vec<Message>,
    seqs: SequenceMap,
    pending: Vec<PendingWrite>,
    signals: Signals,
    last_unread: usize,
}

impl SessionState<'_> {
    fn append(&mut self, message: Message) {
        let index = self.seqs.push_pending();
        self.messages.push(message);
        self.pending.push(PendingWrite {
            index,
            room: self.room.clone(),
            turn: (self.turn > 0).then_some(self.turn),
        });
    }
}

// ── Runner ─────────────────────────────────────────────────────────

/// Runs one session for one agent.
///
/// Collaborators are borrowed; the registry mutably, since hooks and tools
/// update room state that outlives the session.
pub struct SessionRunner<'a> {
    client: &'a dyn LlmClient,
    store: &'a dyn TranscriptStore,
    rooms: &'a mut RoomRegistry,
    config: SessionConfig,
    compaction: CompactionEngine,
    handler: &'a dyn EventHandler,
    inbox: Option<&'a dyn Inbox>,
}

impl<'a> SessionRunner<'a> {
    pub fn new(
        client: &'a dyn LlmClient,
        store: &'a dyn TranscriptStore,
        rooms: &'a mut RoomRegistry,
        config: SessionConfig,
    ) -> Self {
        let compaction = CompactionEngine::new(config.compaction.clone());
        Self {
            client,
            store,
            rooms,
            config,
            compaction,
            handler: &NoopHandler,
            inbox: None,
        }
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_inbox(mut self, inbox: &'a dyn Inbox) -> Self {
        self.inbox = Some(inbox);
        self
    }

    /// Run the session to completion.
    #[tracing::instrument(
        name = "session",
        skip_all,
        fields(agent = %agent_id, session = tracing::field::Empty)
    )]
    pub async fn run(self, agent_id: &str) -> Result<SessionOutcome, SessionError> {
        let mut runner = self;
        if !runner.rooms.contains(&runner.config.start_room) {
            return Err(SessionError::UnknownStartRoom(
                runner.config.start_room.clone(),
            ));
        }

        let mut s = runner.open(agent_id).await;
        if let Some(id) = s.session_id.as_deref() {
            tracing::Span::current().record("session", id);
        }

        while !s.budget.is_exhausted() && !s.signals.requested_sleep {
            runner.turn(&mut s).await?;
        }

        Ok(runner.close(s).await)
    }

    async fn open<'s>(&mut self, agent_id: &'s str) -> SessionState<'s> {
        let (number, previous_summary) = match self.store.latest_session(agent_id).await {
            Ok(Some(row)) => (row.number + 1, row.summary),
            Ok(None) => (1, None),
            Err(e) => {
                self.store_failed("latest_session", &e);
                (1, None)
            }
        };

        let session_id = match self.store.create_session(agent_id, number).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.store_failed("create_session", &e);
                warn!("Session #{number} for {agent_id} will not be persisted");
                None
            }
        };

        let room = self.config.start_room.clone();
        let atmosphere = self.rooms.enter(&room);
        let description = self.rooms.describe(&room).unwrap_or_default();
        let unread = self.unread_count(agent_id).await;
        let wake = wake_message(Wake {
            session_number: number,
            room_name: self.rooms.display_name(&room),
            description: &description,
            atmosphere: atmosphere.as_deref(),
            previous_summary: previous_summary.as_deref(),
            unread,
        });

        let mut s = SessionState {
            agent_id,
            session_id,
            number,
            room,
            turn: 0,
            budget: self.config.budget_tracker(),
            messages: Vec::new(),
            seqs: SequenceMap::new(),
            pending: Vec::new(),
            signals: Signals::default(),
            last_unread: unread.unwrap_or(0),
        };
        s.append(Message::user(wake));

        self.handler.on_event(&SessionEvent::SessionStarted {
            agent_id,
            session_id: s.session_id.as_deref(),
            number,
            room: &s.room,
        });
        self.persist_pending(&mut s).await;
        s
    }

    async fn turn(&mut self, s: &mut SessionState<'_>) -> Result<(), SessionError> {
        s.turn += 1;
        let turn = s.turn;
        let turn_room = s.room.clone();
        let budget = s.budget.state();
        self.handler.on_event(&SessionEvent::TurnStart {
            turn,
            room: &turn_room,
            budget: &budget,
        });

        // ── Model call ──
        let tools = self.rooms.tool_definitions(&s.room);
        let system_prompt = self.system_prompt(&s.room);
        let mut request = LlmRequest::new(&system_prompt, &s.messages)
            .with_tools(&tools)
            .with_model(Some(&self.config.model));
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        let response = self
            .client
            .send(request)
            .await
            .map_err(|message| SessionError::Llm { turn, message })?;

        let usage = response.usage.clone();
        s.budget
            .record_usage(usage.input_tokens, usage.output_tokens, usage.cost);
        self.handler.on_event(&SessionEvent::TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost: usage.cost,
        });
        let text = response.content.as_deref().filter(|t| !t.trim().is_empty());
        if let Some(text) = text {
            self.handler.on_event(&SessionEvent::Text(text));
        }

        // ── Compaction ──
        if self.compaction.should_compact(usage.input_tokens) {
            self.compact(s).await?;
        }

        if text.is_some() || !response.tool_calls.is_empty() {
            s.append(Message::assistant(
                text.map(str::to_string),
                response.tool_calls.clone(),
            ));
        }

        // ── Tools ──
        let mut tool_results = Vec::with_capacity(response.tool_calls.len());
        for call in &response.tool_calls {
            let outcome = self.execute_call(s, call).await;
            let content = truncate_result(outcome.to_content(), self.config.max_tool_result_chars);
            self.handler.on_event(&SessionEvent::ToolResult {
                name: call.name(),
                call_id: &call.id,
                result: &content,
                success: outcome.success,
            });

            if let Some(patch) = outcome.state_update {
                self.rooms.update_room_state(&s.room, patch);
            }
            let was_sleeping = s.signals.requested_sleep;
            s.signals.apply(outcome.commands);
            if s.signals.requested_sleep && !was_sleeping {
                self.handler.on_event(&SessionEvent::SleepRequested { turn });
            }

            s.append(
                Message::tool_result(call.id.clone(), content.clone())
                    .with_decay(turn, call.name()),
            );
            tool_results.push(ToolResultRecord {
                name: call.name().to_string(),
                result: content,
            });
        }

        // ── Movement and notification ──
        let mut notification = Notification::new();
        if let Some(target) = s.signals.requested_move.take() {
            self.apply_move(s, target, &mut notification);
        }
        if s.budget.should_warn() {
            notification.budget_warning(s.budget.warning_notice());
            self.handler.on_event(&SessionEvent::BudgetWarning {
                remaining: s.budget.remaining(),
            });
        }
        if let Some(unread) = self.unread_count(s.agent_id).await {
            if unread > s.last_unread {
                notification.inbox(unread);
            }
            s.last_unread = unread;
        }
        if response.tool_calls.is_empty() && !s.signals.requested_sleep {
            notification.idle(self.rooms.display_name(&s.room));
        }
        if let Some(text) = notification.render() {
            self.handler.on_event(&SessionEvent::Notification(&text));
            s.append(Message::user(text));
        }

        // ── Persistence ──
        self.persist_pending(s).await;
        if let Some(session_id) = s.session_id.as_deref() {
            let record = TurnRecord {
                sequence: turn,
                room: turn_room,
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                cost: usage.cost,
                assistant_message: text.map(str::to_string),
                tool_calls: response.tool_calls.clone(),
                tool_results,
            };
            if let Err(e) = self.store.record_turn(session_id, record).await {
                self.store_failed("record_turn", &e);
            }
        }

        // ── Decay ──
        if let Some(config) = self.config.decay.active() {
            let report = decay(&mut s.messages, turn, config);
            if report.stubbed > 0 {
                self.handler.on_event(&SessionEvent::Decayed {
                    turn,
                    stubbed: report.stubbed,
                    freed_chars: report.freed_chars,
                });
            }
        }

        debug!(
            "Turn {turn} done: {} messages, {}",
            s.messages.len(),
            s.budget.state().to_log_string()
        );
        Ok(())
    }

    /// Summarize older messages and record the span against the store.
    ///
    /// Runs before anything is appended in the current turn, so no write is
    /// pending and every stored message already has its seq.
    async fn compact(&self, s: &mut SessionState<'_>) -> Result<(), SessionError> {
        let turn = s.turn;
        let result = self
            .compaction
            .compact(self.client, &s.messages)
            .await
            .map_err(|message| SessionError::Compaction { turn, message })?;
        let Some(range) = result.compacted_range.clone() else {
            return Ok(());
        };

        let span = s.seqs.translate(range.clone());
        match (s.session_id.as_deref(), span) {
            (Some(session_id), Some(span)) => {
                let record = CompactionRecord {
                    start_seq: span.start_seq,
                    end_seq: span.end_seq,
                    summary_text: result.summary_text.clone().unwrap_or_default(),
                    summary_tokens: result.summary_tokens,
                    model: self
                        .config
                        .compaction
                        .model
                        .clone()
                        .unwrap_or_else(|| self.client.model().to_string()),
                    source_tokens: result.source_tokens,
                };
                if let Err(e) = self.store.record_compaction(session_id, record).await {
                    self.store_failed("record_compaction", &e);
                }
            }
            (Some(_), None) => debug!("Compacted messages were never stored; nothing to record"),
            (None, _) => {}
        }

        s.seqs.rebuild_after_compaction(range.end);
        self.handler.on_event(&SessionEvent::Compacted {
            turn,
            original_count: result.original_message_count,
            compacted_count: result.compacted_message_count,
            summary_tokens: result.summary_tokens,
            range: span,
        });
        s.messages = result.messages;
        Ok(())
    }

    /// Validate and run one tool call. Never fails; problems become
    /// failure outcomes the model can read.
    async fn execute_call(&self, s: &SessionState<'_>, call: &ToolCall) -> ToolOutcome {
        let name = call.name();
        let rooms: &RoomRegistry = &*self.rooms;

        let Some(tool) = rooms.tool(&s.room, name) else {
            let available = rooms.tool_names(&s.room);
            let reason = format!(
                "unknown tool '{name}'. Tools available in the {}: {}.",
                rooms.display_name(&s.room),
                available.join(", ")
            );
            self.handler.on_event(&SessionEvent::ToolRejected {
                name,
                reason: &reason,
            });
            return ToolOutcome::failure(reason);
        };

        let args = match validate_tool_arguments(&tool.definition(), &call.function.arguments) {
            Ok(args) => args,
            Err(reason) => {
                self.handler.on_event(&SessionEvent::ToolRejected {
                    name,
                    reason: &reason,
                });
                return ToolOutcome::failure(reason);
            }
        };

        log_tool_call(name, &call.function.arguments);
        self.handler.on_event(&SessionEvent::ToolExecuting {
            name,
            arguments: &call.function.arguments,
        });

        let budget = s.budget.state();
        let ctx = ToolContext {
            agent_id: s.agent_id,
            session_id: s.session_id.as_deref(),
            session_number: s.number,
            current_room: &s.room,
            turn: s.turn,
            budget: &budget,
            rooms,
        };
        tool.execute(args, &ctx).await
    }

    /// Switch rooms if the transition is still allowed.
    fn apply_move(
        &mut self,
        s: &mut SessionState<'_>,
        target: String,
        notification: &mut Notification,
    ) {
        if target == s.room || !self.rooms.can_transition(&s.room, &target) {
            self.handler.on_event(&SessionEvent::MoveRejected {
                from: &s.room,
                to: &target,
            });
            return;
        }

        self.rooms.exit(&s.room);
        let from = std::mem::replace(&mut s.room, target);
        let atmosphere = self.rooms.enter(&s.room);
        let description = self.rooms.describe(&s.room).unwrap_or_default();
        notification.room_entry(
            self.rooms.display_name(&s.room),
            &description,
            atmosphere.as_deref(),
        );
        self.handler.on_event(&SessionEvent::RoomChanged {
            from: &from,
            to: &s.room,
            atmosphere: atmosphere.as_deref(),
        });
    }

    /// Write every pending message in order, recording the seqs handed out.
    async fn persist_pending(&self, s: &mut SessionState<'_>) {
        let pending = std::mem::take(&mut s.pending);
        let Some(session_id) = s.session_id.clone() else {
            return;
        };
        for write in pending {
            let Some(message) = s.messages.get(write.index) else {
                continue;
            };
            match self
                .store
                .append_message(&session_id, message, &write.room, write.turn)
                .await
            {
                Ok(seq) => s.seqs.assign(write.index, seq),
                Err(e) => self.store_failed("append_message", &e),
            }
        }
    }

    async fn close(&self, s: SessionState<'_>) -> SessionOutcome {
        let end_reason = if s.signals.requested_sleep {
            EndReason::Sleep
        } else {
            EndReason::BudgetExhausted
        };
        let summary = self.session_summary(&s.messages).await;
        let budget = s.budget.state();

        if let Some(session_id) = s.session_id.as_deref() {
            let end = SessionEnd {
                end_reason,
                total_spent: budget.spent,
                summary: summary.clone(),
                total_cost: budget.total_cost,
            };
            if let Err(e) = self.store.end_session(session_id, end).await {
                self.store_failed("end_session", &e);
            }
        }

        self.handler.on_event(&SessionEvent::SessionEnded {
            end_reason,
            turns: s.turn,
            total_spent: budget.spent,
            summary: summary.as_deref(),
        });
        info!(
            "Session #{} for {} ended: {end_reason} after {} turns",
            s.number, s.agent_id, s.turn
        );

        SessionOutcome {
            session_id: s.session_id,
            session_number: s.number,
            end_reason,
            turns: s.turn,
            budget,
            final_room: s.room,
            summary,
            messages: s.messages,
        }
    }

    /// Ask the model for a note to its next session. Best-effort; the
    /// tokens are not charged to the budget.
    async fn session_summary(&self, messages: &[Message]) -> Option<String> {
        let config = self.config.session_summary.active()?;
        let mut transcript = messages.to_vec();
        transcript.push(Message::user(SUMMARY_REQUEST));

        let model = config.model.as_deref().unwrap_or(&self.config.model);
        let request = LlmRequest::new(&config.prompt, &transcript)
            .with_model(Some(model))
            .with_max_tokens(config.max_tokens);
        match self.client.send(request).await {
            Ok(response) => response
                .content
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            Err(e) => {
                warn!("Session summary failed: {e}");
                None
            }
        }
    }

    fn system_prompt(&self, room: &str) -> String {
        if !self.config.location_in_prompt {
            return self.config.system_prompt.clone();
        }
        format!(
            "{}\n\n{}",
            self.config.system_prompt,
            location_section(&*self.rooms, room)
        )
    }

    async fn unread_count(&self, agent_id: &str) -> Option<usize> {
        let inbox = self.inbox?;
        match inbox.unread_count(agent_id).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Inbox check for {agent_id} failed: {e}");
                None
            }
        }
    }

    fn store_failed(&self, operation: &str, error: &StoreError) {
        warn!("Store {operation} failed: {error}");
        self.handler
            .on_event(&SessionEvent::StoreFailure { operation, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_move_wins() {
        let mut signals = Signals::default();
        signals.apply(vec![Command::MoveTo("garden".into())]);
        signals.apply(vec![]);
        signals.apply(vec![Command::MoveTo("study".into())]);
        assert_eq!(signals.requested_move.as_deref(), Some("study"));
        assert!(!signals.requested_sleep);
    }

    #[test]
    fn sleep_latches() {
        let mut signals = Signals::default();
        signals.apply(vec![Command::Sleep, Command::MoveTo("hallway".into())]);
        signals.apply(vec![]);
        assert!(signals.requested_sleep);
        assert_eq!(signals.requested_move.as_deref(), Some("hallway"));
    }
}
