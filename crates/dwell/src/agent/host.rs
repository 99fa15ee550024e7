//! Owns one agent's collaborators and runs at most one session at a time.
//!
//! The [`SessionRunner`] borrows everything for one session. A long-lived
//! caller (a scheduler, a CLI loop) instead holds an [`AgentHost`] and calls
//! [`wake`](AgentHost::wake) whenever the agent should get up. A second wake
//! while a session is in flight is refused rather than queued.

use super::config::SessionConfig;
use super::events::{EventHandler, NoopHandler};
use super::notify::Inbox;
use super::runner::{SessionOutcome, SessionRunner};
use crate::api::LlmClient;
use crate::error::SessionError;
use crate::rooms::RoomRegistry;
use crate::store::TranscriptStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

pub struct AgentHost {
    agent_id: String,
    client: Arc<dyn LlmClient>,
    store: Arc<dyn TranscriptStore>,
    /// Room state persists here across sessions.
    rooms: Mutex<RoomRegistry>,
    config: SessionConfig,
    handler: Arc<dyn EventHandler>,
    inbox: Option<Arc<dyn Inbox>>,
    running: AtomicBool,
}

/// Clears the running flag however the session ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AgentHost {
    pub fn new(
        agent_id: impl Into<String>,
        client: Arc<dyn LlmClient>,
        store: Arc<dyn TranscriptStore>,
        rooms: RoomRegistry,
        config: SessionConfig,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            client,
            store,
            rooms: Mutex::new(rooms),
            config,
            handler: Arc::new(NoopHandler),
            inbox: None,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_inbox(mut self, inbox: Arc<dyn Inbox>) -> Self {
        self.inbox = Some(inbox);
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a session is in flight right now.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one session from wake to sleep.
    ///
    /// Returns [`SessionError::AlreadyRunning`] without touching the store
    /// if this agent is already awake.
    pub async fn wake(&self) -> Result<SessionOutcome, SessionError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Ignoring wake for {}: already awake", self.agent_id);
            return Err(SessionError::AlreadyRunning(self.agent_id.clone()));
        }
        let _guard = RunningGuard(&self.running);

        let mut rooms = self.rooms.lock().await;
        let mut runner = SessionRunner::new(
            self.client.as_ref(),
            self.store.as_ref(),
            &mut rooms,
            self.config.clone(),
        )
        .with_event_handler(self.handler.as_ref());
        if let Some(inbox) = self.inbox.as_deref() {
            runner = runner.with_inbox(inbox);
        }
        runner.run(&self.agent_id).await
    }

    /// The rooms, locked. Waits for a running session to finish.
    pub async fn rooms(&self) -> MutexGuard<'_, RoomRegistry> {
        self.rooms.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::ScriptedClient;
    use crate::api::LlmUsage;
    use crate::rooms::Room;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn host(client: ScriptedClient, store: Arc<MemoryStore>) -> AgentHost {
        let rooms = RoomRegistry::new().with_room(Room::new("bedroom", "Bedroom"));
        let config = SessionConfig::new("m", "p").without_session_summary();
        AgentHost::new("ada", Arc::new(client), store, rooms, config)
    }

    #[tokio::test]
    async fn flag_clears_after_session() {
        let client = ScriptedClient::new().with_turn(ScriptedClient::call(
            "c1",
            "check_budget",
            json!({}),
            LlmUsage::new(10, 10),
        ));
        // No second turn queued: the session ends on a model error.
        let store = Arc::new(MemoryStore::new());
        let host = host(client, Arc::clone(&store));

        let err = host.wake().await.unwrap_err();
        assert!(matches!(err, SessionError::Llm { turn: 2, .. }));
        assert!(!host.is_running());
        assert_eq!(store.session_count(), 1);
    }
}
