//! In-memory [`TranscriptStore`] for tests and unpersisted runs.

use super::{
    CompactionRecord, SessionEnd, SessionSummaryRow, StoreFuture, StoredMessage, TranscriptStore,
    TurnRecord,
};
use crate::Message;
use crate::error::StoreError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct SessionData {
    row: SessionSummaryRow,
    messages: Vec<StoredMessage>,
    compactions: Vec<CompactionRecord>,
    turns: Vec<TurnRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, SessionData>,
    next_id: u64,
}

impl Inner {
    fn open_session(&mut self, id: &str) -> Result<&mut SessionData, StoreError> {
        let data = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        if data.row.is_sealed() {
            return Err(StoreError::SessionSealed(id.to_string()));
        }
        Ok(data)
    }
}

/// Keeps every session behind a mutex. Session ids are `mem-1`, `mem-2`, ...
/// in creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All messages of a session in seq order, compacted ones included.
    pub fn messages(&self, session_id: &str) -> Vec<StoredMessage> {
        self.lock()
            .sessions
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub fn compactions(&self, session_id: &str) -> Vec<CompactionRecord> {
        self.lock()
            .sessions
            .get(session_id)
            .map(|s| s.compactions.clone())
            .unwrap_or_default()
    }

    pub fn turns(&self, session_id: &str) -> Vec<TurnRecord> {
        self.lock()
            .sessions
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    pub fn session(&self, session_id: &str) -> Option<SessionSummaryRow> {
        self.lock().sessions.get(session_id).map(|s| s.row.clone())
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

impl TranscriptStore for MemoryStore {
    fn create_session<'a>(&'a self, agent_id: &'a str, number: u32) -> StoreFuture<'a, String> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        inner.sessions.insert(
            id.clone(),
            SessionData {
                row: SessionSummaryRow::open(id.clone(), agent_id, number),
                messages: Vec::new(),
                compactions: Vec::new(),
                turns: Vec::new(),
            },
        );
        Box::pin(std::future::ready(Ok(id)))
    }

    fn append_message<'a>(
        &'a self,
        session_id: &'a str,
        message: &'a Message,
        room: &'a str,
        turn: Option<u32>,
    ) -> StoreFuture<'a, u64> {
        let result = self.lock().open_session(session_id).map(|data| {
            data.row.message_count += 1;
            let seq = data.row.message_count;
            data.messages.push(StoredMessage {
                seq,
                message: message.clone(),
                room: room.to_string(),
                turn,
                compacted: false,
                created_at: Utc::now(),
            });
            seq
        });
        Box::pin(std::future::ready(result))
    }

    fn record_compaction<'a>(
        &'a self,
        session_id: &'a str,
        record: CompactionRecord,
    ) -> StoreFuture<'a, ()> {
        let result = self.lock().open_session(session_id).map(|data| {
            for msg in &mut data.messages {
                if (record.start_seq..=record.end_seq).contains(&msg.seq) {
                    msg.compacted = true;
                }
            }
            data.compactions.push(record);
        });
        Box::pin(std::future::ready(result))
    }

    fn record_turn<'a>(&'a self, session_id: &'a str, record: TurnRecord) -> StoreFuture<'a, ()> {
        let result = self.lock().open_session(session_id).map(|data| {
            data.row.turn_count = data.row.turn_count.max(record.sequence);
            data.turns.push(record);
        });
        Box::pin(std::future::ready(result))
    }

    fn end_session<'a>(&'a self, session_id: &'a str, end: SessionEnd) -> StoreFuture<'a, ()> {
        let result = self
            .lock()
            .open_session(session_id)
            .map(|data| data.row.seal(end));
        Box::pin(std::future::ready(result))
    }

    fn latest_session<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> StoreFuture<'a, Option<SessionSummaryRow>> {
        let inner = self.lock();
        let latest = inner
            .sessions
            .values()
            .map(|s| &s.row)
            .filter(|row| row.agent_id == agent_id)
            .fold(None::<&SessionSummaryRow>, |best, row| match best {
                Some(b) if !row.is_newer_than(b) => Some(b),
                _ => Some(row),
            })
            .cloned();
        Box::pin(std::future::ready(Ok(latest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EndReason;

    fn end() -> SessionEnd {
        SessionEnd {
            end_reason: EndReason::Sleep,
            total_spent: 1200,
            summary: Some("A quiet day.".into()),
            total_cost: 0.01,
        }
    }

    #[tokio::test]
    async fn seqs_are_per_session_and_one_based() {
        let store = MemoryStore::new();
        let a = store.create_session("ada", 1).await.unwrap();
        let b = store.create_session("bo", 1).await.unwrap();
        let msg = Message::user("hello");

        assert_eq!(store.append_message(&a, &msg, "bedroom", None).await.unwrap(), 1);
        assert_eq!(store.append_message(&a, &msg, "bedroom", Some(1)).await.unwrap(), 2);
        assert_eq!(store.append_message(&b, &msg, "garden", Some(1)).await.unwrap(), 1);

        let stored = store.messages(&a);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].turn, Some(1));
        assert_eq!(stored[1].room, "bedroom");
    }

    #[tokio::test]
    async fn compaction_marks_without_removing() {
        let store = MemoryStore::new();
        let id = store.create_session("ada", 1).await.unwrap();
        for i in 0..5 {
            let msg = Message::user(format!("m{i}"));
            store.append_message(&id, &msg, "study", Some(1)).await.unwrap();
        }

        store
            .record_compaction(
                &id,
                CompactionRecord {
                    start_seq: 2,
                    end_seq: 4,
                    summary_text: "stuff happened".into(),
                    summary_tokens: 10,
                    model: "m".into(),
                    source_tokens: 100,
                },
            )
            .await
            .unwrap();

        let flags: Vec<bool> = store.messages(&id).iter().map(|m| m.compacted).collect();
        assert_eq!(flags, vec![false, true, true, true, false]);
        assert_eq!(store.compactions(&id).len(), 1);
    }

    #[tokio::test]
    async fn sealed_sessions_reject_writes() {
        let store = MemoryStore::new();
        let id = store.create_session("ada", 1).await.unwrap();
        store.end_session(&id, end()).await.unwrap();

        let err = store
            .append_message(&id, &Message::user("late"), "bedroom", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionSealed(_)));
        assert!(matches!(
            store.end_session(&id, end()).await,
            Err(StoreError::SessionSealed(_))
        ));

        let row = store.session(&id).unwrap();
        assert_eq!(row.end_reason, Some(EndReason::Sleep));
        assert_eq!(row.summary.as_deref(), Some("A quiet day."));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .append_message("nope", &Message::user("x"), "bedroom", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn latest_session_is_highest_number_for_agent() {
        let store = MemoryStore::new();
        assert!(store.latest_session("ada").await.unwrap().is_none());

        store.create_session("ada", 1).await.unwrap();
        let second = store.create_session("ada", 2).await.unwrap();
        store.create_session("bo", 9).await.unwrap();

        let latest = store.latest_session("ada").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.number, 2);
    }
}
