//! File-backed [`TranscriptStore`]: one directory per session.
//!
//! ```text
//! root/
//!   resident-0003-20260301T073000000/
//!     manifest.json       session row, rewritten atomically on every change
//!     messages.jsonl      one StoredMessage per line, seq order
//!     compactions.jsonl   one CompactionRecord per line
//!     turns.jsonl         one TurnRecord per line
//! ```
//!
//! Logs are append-only. Compaction marks are derived from
//! `compactions.jsonl` when messages are loaded, so no line is rewritten.
//!
//! Manifests are cached in memory after first use; the cache is behind an
//! async mutex, which also serializes writes to a session's files.

use super::{
    CompactionRecord, SessionEnd, SessionSummaryRow, StoreFuture, StoredMessage, TranscriptStore,
    TurnRecord, session_id_for,
};
use crate::Message;
use crate::error::StoreError;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const MANIFEST: &str = "manifest.json";
const MESSAGES: &str = "messages.jsonl";
const COMPACTIONS: &str = "compactions.jsonl";
const TURNS: &str = "turns.jsonl";

/// JSON-lines transcript store rooted at a directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    manifests: Mutex<HashMap<String, SessionSummaryRow>>,
}

impl FileStore {
    /// Create a store, ensuring the root directory exists.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            manifests: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    async fn save_manifest(&self, row: &SessionSummaryRow) -> Result<(), StoreError> {
        let dir = self.session_dir(&row.id);
        let tmp_path = dir.join(".manifest.json.tmp");
        let json = serde_json::to_string_pretty(row)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, dir.join(MANIFEST)).await?;
        Ok(())
    }

    async fn read_manifest(path: &Path) -> Result<SessionSummaryRow, StoreError> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Cached manifest for a writable session.
    async fn open_session<'m>(
        &self,
        cache: &'m mut HashMap<String, SessionSummaryRow>,
        session_id: &str,
    ) -> Result<&'m mut SessionSummaryRow, StoreError> {
        if !cache.contains_key(session_id) {
            let path = self.session_dir(session_id).join(MANIFEST);
            if !tokio::fs::try_exists(&path).await? {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }
            let row = Self::read_manifest(&path).await?;
            cache.insert(session_id.to_string(), row);
        }
        let row = cache
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        if row.is_sealed() {
            return Err(StoreError::SessionSealed(session_id.to_string()));
        }
        Ok(row)
    }

    async fn append_line<T: Serialize>(
        &self,
        session_id: &str,
        file: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(value)?;
        line.push('\n');
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_dir(session_id).join(file))
            .await?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }

    async fn read_lines<T: DeserializeOwned>(
        &self,
        session_id: &str,
        file: &str,
    ) -> Result<Vec<T>, StoreError> {
        let path = self.session_dir(session_id).join(file);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let text = tokio::fs::read_to_string(&path).await?;
        let mut out = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(v) => out.push(v),
                // A torn final line from a crash shouldn't hide the rest.
                Err(e) => warn!("Skipping malformed line {} of {}: {e}", i + 1, path.display()),
            }
        }
        Ok(out)
    }

    /// Messages of a session in seq order, with compaction marks applied.
    pub async fn load_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let mut messages: Vec<StoredMessage> = self.read_lines(session_id, MESSAGES).await?;
        let compactions = self.load_compactions(session_id).await?;
        for msg in &mut messages {
            msg.compacted = compactions
                .iter()
                .any(|c| (c.start_seq..=c.end_seq).contains(&msg.seq));
        }
        Ok(messages)
    }

    pub async fn load_compactions(
        &self,
        session_id: &str,
    ) -> Result<Vec<CompactionRecord>, StoreError> {
        self.read_lines(session_id, COMPACTIONS).await
    }

    pub async fn load_turns(&self, session_id: &str) -> Result<Vec<TurnRecord>, StoreError> {
        self.read_lines(session_id, TURNS).await
    }

    /// Manifests of all sessions, optionally for one agent, oldest first.
    pub async fn list_sessions(
        &self,
        agent_id: Option<&str>,
    ) -> Result<Vec<SessionSummaryRow>, StoreError> {
        let mut rows = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await.is_ok_and(|ft| ft.is_dir()) {
                continue;
            }
            let path = entry.path().join(MANIFEST);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            match Self::read_manifest(&path).await {
                Ok(row) if agent_id.is_none_or(|a| a == row.agent_id) => rows.push(row),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable manifest at {}: {e}", path.display()),
            }
        }
        rows.sort_by(|a, b| (a.number, a.started_at).cmp(&(b.number, b.started_at)));
        Ok(rows)
    }
}

impl TranscriptStore for FileStore {
    fn create_session<'a>(&'a self, agent_id: &'a str, number: u32) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let mut cache = self.manifests.lock().await;
            let id = session_id_for(agent_id, number, Utc::now());
            let dir = self.session_dir(&id);
            if tokio::fs::try_exists(&dir).await? {
                return Err(StoreError::Backend(format!(
                    "session directory {} already exists",
                    dir.display()
                )));
            }
            tokio::fs::create_dir_all(&dir).await?;

            let row = SessionSummaryRow::open(id.clone(), agent_id, number);
            self.save_manifest(&row).await?;
            debug!("Created session {id} at {}", dir.display());
            cache.insert(id.clone(), row);
            Ok(id)
        })
    }

    fn append_message<'a>(
        &'a self,
        session_id: &'a str,
        message: &'a Message,
        room: &'a str,
        turn: Option<u32>,
    ) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let mut cache = self.manifests.lock().await;
            let row = self.open_session(&mut cache, session_id).await?;
            let seq = row.message_count + 1;

            // Claim the seq on disk first. A line that fails to land leaves a
            // gap, never a seq that a reopened store hands out twice.
            let mut claimed = row.clone();
            claimed.message_count = seq;
            self.save_manifest(&claimed).await?;
            row.message_count = seq;

            let stored = StoredMessage {
                seq,
                message: message.clone(),
                room: room.to_string(),
                turn,
                compacted: false,
                created_at: Utc::now(),
            };
            self.append_line(session_id, MESSAGES, &stored).await?;
            Ok(seq)
        })
    }

    fn record_compaction<'a>(
        &'a self,
        session_id: &'a str,
        record: CompactionRecord,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut cache = self.manifests.lock().await;
            self.open_session(&mut cache, session_id).await?;
            self.append_line(session_id, COMPACTIONS, &record).await
        })
    }

    fn record_turn<'a>(&'a self, session_id: &'a str, record: TurnRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut cache = self.manifests.lock().await;
            let row = self.open_session(&mut cache, session_id).await?;
            self.append_line(session_id, TURNS, &record).await?;
            row.turn_count = row.turn_count.max(record.sequence);
            let snapshot = row.clone();
            // The record is already durable; the count catches up on the
            // next manifest write.
            if let Err(e) = self.save_manifest(&snapshot).await {
                warn!(
                    "Turn {} stored but manifest of {session_id} not updated: {e}",
                    record.sequence
                );
            }
            Ok(())
        })
    }

    fn end_session<'a>(&'a self, session_id: &'a str, end: SessionEnd) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut cache = self.manifests.lock().await;
            let row = self.open_session(&mut cache, session_id).await?;
            row.seal(end);
            let snapshot = row.clone();
            self.save_manifest(&snapshot).await
        })
    }

    fn latest_session<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> StoreFuture<'a, Option<SessionSummaryRow>> {
        Box::pin(async move {
            let rows = self.list_sessions(Some(agent_id)).await?;
            Ok(rows.into_iter().reduce(|best, row| {
                if row.is_newer_than(&best) { row } else { best }
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EndReason;

    fn record(start: u64, end: u64) -> CompactionRecord {
        CompactionRecord {
            start_seq: start,
            end_seq: end,
            summary_text: "You read for a while.".into(),
            summary_tokens: 12,
            model: "test-model".into(),
            source_tokens: 400,
        }
    }

    #[tokio::test]
    async fn creates_session_directory_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let id = store.create_session("resident", 3).await.unwrap();
        assert!(id.starts_with("resident-0003-"));

        let manifest = dir.path().join(&id).join(MANIFEST);
        assert!(manifest.exists());
        assert!(!dir.path().join(&id).join(".manifest.json.tmp").exists());
    }

    #[tokio::test]
    async fn messages_append_in_seq_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let id = store.create_session("resident", 1).await.unwrap();

        for i in 1..=3u64 {
            let msg = Message::user(format!("line {i}"));
            let seq = store.append_message(&id, &msg, "study", Some(1)).await.unwrap();
            assert_eq!(seq, i);
        }

        let messages = store.load_messages(&id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].message.text(), "line 3");
        assert_eq!(messages[2].room, "study");

        let row = store.latest_session("resident").await.unwrap().unwrap();
        assert_eq!(row.message_count, 3);
    }

    #[tokio::test]
    async fn failed_manifest_write_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let id = store.create_session("resident", 1).await.unwrap();

        // A directory where the temp manifest goes makes every save fail.
        let blocker = dir.path().join(&id).join(".manifest.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let err = store.append_message(&id, &Message::user("lost"), "study", None).await;
        assert!(err.is_err());
        assert!(store.load_messages(&id).await.unwrap().is_empty());

        std::fs::remove_dir(&blocker).unwrap();
        let seq = store
            .append_message(&id, &Message::user("kept"), "study", None)
            .await
            .unwrap();
        assert_eq!(seq, 1);
        let messages = store.load_messages(&id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!((messages[0].seq, messages[0].message.text()), (1, "kept"));
    }

    #[tokio::test]
    async fn failed_line_write_never_reuses_its_seq() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FileStore::new(dir.path()).unwrap();
            let id = store.create_session("resident", 1).await.unwrap();
            store
                .append_message(&id, &Message::user("first"), "study", None)
                .await
                .unwrap();

            let log = dir.path().join(&id).join(MESSAGES);
            std::fs::rename(&log, dir.path().join("aside.jsonl")).unwrap();
            std::fs::create_dir(&log).unwrap();
            let err = store.append_message(&id, &Message::user("torn"), "study", None).await;
            assert!(err.is_err());
            std::fs::remove_dir(&log).unwrap();
            std::fs::rename(dir.path().join("aside.jsonl"), &log).unwrap();
            id
        };

        // A fresh store continues after the claimed seq.
        let store = FileStore::new(dir.path()).unwrap();
        let seq = store
            .append_message(&id, &Message::user("third"), "study", None)
            .await
            .unwrap();
        assert_eq!(seq, 3);
        let seqs: Vec<u64> = store
            .load_messages(&id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.seq)
            .collect();
        assert_eq!(seqs, vec![1, 3]);
    }

    #[tokio::test]
    async fn compactions_mark_messages_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let id = store.create_session("resident", 1).await.unwrap();
        for i in 0..4 {
            let msg = Message::user(format!("m{i}"));
            store.append_message(&id, &msg, "study", None).await.unwrap();
        }

        store.record_compaction(&id, record(1, 2)).await.unwrap();

        let flags: Vec<bool> = store
            .load_messages(&id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.compacted)
            .collect();
        assert_eq!(flags, vec![true, true, false, false]);
        assert_eq!(store.load_compactions(&id).await.unwrap(), vec![record(1, 2)]);
    }

    #[tokio::test]
    async fn end_session_seals_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FileStore::new(dir.path()).unwrap();
            let id = store.create_session("resident", 1).await.unwrap();
            store
                .record_turn(
                    &id,
                    TurnRecord {
                        sequence: 1,
                        room: "bedroom".into(),
                        input_tokens: 100,
                        output_tokens: 20,
                        cost: None,
                        assistant_message: Some("Morning.".into()),
                        tool_calls: vec![],
                        tool_results: vec![],
                    },
                )
                .await
                .unwrap();
            store
                .end_session(
                    &id,
                    SessionEnd {
                        end_reason: EndReason::BudgetExhausted,
                        total_spent: 120,
                        summary: None,
                        total_cost: 0.0,
                    },
                )
                .await
                .unwrap();
            id
        };

        // A fresh store reads state back from disk.
        let store = FileStore::new(dir.path()).unwrap();
        let err = store
            .append_message(&id, &Message::user("late"), "bedroom", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionSealed(_)));

        let row = store.latest_session("resident").await.unwrap().unwrap();
        assert_eq!(row.end_reason, Some(EndReason::BudgetExhausted));
        assert_eq!(row.turn_count, 1);
        assert_eq!(store.load_turns(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_session_picks_highest_number() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.create_session("resident", 1).await.unwrap();
        let second = store.create_session("resident", 2).await.unwrap();
        store.create_session("visitor", 7).await.unwrap();

        let latest = store.latest_session("resident").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(store.list_sessions(None).await.unwrap().len(), 3);
        assert!(store.latest_session("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let err = store
            .record_turn(
                "missing",
                TurnRecord {
                    sequence: 1,
                    room: "x".into(),
                    input_tokens: 0,
                    output_tokens: 0,
                    cost: None,
                    assistant_message: None,
                    tool_calls: vec![],
                    tool_results: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }
}
