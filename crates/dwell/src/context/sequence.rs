//! In-memory index ↔ durable sequence number bookkeeping.
//!
//! The transcript the model sees is a `Vec<Message>` that compaction
//! shortens and decay rewrites. The durable store keys the same messages by
//! sequence numbers it hands out on append. The two numbering spaces only
//! line up by accident, so the turn loop keeps one slot per in-memory
//! message recording the durable seq (or `None` when the message was never
//! stored: an append failed, no session exists, or it is a compaction
//! summary).

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A contiguous span of durable sequence numbers, inclusive on both ends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqRange {
    pub start_seq: u64,
    pub end_seq: u64,
}

/// Parallel array to the transcript: slot `i` is the durable seq of message `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceMap {
    slots: Vec<Option<u64>>,
}

impl SequenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly appended in-memory message (seq not yet known).
    pub fn push_pending(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Record the durable seq assigned to message `index`.
    pub fn assign(&mut self, index: usize, seq: u64) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(seq);
        }
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        self.slots.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Durable span covered by in-memory `range`: the first and last known
    /// seqs inside it. `None` when no message in the range was stored.
    pub fn translate(&self, range: Range<usize>) -> Option<SeqRange> {
        let end = range.end.min(self.slots.len());
        let start = range.start.min(end);
        let slots = self.slots.get(start..end)?;
        let start_seq = slots.iter().flatten().next().copied()?;
        let end_seq = slots.iter().rev().flatten().next().copied()?;
        Some(SeqRange { start_seq, end_seq })
    }

    /// Rebuild after compaction: one unstored slot for the summary message
    /// followed by the slots of the kept suffix starting at `kept_from`.
    pub fn rebuild_after_compaction(&mut self, kept_from: usize) {
        let kept_from = kept_from.min(self.slots.len());
        let mut slots = Vec::with_capacity(self.slots.len() - kept_from + 1);
        slots.push(None);
        slots.extend_from_slice(&self.slots[kept_from..]);
        self.slots = slots;
    }
}
