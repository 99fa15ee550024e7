//! Tool-result decay: replace old, large tool results with one-line stubs.
//!
//! Tool results dominate the transcript that is re-sent every turn. Once the
//! model has had a few turns to act on a result, the full text is rarely
//! needed again, so results older than a turn window are swapped for a
//! deterministic stub. No LLM call is involved, and the durable store still
//! holds the original content.
//!
//! Only tool messages tagged with [`DecayMeta`] are candidates. Everything
//! else (user, assistant, untagged tool messages) is left alone no matter
//! how old or large it is.

use crate::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// In-memory tag on a tool result: which turn produced it and which tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecayMeta {
    pub turn: u32,
    pub tool_name: String,
}

/// Configuration for tool-result decay.
#[derive(Debug, Clone)]
pub struct DecayConfig {
    /// Results produced at or before `current_turn - turn_window` decay.
    pub turn_window: u32,
    /// Results whose length is strictly greater than this (in chars) decay.
    pub stub_threshold: usize,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            turn_window: 3,
            stub_threshold: 400,
        }
    }
}

impl DecayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn_window(mut self, turns: u32) -> Self {
        self.turn_window = turns;
        self
    }

    pub fn with_stub_threshold(mut self, chars: usize) -> Self {
        self.stub_threshold = chars;
        self
    }
}

/// What a [`decay`] pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecayReport {
    pub stubbed: usize,
    pub freed_chars: usize,
}

/// The stub that replaces a decayed result of `chars` characters.
pub fn stub_for(tool_name: &str, chars: usize) -> String {
    format!("[{tool_name}(): returned {chars} chars]")
}

/// Stub every eligible tool result in place.
///
/// A message is eligible when it is a tool result carrying decay metadata,
/// `meta.turn <= current_turn - turn_window`, and its content is longer than
/// `stub_threshold` characters. Stubbed messages lose their metadata, so a
/// later pass never re-stubs a stub.
pub fn decay(messages: &mut [Message], current_turn: u32, config: &DecayConfig) -> DecayReport {
    let mut report = DecayReport::default();

    for msg in messages.iter_mut() {
        if msg.role != MessageRole::Tool {
            continue;
        }
        let Some(ref meta) = msg.decay else {
            continue;
        };
        if meta.turn.saturating_add(config.turn_window) > current_turn {
            continue;
        }
        let Some(ref content) = msg.content else {
            continue;
        };
        let chars = content.chars().count();
        if chars <= config.stub_threshold {
            continue;
        }

        let stub = stub_for(&meta.tool_name, chars);
        report.freed_chars += chars.saturating_sub(stub.chars().count());
        report.stubbed += 1;
        msg.content = Some(stub);
        msg.decay = None;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_msg(turn: u32, name: &str, content: &str) -> Message {
        Message::tool_result(format!("call-{turn}"), content).with_decay(turn, name)
    }

    #[test]
    fn stubs_old_large_result() {
        let mut messages = vec![tool_msg(1, "read_letter", &"a".repeat(1000))];
        let config = DecayConfig::new().with_turn_window(1).with_stub_threshold(100);

        let report = decay(&mut messages, 3, &config);

        assert_eq!(messages[0].text(), "[read_letter(): returned 1000 chars]");
        assert_eq!(report.stubbed, 1);
        assert!(report.freed_chars > 900);
        assert!(messages[0].decay.is_none());
    }

    #[test]
    fn boundary_turn_is_stubbed() {
        let config = DecayConfig::new().with_turn_window(2).with_stub_threshold(10);

        let mut at_boundary = vec![tool_msg(3, "look", &"x".repeat(50))];
        decay(&mut at_boundary, 5, &config);
        assert!(at_boundary[0].text().starts_with("[look():"));

        let mut inside_window = vec![tool_msg(4, "look", &"x".repeat(50))];
        decay(&mut inside_window, 5, &config);
        assert_eq!(inside_window[0].text(), "x".repeat(50));
    }

    #[test]
    fn content_at_threshold_is_untouched() {
        let config = DecayConfig::new().with_turn_window(0).with_stub_threshold(10);
        let mut messages = vec![
            tool_msg(1, "look", &"x".repeat(10)),
            tool_msg(1, "look", &"x".repeat(11)),
        ];
        let report = decay(&mut messages, 9, &config);
        assert_eq!(report.stubbed, 1);
        assert_eq!(messages[0].text(), "x".repeat(10));
        assert_eq!(messages[1].text(), "[look(): returned 11 chars]");
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let config = DecayConfig::new().with_turn_window(0).with_stub_threshold(5);
        let mut messages = vec![tool_msg(1, "read", "ééééé")];
        decay(&mut messages, 1, &config);
        assert_eq!(messages[0].text(), "ééééé");
    }

    #[test]
    fn non_tool_and_untagged_messages_never_change() {
        let big = "z".repeat(5000);
        let mut messages = vec![
            Message::user(big.clone()),
            Message::assistant_text(big.clone()),
            Message::tool_result("c1", big.clone()),
        ];
        let before = messages.clone();
        let config = DecayConfig::new().with_turn_window(0).with_stub_threshold(0);

        let report = decay(&mut messages, 100, &config);

        assert_eq!(report, DecayReport::default());
        assert_eq!(messages, before);
    }

    #[test]
    fn early_turns_do_not_underflow() {
        let config = DecayConfig::new().with_turn_window(5).with_stub_threshold(1);
        let mut messages = vec![tool_msg(0, "look", "long enough")];
        decay(&mut messages, 2, &config);
        assert_eq!(messages[0].text(), "long enough");
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let config = DecayConfig::new().with_turn_window(0).with_stub_threshold(3);
        let mut messages = vec![tool_msg(1, "look", &"y".repeat(40))];
        decay(&mut messages, 1, &config);
        let once = messages.clone();
        let report = decay(&mut messages, 50, &config);
        assert_eq!(report.stubbed, 0);
        assert_eq!(messages, once);
    }
}
