//! Context compaction: fold older turns into a model-written summary.
//!
//! When the last model call's input tokens reach a fraction of the context
//! window, everything but the most recent messages is rendered into a plain
//! transcript and sent to the model with [`COMPACTION_PROMPT`]. The reply
//! replaces the older messages as one synthetic user message:
//!
//! ```text
//! [Earlier this session]
//! You woke in the bedroom and read two letters...
//! [The session continues...]
//! ```
//!
//! Compaction is reactive: it is checked against the input size of the call
//! that just finished, so it takes effect one turn behind the measurement.
//!
//! Failures propagate. The turn loop keeps a mapping from transcript
//! positions to durable sequence numbers, and a transcript that shrank
//! without the range being recorded would corrupt that mapping.
//!
//! Summary tokens are reported in [`CompactionResult::summary_tokens`] but
//! are not charged to the session budget; the budget governs the visible
//! dialogue only.

use crate::api::{LlmClient, LlmRequest};
use crate::{Message, MessageRole, truncate_chars};
use std::ops::Range;
use tracing::{debug, info};

/// System prompt for the summarization call.
pub const COMPACTION_PROMPT: &str = "\
You are helping someone remember the earlier part of their day. Below is a \
transcript of what they did, said, and saw. Retell it to them as a short \
narrative written in the second person (\"You woke up in the bedroom...\").

Keep:
- where they went and in what order,
- what they read, wrote, made, or decided, with names and specifics,
- anything left unfinished that they meant to come back to,
- how they were feeling, if they said.

Rules:
- Only include what the transcript shows. Do not invent or embellish.
- Do not mention the transcript, tools, or tokens.
- A few paragraphs at most.";

/// First line of the synthetic summary message.
pub const SUMMARY_OPENING: &str = "[Earlier this session]";

/// Last line of the synthetic summary message.
pub const SUMMARY_CLOSING: &str = "[The session continues...]";

/// Characters of each tool result kept in the summarization transcript.
pub const DEFAULT_TOOL_RESULT_PREVIEW_CHARS: usize = 500;

/// Configuration for compaction.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Model context window in tokens.
    pub context_window_tokens: u64,
    /// Compact once input tokens reach this fraction of the window.
    pub threshold_fraction: f64,
    /// Number of most recent messages kept verbatim.
    pub recent_messages_to_keep: usize,
    pub tool_result_preview_chars: usize,
    /// Model for the summary call; `None` uses the client's default.
    pub model: Option<String>,
    pub max_summary_tokens: u32,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            context_window_tokens: 200_000,
            threshold_fraction: 0.9,
            recent_messages_to_keep: 10,
            tool_result_preview_chars: DEFAULT_TOOL_RESULT_PREVIEW_CHARS,
            model: None,
            max_summary_tokens: 2048,
        }
    }
}

impl CompactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window_tokens = tokens;
        self
    }

    pub fn with_threshold_fraction(mut self, fraction: f64) -> Self {
        self.threshold_fraction = fraction;
        self
    }

    pub fn with_recent_messages_to_keep(mut self, count: usize) -> Self {
        self.recent_messages_to_keep = count;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Output of one [`CompactionEngine::compact`] call.
#[derive(Debug, Clone)]
pub struct CompactionResult {
    /// Summary message followed by the kept suffix, or the input unchanged.
    pub messages: Vec<Message>,
    pub original_message_count: usize,
    pub compacted_message_count: usize,
    /// Output tokens of the summarization call (not charged to the budget).
    pub summary_tokens: u64,
    /// Input tokens of the summarization call.
    pub source_tokens: u64,
    /// Transcript positions that were summarized, `None` for a no-op. The
    /// turn loop translates these into durable sequence numbers.
    pub compacted_range: Option<Range<usize>>,
    pub summary_text: Option<String>,
}

impl CompactionResult {
    fn unchanged(messages: &[Message]) -> Self {
        Self {
            messages: messages.to_vec(),
            original_message_count: messages.len(),
            compacted_message_count: messages.len(),
            summary_tokens: 0,
            source_tokens: 0,
            compacted_range: None,
            summary_text: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.compacted_range.is_none()
    }
}

/// Decides when to compact and performs the compaction.
#[derive(Debug, Clone, Default)]
pub struct CompactionEngine {
    config: CompactionConfig,
}

impl CompactionEngine {
    pub fn new(config: CompactionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Input-token level at which compaction kicks in.
    pub fn context_trigger(&self) -> u64 {
        (self.config.context_window_tokens as f64 * self.config.threshold_fraction) as u64
    }

    pub fn should_compact(&self, input_tokens: u64) -> bool {
        input_tokens >= self.context_trigger()
    }

    /// Summarize all but the last `recent_messages_to_keep` messages.
    ///
    /// Returns the input unchanged (with no range) when there is nothing
    /// older than the recency window. Errors from the model, and empty
    /// summaries, are returned to the caller.
    pub async fn compact(
        &self,
        client: &dyn LlmClient,
        messages: &[Message],
    ) -> Result<CompactionResult, String> {
        let keep = self.config.recent_messages_to_keep;
        if messages.len() <= keep {
            debug!(
                "Compaction skipped: {} messages within recency window of {keep}",
                messages.len()
            );
            return Ok(CompactionResult::unchanged(messages));
        }

        let split = messages.len() - keep;
        let transcript =
            render_transcript(&messages[..split], self.config.tool_result_preview_chars);
        let request_messages = vec![Message::user(transcript)];
        let request = LlmRequest::new(COMPACTION_PROMPT, &request_messages)
            .with_model(self.config.model.as_deref())
            .with_max_tokens(self.config.max_summary_tokens);

        let response = client.send(request).await?;
        let summary = response
            .content
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "summarizer returned an empty summary".to_string())?
            .to_string();

        let mut compacted = Vec::with_capacity(keep + 1);
        compacted.push(Message::user(wrap_summary(&summary)));
        compacted.extend_from_slice(&messages[split..]);

        info!(
            "Compacted {} messages into a {}-char summary ({} -> {} messages)",
            split,
            summary.len(),
            messages.len(),
            compacted.len(),
        );

        Ok(CompactionResult {
            original_message_count: messages.len(),
            compacted_message_count: compacted.len(),
            messages: compacted,
            summary_tokens: response.usage.output_tokens,
            source_tokens: response.usage.input_tokens,
            compacted_range: Some(0..split),
            summary_text: Some(summary),
        })
    }
}

/// Wrap a summary in the markers the model sees.
pub fn wrap_summary(summary: &str) -> String {
    format!("{SUMMARY_OPENING}\n{summary}\n{SUMMARY_CLOSING}")
}

/// Render messages as a plain-text transcript for summarization.
///
/// Tool results are cut to `tool_result_chars`; tool-call turns are shown
/// as `[Called tools: a, b]` rather than raw arguments.
pub fn render_transcript(messages: &[Message], tool_result_chars: usize) -> String {
    let mut blocks = Vec::with_capacity(messages.len());
    for msg in messages {
        let block = match msg.role {
            MessageRole::Tool => format!(
                "[tool result]: {}",
                truncate_chars(msg.text(), tool_result_chars, "...")
            ),
            MessageRole::Assistant => {
                let mut parts = Vec::new();
                if !msg.text().is_empty() {
                    parts.push(msg.text().to_string());
                }
                let called = msg.called_tool_names();
                if !called.is_empty() {
                    parts.push(format!("[Called tools: {}]", called.join(", ")));
                }
                if parts.is_empty() {
                    continue;
                }
                format!("[assistant]: {}", parts.join("\n"))
            }
            MessageRole::User | MessageRole::System => {
                format!("[{}]: {}", msg.role, msg.text())
            }
        };
        blocks.push(block);
    }
    blocks.join("\n\n")
}
