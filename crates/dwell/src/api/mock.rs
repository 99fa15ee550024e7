//! Scripted [`LlmClient`] for tests and offline runs.
//!
//! Turn calls (requests that carry tool definitions) and plain completions
//! (compaction and session summaries, which carry none) are served from two
//! separate queues, so a test can script the conversation and the summaries
//! independently. Every request is recorded for later assertions.

use super::{LlmClient, LlmFuture, LlmRequest, LlmResponse, LlmUsage};
use crate::{Message, ToolCall};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a [`ScriptedClient`] saw in one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Names of the offered tools, `None` for plain completions.
    pub tool_names: Option<Vec<String>>,
    pub model: Option<String>,
}

type Scripted = Result<LlmResponse, String>;

/// Replays canned responses in order.
pub struct ScriptedClient {
    model: String,
    turns: Mutex<VecDeque<Scripted>>,
    completions: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
    call_count: AtomicUsize,
    latency: Option<Duration>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            model: "mock/scripted".into(),
            turns: Mutex::new(VecDeque::new()),
            completions: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Queue a response for the next turn call.
    pub fn with_turn(self, response: LlmResponse) -> Self {
        lock(&self.turns).push_back(Ok(response));
        self
    }

    /// Queue a failure for the next turn call.
    pub fn with_turn_error(self, message: impl Into<String>) -> Self {
        lock(&self.turns).push_back(Err(message.into()));
        self
    }

    /// Queue a text reply for the next plain completion (summary) call.
    pub fn with_completion(self, text: impl Into<String>, usage: LlmUsage) -> Self {
        lock(&self.completions).push_back(Ok(LlmResponse::text(text, usage)));
        self
    }

    /// Queue a failure for the next plain completion call.
    pub fn with_completion_error(self, message: impl Into<String>) -> Self {
        lock(&self.completions).push_back(Err(message.into()));
        self
    }

    /// Delay every response, to keep a session in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Shorthand: a turn that calls one tool with JSON `args`.
    pub fn call(id: &str, tool: &str, args: serde_json::Value, usage: LlmUsage) -> LlmResponse {
        LlmResponse::tool_calls(vec![ToolCall::new(id, tool, args.to_string())], usage)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Requests that offered tools, i.e. the session's turns.
    pub fn turn_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.tool_names.is_some())
            .collect()
    }

    pub fn remaining_turns(&self) -> usize {
        lock(&self.turns).len()
    }
}

impl LlmClient for ScriptedClient {
    fn send<'a>(&'a self, request: LlmRequest<'a>) -> LlmFuture<'a> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(RecordedRequest {
            system_prompt: request.system_prompt.to_string(),
            messages: request.messages.to_vec(),
            tool_names: request
                .tools
                .map(|t| t.iter().map(|d| d.function.name.clone()).collect()),
            model: request.model.map(str::to_string),
        });

        let queue = if request.tools.is_some() {
            &self.turns
        } else {
            &self.completions
        };
        let next = lock(queue)
            .pop_front()
            .unwrap_or_else(|| Err("scripted client: no response queued".to_string()));
        let latency = self.latency;

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            next
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolDef;

    #[tokio::test]
    async fn routes_by_tool_presence() {
        let client = ScriptedClient::new()
            .with_turn(LlmResponse::text("turn", LlmUsage::new(1, 1)))
            .with_completion("summary", LlmUsage::new(2, 2));

        let messages = vec![Message::user("hi")];
        let tools = vec![ToolDef::new("t", "d", serde_json::json!({"type": "object"}))];

        let summary = client.send(LlmRequest::new("s", &messages)).await.unwrap();
        assert_eq!(summary.content.as_deref(), Some("summary"));

        let turn = client
            .send(LlmRequest::new("s", &messages).with_tools(&tools))
            .await
            .unwrap();
        assert_eq!(turn.content.as_deref(), Some("turn"));

        assert_eq!(client.call_count(), 2);
        assert_eq!(client.turn_requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_queue_is_an_error() {
        let client = ScriptedClient::new();
        let messages = vec![];
        let result = client.send(LlmRequest::new("s", &messages)).await;
        assert!(result.unwrap_err().contains("no response queued"));
    }
}
