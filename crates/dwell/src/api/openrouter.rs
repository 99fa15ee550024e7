//! [`LlmClient`] over the OpenRouter chat completions API.

use super::pricing::pricing_for_model;
use super::retry::{RetryConfig, retry_api_call};
use super::{LlmClient, LlmFuture, LlmRequest, LlmResponse, LlmUsage, StopReason};
use crate::{Message, MessageRole, ToolCall, ToolDef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for sessions.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Default response token limit per call.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

// ── Wire types ─────────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
    /// Ask OpenRouter to report cost in the usage block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageAccounting>,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct UsageAccounting {
    pub include: bool,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token usage as reported by OpenRouter.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    /// Present when usage accounting was requested.
    pub cost: Option<f64>,
}

/// Parsed response from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for OpenRouter.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryConfig,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    /// Create a client for `model` with default headers and retry settings.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dwell/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            retry: RetryConfig::default(),
            referer: "https://github.com/tacryt-socryp/dwell".into(),
            title: "dwell".into(),
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the `HTTP-Referer` and `X-Title` attribution headers.
    pub fn with_headers(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.title = title.into();
        self
    }

    /// Send a single chat completion request (no retries).
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, tools={}, max_tokens={}",
            body.model,
            body.messages.len(),
            body.tools.as_ref().map_or(0, |t| t.len()),
            body.max_tokens,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;
        if let Some(err) = parsed.error {
            return Err(format!("OpenRouter API error: {}", err.message));
        }

        let choice = parsed.choices.and_then(|c| c.into_iter().next());
        Ok(match choice {
            Some(c) => ChatCompletion {
                content: c.message.content,
                tool_calls: c.message.tool_calls.unwrap_or_default(),
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            },
            None => ChatCompletion {
                content: None,
                tool_calls: vec![],
                usage: parsed.usage,
                finish_reason: None,
            },
        })
    }

    fn build_body(&self, request: &LlmRequest<'_>) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(Message::system(request.system_prompt));
        messages.extend(wire_messages(request.messages));
        ChatRequest {
            model: request.model.unwrap_or(&self.model).to_string(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: self.temperature,
            tools: request.tools.map(|t| t.to_vec()),
            usage: Some(UsageAccounting { include: true }),
        }
    }
}

impl LlmClient for OpenRouterClient {
    fn send<'a>(&'a self, request: LlmRequest<'a>) -> LlmFuture<'a> {
        Box::pin(async move {
            let body = self.build_body(&request);
            let completion = retry_api_call(&self.retry, || self.chat(&body)).await?;

            let raw = completion.usage.unwrap_or_default();
            let input_tokens = raw.prompt_tokens.unwrap_or(0);
            let output_tokens = raw.completion_tokens.unwrap_or(0);
            let cost = raw.cost.or_else(|| {
                Some(pricing_for_model(&body.model).estimate_cost(input_tokens, output_tokens))
            });

            debug!(
                "LLM output: {} chars text, {} tool call(s), {input_tokens}+{output_tokens} tokens",
                completion.content.as_ref().map_or(0, |s| s.len()),
                completion.tool_calls.len(),
            );

            Ok(LlmResponse {
                content: completion.content,
                tool_calls: completion.tool_calls,
                usage: LlmUsage {
                    input_tokens,
                    output_tokens,
                    cost,
                },
                stop_reason: StopReason::from_finish_reason(completion.finish_reason.as_deref()),
            })
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Prepare transcript messages for the wire.
///
/// Compaction can summarize away the assistant message that issued a tool
/// call while keeping its result. Providers reject a tool result with no
/// matching call, so such orphans are sent as user text instead. The
/// transcript itself is not modified.
pub fn wire_messages(messages: &[Message]) -> Vec<Message> {
    let mut issued: HashSet<&str> = HashSet::new();
    messages
        .iter()
        .map(|msg| {
            if let Some(ref calls) = msg.tool_calls {
                issued.extend(calls.iter().map(|c| c.id.as_str()));
            }
            let orphaned = msg.role == MessageRole::Tool
                && msg
                    .tool_call_id
                    .as_deref()
                    .is_none_or(|id| !issued.contains(id));
            if orphaned {
                Message::user(format!("[Earlier tool result]\n{}", msg.text()))
            } else {
                msg.clone()
            }
        })
        .collect()
}
