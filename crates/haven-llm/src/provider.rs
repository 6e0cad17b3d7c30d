use async_trait::async_trait;
use haven_core::{Message, Result, Tool};
use serde::{Deserialize, Serialize};

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The model to use. Carries the `provider/` prefix until the router strips it.
    pub model: String,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Available tools.
    pub tools: Vec<Tool>,
    /// System prompt (separate from messages for providers that support it).
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A complete response from an LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub message: Message,
    pub usage: Usage,
    /// Whether the model wants to continue (has tool calls).
    pub has_tool_calls: bool,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    ContentFilter,
}

impl StopReason {
    /// Map a provider's stop / finish reason string.
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("tool_use" | "tool_calls") => Self::ToolUse,
            Some("max_tokens" | "length") => Self::MaxTokens,
            Some("stop_sequence") => Self::StopSequence,
            Some("content_filter") => Self::ContentFilter,
            _ => Self::EndTurn,
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Trait implemented by each LLM provider (Anthropic, OpenAI, mock).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Routing prefix, e.g. "anthropic", "openai".
    fn name(&self) -> &str;

    /// Send a request and wait for the full reply.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if this provider is usable (credentials present, etc.).
    async fn health_check(&self) -> Result<()>;
}
