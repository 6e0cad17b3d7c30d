use async_trait::async_trait;
use haven_core::{HavenError, Message, MessageContent, Result, Role, ToolCall};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::provider::*;

/// OpenAI-compatible chat completions provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".into(),
        }
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn build_request_body(request: &LlmRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }

        for msg in &request.messages {
            match msg.role {
                Role::System => messages.push(json!({ "role": "system", "content": msg.text_content() })),
                Role::User => messages.push(json!({ "role": "user", "content": msg.text_content() })),
                Role::Assistant if msg.tool_calls.is_empty() => {
                    messages.push(json!({ "role": "assistant", "content": msg.text_content() }))
                }
                Role::Assistant => {
                    let calls: Vec<Value> = msg
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.tool_name,
                                    "arguments": tc.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    let text = msg.text_content();
                    messages.push(json!({
                        "role": "assistant",
                        "content": if text.is_empty() { Value::Null } else { json!(text) },
                        "tool_calls": calls,
                    }));
                }
                Role::Tool => {
                    for block in &msg.content {
                        if let MessageContent::ToolResult { tool_call_id, content, .. } = block {
                            messages.push(json!({
                                "role": "tool",
                                "tool_call_id": tool_call_id,
                                "content": content,
                            }));
                        }
                    }
                }
            }
        }

        let mut body = json!({
            "model": &request.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
        }

        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_request_body(request);
        debug!(model = %request.model, "sending chat completion request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| HavenError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HavenError::LlmProvider(format!("HTTP {status}: {text}")));
        }

        let data: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| HavenError::LlmProvider(e.to_string()))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| HavenError::LlmProvider("response contained no choices".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(|c| ToolCall {
                id: c.id,
                arguments: serde_json::from_str(&c.function.arguments).unwrap_or_else(|_| json!({})),
                tool_name: c.function.name,
            })
            .collect();
        let has_tool_calls = !tool_calls.is_empty();

        let mut message = Message::text(Role::Assistant, choice.message.content.unwrap_or_default());
        message.tool_calls = tool_calls;

        let stop_reason = match StopReason::from_wire(choice.finish_reason.as_deref()) {
            StopReason::EndTurn if has_tool_calls => StopReason::ToolUse,
            other => other,
        };

        Ok(LlmResponse {
            message,
            usage: Usage {
                input_tokens: data.usage.prompt_tokens,
                output_tokens: data.usage.completion_tokens,
            },
            has_tool_calls,
            stop_reason,
        })
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(HavenError::LlmProvider("OPENAI_API_KEY not set".into()));
        }
        Ok(())
    }
}
