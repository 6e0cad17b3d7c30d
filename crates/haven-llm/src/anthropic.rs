use async_trait::async_trait;
use haven_core::{HavenError, Message, MessageContent, Result, Role, ToolCall};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::provider::*;

const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn build_request_body(&self, request: &LlmRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter_map(|msg| match msg.role {
                // handled via the top-level "system" field
                Role::System => None,
                Role::User => Some(json!({ "role": "user", "content": msg.text_content() })),
                Role::Assistant if msg.tool_calls.is_empty() => {
                    Some(json!({ "role": "assistant", "content": msg.text_content() }))
                }
                Role::Assistant => {
                    let text = msg.text_content();
                    let mut blocks = Vec::with_capacity(msg.tool_calls.len() + 1);
                    if !text.is_empty() {
                        blocks.push(json!({ "type": "text", "text": text }));
                    }
                    blocks.extend(msg.tool_calls.iter().map(|tc| {
                        json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.tool_name,
                            "input": tc.arguments,
                        })
                    }));
                    Some(json!({ "role": "assistant", "content": blocks }))
                }
                // Tool results travel as a user turn made of tool_result blocks.
                Role::Tool => {
                    let blocks: Vec<Value> = msg
                        .content
                        .iter()
                        .filter_map(|block| match block {
                            MessageContent::ToolResult { tool_call_id, content, is_error } => {
                                Some(json!({
                                    "type": "tool_result",
                                    "tool_use_id": tool_call_id,
                                    "content": content,
                                    "is_error": is_error,
                                }))
                            }
                            MessageContent::Text { .. } => None,
                        })
                        .collect();
                    Some(json!({ "role": "user", "content": blocks }))
                }
            })
            .collect();

        let mut body = json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });

        if let Some(ref system) = request.system {
            body["system"] = json!(system);
        }

        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
        }

        body
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = self.build_request_body(request);
        debug!(model = %request.model, "sending Anthropic API request");

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| HavenError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HavenError::LlmProvider(format!("HTTP {status}: {text}")));
        }

        let data: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| HavenError::LlmProvider(e.to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in data.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    tool_name: name,
                    arguments: input,
                }),
                ContentBlock::Other => {}
            }
        }

        let has_tool_calls = !tool_calls.is_empty();
        let mut message = Message::text(Role::Assistant, text);
        message.tool_calls = tool_calls;

        Ok(LlmResponse {
            message,
            usage: Usage {
                input_tokens: data.usage.input_tokens,
                output_tokens: data.usage.output_tokens,
            },
            has_tool_calls,
            stop_reason: StopReason::from_wire(data.stop_reason.as_deref()),
        })
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(HavenError::LlmProvider("ANTHROPIC_API_KEY not set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{Tool, ToolResult};

    fn request(messages: Vec<Message>) -> LlmRequest {
        LlmRequest {
            model: "claude-3-5-sonnet-latest".into(),
            messages,
            tools: vec![Tool {
                name: "query_shelters".into(),
                description: "stats".into(),
                parameters: json!({"type": "object"}),
            }],
            system: Some("You coordinate shelters.".into()),
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_body_moves_system_and_maps_tool_turns() {
        let call = ToolCall {
            id: "toolu_1".into(),
            tool_name: "query_shelters".into(),
            arguments: json!({}),
        };
        let mut assistant = Message::text(Role::Assistant, "");
        assistant.tool_calls = vec![call.clone()];
        let messages = vec![
            Message::text(Role::System, "ignored"),
            Message::text(Role::User, "How many animals?"),
            assistant,
            Message::tool_result(&ToolResult::ok(&call, "12")),
        ];

        let body = AnthropicProvider::new("k".into()).build_request_body(&request(messages));
        let wire = body["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 3);
        assert_eq!(body["system"], "You coordinate shelters.");
        assert_eq!(wire[1]["content"][0]["type"], "tool_use");
        assert_eq!(wire[2]["role"], "user");
        assert_eq!(wire[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_response_blocks_parse() {
        let data: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "t", "name": "match_pets", "input": {"animal_type": "cat"}},
                {"type": "thinking", "thinking": "..."}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }))
        .unwrap();
        assert_eq!(data.content.len(), 3);
        assert!(matches!(data.content[2], ContentBlock::Other));
        assert_eq!(data.usage.output_tokens, 4);
    }
}
