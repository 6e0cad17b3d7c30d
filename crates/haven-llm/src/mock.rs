//! Mock LLM provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::provider::*;
use haven_core::{HavenError, Message, MessageContent, Result, Role, ToolCall};

type Responder = dyn Fn(&LlmRequest) -> MockResponse + Send + Sync;

/// A mock LLM provider that returns pre-configured responses.
///
/// Queued responses are consumed first, in order. Once the queue is empty the
/// optional responder closure answers, and failing that a placeholder text.
///
/// # Example
/// ```
/// use haven_llm::mock::MockProvider;
/// let provider = MockProvider::new("mock")
///     .with_response("We have 10 animals in our care.");
/// ```
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    responder: Option<Box<Responder>>,
    /// Every request received, for assertions in tests.
    requests: Arc<Mutex<Vec<LlmRequest>>>,
    name: String,
}

/// A pre-configured response from the mock provider.
#[derive(Clone, Default)]
pub struct MockResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// If set, the provider will return this error instead.
    pub error: Option<String>,
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn tool_call(name: &str, args: serde_json::Value) -> Self {
        Self {
            tool_calls: vec![ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4()),
                tool_name: name.to_string(),
                arguments: args,
            }],
            ..Default::default()
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            error: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            responder: None,
            requests: Arc::new(Mutex::new(vec![])),
            name: name.into(),
        }
    }

    /// Queue a simple text response.
    pub fn with_response(self, text: &str) -> Self {
        self.with_mock_response(MockResponse::text(text))
    }

    /// Queue a tool call response.
    pub fn with_tool_call(self, name: &str, args: serde_json::Value) -> Self {
        self.with_mock_response(MockResponse::tool_call(name, args))
    }

    /// Queue an error response.
    pub fn with_error(self, error: &str) -> Self {
        self.with_mock_response(MockResponse::error(error))
    }

    /// Queue a fully custom response.
    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().push_back(resp);
        self
    }

    /// Answer from a closure once the queue is drained.
    ///
    /// Useful when several agents share one provider and the reply depends on
    /// which system prompt is asking.
    pub fn with_responder<F>(mut self, f: F) -> Self
    where
        F: Fn(&LlmRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    /// Handle to the requests recorded so far.
    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<LlmRequest>>> {
        Arc::clone(&self.requests)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self, request: &LlmRequest) -> MockResponse {
        if let Some(queued) = self.responses.lock().pop_front() {
            return queued;
        }
        match &self.responder {
            Some(f) => f(request),
            None => MockResponse::text("(mock: no more queued responses)"),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().push(request.clone());
        let mock = self.next_response(request);

        if let Some(error) = mock.error {
            return Err(HavenError::LlmProvider(error));
        }

        let has_tool_calls = !mock.tool_calls.is_empty();
        let mut msg = Message::text(Role::Assistant, "");
        msg.content = if mock.text.is_empty() {
            vec![]
        } else {
            vec![MessageContent::Text { text: mock.text }]
        };
        msg.tool_calls = mock.tool_calls;

        Ok(LlmResponse {
            message: msg,
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            has_tool_calls,
            stop_reason: if has_tool_calls {
                StopReason::ToolUse
            } else {
                StopReason::EndTurn
            },
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
