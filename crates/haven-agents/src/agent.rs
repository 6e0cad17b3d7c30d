//! The tool-calling agent loop shared by every agent role.

use std::sync::Arc;

use haven_config::AgentConfig;
use haven_core::{HavenError, Message, Result, Role, ToolExecutor, ToolResult};
use haven_llm::{LlmRequest, ModelRouter};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::threads::ThreadMemory;

/// A chunk of agent progress sent to a streaming consumer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "text")]
    Text { content: String },
    #[serde(rename = "tool_call")]
    ToolCall {
        name: String,
        id: String,
        #[serde(default)]
        args: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        name: String,
        id: String,
        content: String,
        is_error: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "error")]
    Error { message: String },
}

/// A system prompt, a tool set and a model: enough to hold a conversation.
pub struct Agent {
    name: String,
    system_prompt: String,
    router: Arc<ModelRouter>,
    tools: Arc<dyn ToolExecutor>,
    settings: AgentConfig,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        router: Arc<ModelRouter>,
        tools: Arc<dyn ToolExecutor>,
        settings: AgentConfig,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            router,
            tools,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run the loop to completion and return the final reply text.
    pub async fn ask(&self, messages: Vec<Message>) -> Result<String> {
        let history = self.run(messages, None, None).await?;
        Ok(final_text(&history))
    }

    /// Run the loop on a background task, streaming events as they happen.
    ///
    /// The channel always ends with either [`AgentEvent::Done`] or
    /// [`AgentEvent::Error`].
    pub fn stream(
        self: &Arc<Self>,
        messages: Vec<Message>,
        guidance: Option<String>,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(64);
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = agent.run(messages, guidance.as_deref(), Some(&tx)).await;
            finish(&tx, &agent.name, outcome.map(|_| ())).await;
        });
        rx
    }

    /// Stream a reply to `text` within a persisted conversation thread.
    ///
    /// Turns on the same thread are serialized; the updated history is saved
    /// only when the turn completes.
    pub fn stream_thread(
        self: &Arc<Self>,
        memory: Arc<ThreadMemory>,
        thread_id: String,
        text: String,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(64);
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            let lock = memory.run_lock(&thread_id);
            let _guard = lock.lock().await;

            let outcome = async {
                let mut history = memory.load(&thread_id)?;
                history.push(Message::text(Role::User, text));
                let history = agent.run(history, None, Some(&tx)).await?;
                memory.save(&thread_id, &history)
            }
            .await;
            finish(&tx, &agent.name, outcome).await;
        });
        rx
    }

    /// The core loop: call the model, execute requested tools, feed results
    /// back, and stop at the first reply without tool calls.
    ///
    /// Returns the full history including the messages added by this run.
    pub async fn run(
        &self,
        mut messages: Vec<Message>,
        guidance: Option<&str>,
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<Vec<Message>> {
        let system = match guidance {
            Some(extra) => format!("{}\n\n{}", self.system_prompt, extra),
            None => self.system_prompt.clone(),
        };
        let tools = self.tools.tools();

        for iteration in 0..self.settings.max_iterations {
            let request = LlmRequest {
                model: self.settings.model.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                system: Some(system.clone()),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };
            debug!(agent = %self.name, iteration, messages = request.messages.len(), "calling model");

            let response = self.router.complete(&request).await?;
            let reply = response.message;
            let text = reply.text_content();
            let calls = reply.tool_calls.clone();

            if !text.trim().is_empty() {
                emit(events, AgentEvent::Text { content: text }).await;
            }
            messages.push(reply);

            if calls.is_empty() {
                info!(
                    agent = %self.name,
                    iterations = iteration + 1,
                    output_tokens = response.usage.output_tokens,
                    "agent turn complete"
                );
                return Ok(messages);
            }

            for call in calls {
                emit(
                    events,
                    AgentEvent::ToolCall {
                        name: call.tool_name.clone(),
                        id: call.id.clone(),
                        args: call.arguments.clone(),
                    },
                )
                .await;

                let result = match self.tools.execute(&call).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(agent = %self.name, tool = %call.tool_name, error = %e, "tool failed");
                        ToolResult::error(&call, e.to_string())
                    }
                };
                debug!(agent = %self.name, tool = %call.tool_name, is_error = result.is_error, "tool finished");

                emit(
                    events,
                    AgentEvent::ToolResult {
                        name: call.tool_name.clone(),
                        id: call.id.clone(),
                        content: result.content.clone(),
                        is_error: result.is_error,
                        data: result.data.clone(),
                    },
                )
                .await;
                messages.push(Message::tool_result(&result));
            }
        }

        Err(HavenError::Agent(format!(
            "{} stopped after {} iterations without a final answer",
            self.name, self.settings.max_iterations
        )))
    }
}

/// Text of the last assistant message in a history.
pub fn final_text(history: &[Message]) -> String {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(Message::text_content)
        .unwrap_or_default()
}

async fn emit(events: Option<&mpsc::Sender<AgentEvent>>, event: AgentEvent) {
    // A dropped receiver means the client went away; the run still completes.
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

async fn finish(tx: &mpsc::Sender<AgentEvent>, agent: &str, outcome: Result<()>) {
    let event = match outcome {
        Ok(()) => AgentEvent::Done,
        Err(e) => {
            warn!(agent, error = %e, "agent run failed");
            AgentEvent::Error {
                message: e.to_string(),
            }
        }
    };
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use haven_core::{Tool, ToolCall};
    use haven_llm::MockProvider;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        fn tools(&self) -> Vec<Tool> {
            vec![Tool {
                name: "echo".into(),
                description: "Echo the input".into(),
                parameters: json!({"type": "object"}),
            }]
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::ok(call, call.arguments.to_string()))
        }
    }

    fn agent(provider: MockProvider, max_iterations: u32) -> Arc<Agent> {
        let router = ModelRouter::new().with_provider(Arc::new(provider));
        let settings = AgentConfig {
            model: "mock/test".into(),
            max_iterations,
            ..AgentConfig::default()
        };
        Arc::new(Agent::new("test", "You are a test.", Arc::new(router), Arc::new(Echo), settings))
    }

    #[tokio::test]
    async fn test_tool_round_trip_then_answer() {
        let provider = MockProvider::new("mock")
            .with_tool_call("echo", json!({"x": 1}))
            .with_response("all done");
        let requests = provider.recorded_requests();
        let agent = agent(provider, 4);

        let answer = agent.ask(vec![Message::text(Role::User, "hi")]).await.unwrap();
        assert_eq!(answer, "all done");

        let requests = requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, "test");
        assert_eq!(requests[1].messages.last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn test_stream_emits_events_in_order() {
        let provider = MockProvider::new("mock")
            .with_tool_call("echo", json!({}))
            .with_response("finished");
        let mut rx = agent(provider, 4).stream(vec![Message::text(Role::User, "go")], None);

        let mut kinds = vec![];
        while let Some(event) = rx.recv().await {
            kinds.push(match event {
                AgentEvent::Text { .. } => "text",
                AgentEvent::ToolCall { .. } => "tool_call",
                AgentEvent::ToolResult { .. } => "tool_result",
                AgentEvent::Done => "done",
                AgentEvent::Error { .. } => "error",
            });
        }
        assert_eq!(kinds, ["tool_call", "tool_result", "text", "done"]);
    }

    #[tokio::test]
    async fn test_iteration_cap_is_an_error() {
        let provider = MockProvider::new("mock")
            .with_responder(|_| haven_llm::MockResponse::tool_call("echo", json!({})));
        let err = agent(provider, 2)
            .ask(vec![Message::text(Role::User, "loop")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("2 iterations"));
    }

    #[tokio::test]
    async fn test_guidance_is_appended_to_system_prompt() {
        let provider = MockProvider::new("mock").with_response("ok");
        let requests = provider.recorded_requests();
        let agent = agent(provider, 1);
        agent
            .run(vec![Message::text(Role::User, "hi")], Some("Be brief."), None)
            .await
            .unwrap();
        let system = requests.lock()[0].system.clone().unwrap();
        assert_eq!(system, "You are a test.\n\nBe brief.");
    }

    #[tokio::test]
    async fn test_provider_error_ends_stream_with_error() {
        let provider = MockProvider::new("mock").with_error("overloaded");
        let mut rx = agent(provider, 2).stream(vec![Message::text(Role::User, "hi")], None);
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(AgentEvent::Error { message }) if message.contains("overloaded")));
    }
}
