//! Turns agent events into the plain-text chunks streamed to HTTP clients.

use std::time::Duration;

use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agent::AgentEvent;

/// Streamed when the agent run itself fails.
pub const APOLOGY: &str = "I apologize, but I encountered an issue while processing your request. Please try again later.";

/// Streamed on the adoption chat when a search tool reports a failure.
pub const SEARCH_APOLOGY: &str = "I apologize, but I encountered an issue while searching for pets. Please try again later.\n";

/// How a stream presents itself to the client.
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    /// Pause after each text chunk.
    pub delay: Duration,
    /// Line sent when a tool result looks like a failure. `None` stays silent.
    pub tool_failure_line: Option<&'static str>,
}

impl RelayPolicy {
    pub fn adopt(delay: Duration) -> Self {
        Self {
            delay,
            tool_failure_line: Some(SEARCH_APOLOGY),
        }
    }

    pub fn intake(delay: Duration) -> Self {
        Self {
            delay,
            tool_failure_line: Some(APOLOGY),
        }
    }

    pub fn chat(delay: Duration) -> Self {
        Self {
            delay,
            tool_failure_line: None,
        }
    }
}

/// Relay an agent's events as text.
///
/// Text is forwarded, separated by a blank line when the agent speaks more
/// than once. Tool traffic is logged and never forwarded, except for the
/// similar-shelter notice and the policy's failure line. A failed run ends
/// the stream with [`APOLOGY`].
pub fn relay(
    mut events: mpsc::Receiver<AgentEvent>,
    policy: RelayPolicy,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let mut spoke = false;
        while let Some(event) = events.recv().await {
            match event {
                AgentEvent::Text { content } => {
                    if spoke {
                        yield format!("\n\n{content}");
                    } else {
                        yield content;
                    }
                    spoke = true;
                    if !policy.delay.is_zero() {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
                AgentEvent::ToolCall { name, args, .. } => {
                    debug!(tool = %name, %args, "tool call");
                }
                AgentEvent::ToolResult { name, content, is_error, data, .. } => {
                    debug!(tool = %name, is_error, %content, "tool result");
                    let failure = policy
                        .tool_failure_line
                        .filter(|_| looks_failed(is_error, &content));
                    if let Some(notice) = similar_shelters_notice(data.as_ref()) {
                        yield notice;
                    } else if let Some(line) = failure {
                        yield line.to_string();
                    }
                }
                AgentEvent::Error { message } => {
                    warn!(error = %message, "agent stream failed");
                    yield APOLOGY.to_string();
                    break;
                }
                AgentEvent::Done => break,
            }
        }
    }
}

fn looks_failed(is_error: bool, content: &str) -> bool {
    is_error || content.contains("error") || content.contains("failed")
}

/// The question put to the user when intake found look-alike shelters.
fn similar_shelters_notice(data: Option<&Value>) -> Option<String> {
    let data = data?;
    if data["needs_confirmation"].as_bool() != Some(true) {
        return None;
    }
    let listed = data["similar"]
        .as_array()?
        .iter()
        .filter_map(|s| Some(format!("{} in {}", s["name"].as_str()?, s["location"].as_str()?)))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "I noticed some similar shelters: {listed}. Is this the same shelter? Please let me know \
         if this is a different shelter and we should proceed with registration, or if it's the \
         same one and we should update the existing record instead."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    async fn collect(events: Vec<AgentEvent>, policy: RelayPolicy) -> Vec<String> {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);
        relay(rx, policy).collect().await
    }

    fn result(content: &str, is_error: bool, data: Option<Value>) -> AgentEvent {
        AgentEvent::ToolResult {
            name: "t".into(),
            id: "1".into(),
            content: content.into(),
            is_error,
            data,
        }
    }

    #[tokio::test]
    async fn test_text_forwarded_and_tools_hidden() {
        let chunks = collect(
            vec![
                AgentEvent::Text { content: "Let me look.".into() },
                result("{\"total\": 3}", false, None),
                AgentEvent::Text { content: "Found three.".into() },
                AgentEvent::Done,
            ],
            RelayPolicy::chat(Duration::ZERO),
        )
        .await;
        assert_eq!(chunks, ["Let me look.", "\n\nFound three."]);
    }

    #[tokio::test]
    async fn test_failed_search_apologizes_on_adopt_only() {
        let events = || vec![result("lookup failed", false, None), AgentEvent::Done];
        assert_eq!(
            collect(events(), RelayPolicy::adopt(Duration::ZERO)).await,
            [SEARCH_APOLOGY]
        );
        assert!(collect(events(), RelayPolicy::chat(Duration::ZERO)).await.is_empty());
    }

    #[tokio::test]
    async fn test_run_error_ends_with_apology() {
        let chunks = collect(
            vec![
                AgentEvent::Error { message: "boom".into() },
                AgentEvent::Text { content: "never sent".into() },
            ],
            RelayPolicy::intake(Duration::ZERO),
        )
        .await;
        assert_eq!(chunks, [APOLOGY]);
    }

    #[tokio::test]
    async fn test_similar_shelter_notice() {
        let data = json!({
            "needs_confirmation": true,
            "similar": [
                {"id": "1", "name": "Happy Paws", "location": "Portland"},
                {"id": "2", "name": "Paws Place", "location": "Salem"}
            ]
        });
        let chunks = collect(
            vec![result("Similar shelters already exist", false, Some(data)), AgentEvent::Done],
            RelayPolicy::intake(Duration::ZERO),
        )
        .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with(
            "I noticed some similar shelters: Happy Paws in Portland, Paws Place in Salem. Is this the same shelter?"
        ));
    }
}
