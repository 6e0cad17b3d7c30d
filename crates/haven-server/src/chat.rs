//! Conversational endpoints. Replies stream back as plain text.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use haven_agents::{AdopterPreferences, AgentEvent, RelayPolicy, prompt, relay};
use haven_core::{Message, Role};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

/// Chat history as sent by the web client. Only user and assistant turns
/// with string content are kept.
fn conversation(body: &Value) -> Option<Vec<Message>> {
    let items = body.get("messages")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|m| {
                let role = match m["role"].as_str()? {
                    "user" => Role::User,
                    "assistant" => Role::Assistant,
                    _ => return None,
                };
                Some(Message::text(role, m["content"].as_str()?))
            })
            .collect(),
    )
}

fn text_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)?.as_str().filter(|s| !s.trim().is_empty())
}

fn text_response(events: mpsc::Receiver<AgentEvent>, policy: RelayPolicy) -> Response {
    let body = Body::from_stream(relay(events, policy).map(Ok::<_, Infallible>));
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

fn stream_delay(state: &AppState) -> Duration {
    Duration::from_millis(state.config().agent.stream_delay_ms)
}

/// `POST /api/adopt`: adopter conversation with the coordinator.
pub async fn adopt_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    let messages = conversation(&body).unwrap_or_default();

    let user_text: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(Message::text_content)
        .collect();
    let preferences = AdopterPreferences::from_user_messages(user_text.iter().map(String::as_str));
    let completeness = preferences.completeness();
    info!(
        score = completeness.score,
        missing = ?completeness.missing_key,
        "adopter preferences extracted"
    );

    let coordinator = state.manager.coordinator().await?;
    let events = coordinator.respond(messages, Some(prompt::adopt_guidance(&preferences)));
    Ok(text_response(events, RelayPolicy::adopt(stream_delay(&state))))
}

/// `POST /api/chat`: talk to one shelter's agent, named in the body.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    let (Some(message), Some(shelter_id)) = (text_field(&body, "message"), text_field(&body, "shelterId"))
    else {
        return Err(ApiError::bad_request("Message and shelter ID are required"));
    };
    shelter_reply(&state, shelter_id, message).await
}

/// `POST /api/shelters/{id}/chat`
pub async fn shelter_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(shelter_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    let Some(message) = text_field(&body, "message") else {
        return Err(ApiError::bad_request("Message is required"));
    };
    shelter_reply(&state, &shelter_id, message).await
}

async fn shelter_reply(state: &AppState, shelter_id: &str, message: &str) -> ApiResult<Response> {
    let Some(agent) = state.manager.shelter_agent(shelter_id).await? else {
        warn!(%shelter_id, "chat for unknown shelter");
        return Err(ApiError::not_found("Shelter not found"));
    };
    let events = agent.converse(message);
    Ok(text_response(events, RelayPolicy::chat(stream_delay(state))))
}

/// `POST /api/coordinator`: run the coordinator to completion.
pub async fn coordinator_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let Some(messages) = conversation(&body) else {
        return Err(ApiError::bad_request(
            "Invalid request body - messages array required",
        ));
    };

    let reply = match state.manager.coordinator().await {
        Ok(coordinator) => coordinator.invoke(messages).await,
        Err(e) => Err(e),
    };
    match reply {
        Ok(response) => Ok(Json(json!({ "status": "success", "response": response }))),
        Err(e) => {
            warn!(error = %e, "coordinator request failed");
            Err(ApiError::internal("Failed to process request"))
        }
    }
}

/// `POST /api/intake`: conversational shelter registration.
pub async fn intake_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    let messages = conversation(&body).unwrap_or_default();
    let intake = state.manager.intake().await?;
    Ok(text_response(
        intake.respond(messages),
        RelayPolicy::intake(stream_delay(&state)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_keeps_user_and_assistant_text() {
        let body = json!({
            "messages": [
                {"role": "system", "content": "ignored"},
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": [{"type": "image"}]}
            ]
        });
        let messages = conversation(&body).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].text_content(), "Hello!");
    }

    #[test]
    fn test_conversation_requires_array() {
        assert!(conversation(&json!({})).is_none());
        assert!(conversation(&json!({"messages": "hi"})).is_none());
        assert_eq!(conversation(&json!({"messages": []})).map(|m| m.len()), Some(0));
    }

    #[test]
    fn test_blank_fields_are_missing() {
        let body = json!({"message": "  ", "shelterId": "abc"});
        assert_eq!(text_field(&body, "message"), None);
        assert_eq!(text_field(&body, "shelterId"), Some("abc"));
        assert_eq!(text_field(&body, "other"), None);
    }
}
