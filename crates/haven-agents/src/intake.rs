//! The intake agent: onboards new shelters through conversation.

use std::sync::Arc;

use async_trait::async_trait;
use haven_core::{
    HavenError, Message, NewShelter, Result, Tool, ToolCall, ToolExecutor, ToolResult,
    operational_costs_text,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agent::{Agent, AgentEvent};
use crate::context::AgentContext;
use crate::prompt;

pub struct IntakeAgent {
    agent: Arc<Agent>,
}

impl IntakeAgent {
    pub fn new(ctx: &AgentContext) -> Self {
        let tools = IntakeTools { ctx: ctx.clone() };
        Self {
            agent: Arc::new(Agent::new(
                "intake",
                prompt::INTAKE_PROMPT,
                Arc::clone(&ctx.router),
                Arc::new(tools),
                ctx.config.agent.clone(),
            )),
        }
    }

    /// Stream a reply to a conversation supplied in full by the caller.
    pub fn respond(&self, messages: Vec<Message>) -> mpsc::Receiver<AgentEvent> {
        self.agent.stream(messages, None)
    }
}

struct IntakeTools {
    ctx: AgentContext,
}

impl IntakeTools {
    async fn create_shelter(&self, call: &ToolCall) -> Result<ToolResult> {
        // Some models send the arguments as a JSON string.
        let args = match &call.arguments {
            Value::String(raw) => serde_json::from_str(raw).unwrap_or(Value::Null),
            other => other.clone(),
        };
        let field = |key: &str| {
            args[key]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let (Some(name), Some(location)) = (field("name"), field("location")) else {
            return Ok(ToolResult::error(
                call,
                "Failed to create shelter: name and location are required",
            ));
        };
        let Some(costs) = operational_costs_text(&args["operational_costs"]) else {
            return Ok(ToolResult::error(
                call,
                "Failed to create shelter: operational_costs is required",
            ));
        };
        let confirmed_new = args["confirmed_new"].as_bool().unwrap_or(false);

        if !confirmed_new {
            let similar = self.ctx.store.find_similar(&name, &location)?;
            if !similar.is_empty() {
                info!(%name, %location, similar = similar.len(), "similar shelters found, asking for confirmation");
                let listed = similar
                    .iter()
                    .map(|s| format!("{} in {}", s.name, s.location))
                    .collect::<Vec<_>>()
                    .join(", ");
                let data = json!({
                    "needs_confirmation": true,
                    "name": name,
                    "location": location,
                    "similar": similar
                        .iter()
                        .map(|s| json!({ "id": s.id, "name": s.name, "location": s.location }))
                        .collect::<Vec<_>>(),
                });
                return Ok(ToolResult::ok(
                    call,
                    format!(
                        "Similar shelters already exist: {listed}. Ask the user whether this is \
                         one of them. If it is a different shelter, call create_shelter again \
                         with confirmed_new set to true."
                    ),
                )
                .with_data(data));
            }
        }

        let shelter = match self
            .ctx
            .store
            .insert_shelter(NewShelter::empty(name, location, costs))
        {
            Ok(shelter) => shelter,
            Err(e) => {
                warn!(error = %e, "shelter insert failed");
                return Ok(ToolResult::error(call, format!("Failed to create shelter: {e}")));
            }
        };

        if let Err(e) = self.ctx.onboard_shelter(&shelter).await {
            warn!(shelter_id = %shelter.id, error = %e, "shelter stored but agent onboarding failed");
            return Ok(ToolResult::error(
                call,
                format!("Failed to create shelter: {e}"),
            )
            .with_data(json!({ "shelter_id": shelter.id })));
        }

        Ok(ToolResult::ok(
            call,
            format!(
                "Successfully created shelter {}. A dedicated agent has been initialized for this shelter.",
                shelter.id
            ),
        )
        .with_data(json!({ "shelter_id": shelter.id })))
    }
}

#[async_trait]
impl ToolExecutor for IntakeTools {
    fn tools(&self) -> Vec<Tool> {
        vec![Tool {
            name: "create_shelter".into(),
            description: "Create a new shelter record with the collected information and initialize its agent.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "location": { "type": "string", "description": "City and state or province" },
                    "operational_costs": { "type": "string", "description": "Monthly operational costs" },
                    "confirmed_new": {
                        "type": "boolean",
                        "description": "Set once the user confirmed this is not one of the similar shelters"
                    }
                },
                "required": ["name", "location", "operational_costs"]
            }),
        }]
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match call.tool_name.as_str() {
            "create_shelter" => self.create_shelter(call).await,
            other => Err(HavenError::ToolNotFound(other.to_string())),
        }
    }
}
