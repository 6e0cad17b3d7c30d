//! The coordinator: fans questions out to every registered shelter agent.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use haven_core::{HavenError, Message, Result, Tool, ToolCall, ToolExecutor, ToolResult};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentEvent};
use crate::context::AgentContext;
use crate::matching::{RankedMatch, ShelterReply, format_matches, rank};
use crate::preferences::AdopterPreferences;
use crate::prompt;
use crate::registry::AgentRegistry;

static ANIMAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+animals? in our care").expect("valid count pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total_animals: u64,
    /// Shelters whose reply stated an animal count.
    pub total_shelters: u32,
}

/// Output of `query_shelters`: totals plus each shelter's raw reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShelterStats {
    pub summary: StatsSummary,
    /// Shelter id to reply text, or `"Error: <msg>"` when the shelter failed.
    pub details: BTreeMap<String, String>,
}

/// Ask every shelter, one after another, for its current numbers.
///
/// Never fails as a whole: a failing shelter is recorded in `details`.
pub async fn query_shelters(registry: &AgentRegistry) -> ShelterStats {
    let mut stats = ShelterStats::default();
    for (shelter_id, agent) in registry.all() {
        match agent.ask(prompt::STATS_QUERY).await {
            Ok(reply) => {
                if let Some(count) = ANIMAL_COUNT
                    .captures(&reply)
                    .and_then(|caps| caps[1].parse::<u64>().ok())
                {
                    stats.summary.total_animals += count;
                    stats.summary.total_shelters += 1;
                } else {
                    debug!(%shelter_id, "reply did not state an animal count");
                }
                stats.details.insert(shelter_id, reply);
            }
            Err(e) => {
                warn!(%shelter_id, error = %e, "shelter query failed");
                stats.details.insert(shelter_id, format!("Error: {e}"));
            }
        }
    }
    info!(
        total_animals = stats.summary.total_animals,
        total_shelters = stats.summary.total_shelters,
        "shelter statistics collected"
    );
    stats
}

/// Collect candidates from every shelter and keep the best three.
pub async fn find_matches(
    registry: &AgentRegistry,
    preferences: &AdopterPreferences,
) -> Vec<RankedMatch> {
    let request = prompt::match_request(preferences);
    let mut pool = Vec::new();

    for (shelter_id, agent) in registry.all() {
        let reply = match agent.ask(&request).await {
            Ok(text) => ShelterReply::parse(&text),
            Err(e) => {
                warn!(%shelter_id, error = %e, "shelter match request failed");
                continue;
            }
        };
        if let ShelterReply::Unparsed(text) = &reply {
            debug!(%shelter_id, reply = %text, "no candidates in shelter reply");
        }
        let shelter_name = if agent.name().is_empty() {
            shelter_id.clone()
        } else {
            agent.name().to_string()
        };
        pool.extend(reply.candidates().iter().map(|candidate| RankedMatch {
            shelter_id: shelter_id.clone(),
            shelter_name: shelter_name.clone(),
            candidate: candidate.clone(),
        }));
    }

    debug!(candidates = pool.len(), "match pool assembled");
    rank(pool)
}

/// Match an adopter against every shelter and render the result.
pub async fn match_pets(registry: &AgentRegistry, preferences: &AdopterPreferences) -> String {
    format_matches(&find_matches(registry, preferences).await)
}

/// Turn `match_pets` tool arguments into preferences.
///
/// Accepts the structured fields, a free-text `description`, both, or a bare
/// string. Structured fields win over anything read from the text.
fn preferences_from_args(args: &Value) -> std::result::Result<AdopterPreferences, String> {
    match args {
        Value::Null => Ok(AdopterPreferences::default()),
        Value::String(text) => Ok(AdopterPreferences::from_text(text)),
        Value::Object(map) => {
            let mut fields = map.clone();
            let description = match fields.remove("description") {
                None => None,
                Some(Value::String(text)) => Some(text),
                Some(_) => return Err("description must be a string".into()),
            };
            let mut prefs: AdopterPreferences = serde_json::from_value(Value::Object(fields))
                .map_err(|e| format!("invalid preferences: {e}"))?;
            if let Some(text) = description {
                prefs.fill_from(AdopterPreferences::from_text(&text));
            }
            Ok(prefs)
        }
        other => Err(format!("invalid preferences: expected an object, got {other}")),
    }
}

struct CoordinatorTools {
    registry: Arc<AgentRegistry>,
}

#[async_trait]
impl ToolExecutor for CoordinatorTools {
    fn tools(&self) -> Vec<Tool> {
        let text = json!({ "type": "string" });
        let flag = json!({ "type": "boolean" });
        vec![
            Tool {
                name: "query_shelters".into(),
                description: "Get current statistics from every shelter: total animals and each shelter's overview.".into(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            Tool {
                name: "match_pets".into(),
                description: "Find the animals across all shelters that best fit an adopter's preferences.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "animalType": text,
                        "size": text,
                        "age": text,
                        "activityLevel": text,
                        "livingSpace": text,
                        "hasYard": flag,
                        "hasChildren": flag,
                        "hasOtherPets": flag,
                        "otherPreferences": { "type": "array", "items": text },
                        "description": {
                            "type": "string",
                            "description": "Anything else the adopter said, in their words"
                        }
                    }
                }),
            },
        ]
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match call.tool_name.as_str() {
            "query_shelters" => {
                let stats = query_shelters(&self.registry).await;
                let value = serde_json::to_value(&stats)?;
                Ok(ToolResult::ok(call, value.to_string()).with_data(value))
            }
            "match_pets" => match preferences_from_args(&call.arguments) {
                Ok(prefs) => {
                    debug!(?prefs, "matching pets");
                    Ok(ToolResult::ok(call, match_pets(&self.registry, &prefs).await))
                }
                Err(msg) => Ok(ToolResult::error(call, msg)),
            },
            other => Err(HavenError::ToolNotFound(other.to_string())),
        }
    }
}

/// Talks with adopters and uses the shelter fan-out tools.
pub struct CoordinatorAgent {
    agent: Arc<Agent>,
}

impl CoordinatorAgent {
    pub fn new(ctx: &AgentContext) -> Self {
        let tools = CoordinatorTools {
            registry: Arc::clone(&ctx.registry),
        };
        Self {
            agent: Arc::new(Agent::new(
                "coordinator",
                prompt::COORDINATOR_PROMPT,
                Arc::clone(&ctx.router),
                Arc::new(tools),
                ctx.config.agent.clone(),
            )),
        }
    }

    /// Stream a reply to a conversation supplied in full by the caller.
    pub fn respond(
        &self,
        messages: Vec<Message>,
        guidance: Option<String>,
    ) -> mpsc::Receiver<AgentEvent> {
        self.agent.stream(messages, guidance)
    }

    /// Run to completion and return the final reply.
    pub async fn invoke(&self, messages: Vec<Message>) -> Result<String> {
        self.agent.ask(messages).await
    }
}
