//! Per-shelter conversational agents.

use std::sync::Arc;

use async_trait::async_trait;
use haven_chain::{ChainClient, WalletContext, format_ether};
use haven_core::{HavenError, Message, Result, Role, Shelter, Tool, ToolCall, ToolExecutor, ToolResult};
use haven_store::Store;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agent::{Agent, AgentEvent};
use crate::announce::Announcer;
use crate::context::AgentContext;
use crate::prompt;
use crate::threads::ThreadMemory;

/// Conversation thread used for chats with a shelter's agent.
pub fn thread_id(shelter_id: &str) -> String {
    format!("shelter-{shelter_id}")
}

/// BLAKE3 digest of the shelter data an agent's prompt was built from.
pub fn fingerprint(shelter: &Shelter) -> Result<String> {
    let bytes = serde_json::to_vec(shelter)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// The agent speaking for one shelter.
pub struct ShelterAgent {
    shelter_id: String,
    name: String,
    fingerprint: String,
    wallet: WalletContext,
    agent: Arc<Agent>,
    threads: Arc<ThreadMemory>,
}

impl ShelterAgent {
    /// Build the agent for `shelter` and register it.
    ///
    /// Configuration is checked before anything touches the network.
    pub async fn initialize(ctx: &AgentContext, shelter: &Shelter) -> Result<Arc<Self>> {
        let missing = ctx.config.missing_agent_settings();
        if !missing.is_empty() {
            return Err(HavenError::MissingConfig { missing });
        }

        let wallet = ctx.wallets.wallet_for(&shelter.id).await?;
        let system_prompt = prompt::shelter_prompt(shelter, &wallet);
        let tools = ShelterTools {
            shelter_name: shelter.name.clone(),
            wallet: wallet.clone(),
            chain: Arc::clone(&ctx.chain),
            announcer: Arc::clone(&ctx.announcer),
        };
        let agent = Agent::new(
            format!("shelter:{}", shelter.id),
            system_prompt,
            Arc::clone(&ctx.router),
            Arc::new(tools),
            ctx.config.agent.clone(),
        );

        let handle = Arc::new(Self {
            shelter_id: shelter.id.clone(),
            name: shelter.name.clone(),
            fingerprint: fingerprint(shelter)?,
            wallet,
            agent: Arc::new(agent),
            threads: Arc::clone(&ctx.threads),
        });
        let replaced = ctx.registry.register(shelter.id.clone(), Arc::clone(&handle));
        info!(shelter_id = %shelter.id, animals = shelter.animals.len(), replaced, "shelter agent ready");
        Ok(handle)
    }

    pub fn id(&self) -> &str {
        &self.shelter_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn wallet(&self) -> &WalletContext {
        &self.wallet
    }

    pub fn system_prompt(&self) -> &str {
        self.agent.system_prompt()
    }

    /// Stream a reply within the shelter's persisted thread.
    pub fn converse(&self, message: impl Into<String>) -> mpsc::Receiver<AgentEvent> {
        self.agent.stream_thread(
            Arc::clone(&self.threads),
            thread_id(&self.shelter_id),
            message.into(),
        )
    }

    /// One-off question with no memory, as used by the coordinator.
    pub async fn ask(&self, question: &str) -> Result<String> {
        self.agent
            .ask(vec![Message::text(Role::User, question)])
            .await
    }

    /// Post the shelter's first announcement, at most once per shelter.
    ///
    /// Returns `Ok(false)` when it was already announced. A failed post
    /// releases the flag so a later onboarding can try again.
    pub async fn announce_once(&self, store: &Store, announcer: &dyn Announcer) -> Result<bool> {
        if !store.try_mark_announced(&self.shelter_id)? {
            return Ok(false);
        }
        let posted = async {
            let text = self.ask(prompt::ANNOUNCEMENT_REQUEST).await?;
            announcer.post(&self.name, text.trim()).await
        }
        .await;

        match posted {
            Ok(()) => Ok(true),
            Err(e) => {
                store.clear_announced(&self.shelter_id)?;
                Err(e)
            }
        }
    }
}

/// Tools every shelter agent carries.
struct ShelterTools {
    shelter_name: String,
    wallet: WalletContext,
    chain: Arc<dyn ChainClient>,
    announcer: Arc<dyn Announcer>,
}

#[async_trait]
impl ToolExecutor for ShelterTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "get_wallet_details".into(),
                description: "Get the shelter's donation wallet address, network and current balance.".into(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            Tool {
                name: "post_announcement".into(),
                description: "Post a short public announcement on behalf of the shelter.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string", "description": "The announcement, under 280 characters" }
                    },
                    "required": ["text"]
                }),
            },
        ]
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match call.tool_name.as_str() {
            "get_wallet_details" => {
                let balance = match self.chain.balance(&self.wallet.address).await {
                    Ok(wei) => Some(format_ether(wei)),
                    Err(e) => {
                        warn!(address = %self.wallet.address, error = %e, "wallet balance unavailable");
                        None
                    }
                };
                let details = json!({
                    "address": self.wallet.address,
                    "networkId": self.wallet.network_id,
                    "balance": balance,
                });
                Ok(ToolResult::ok(call, details.to_string()).with_data(details))
            }
            "post_announcement" => {
                let Some(text) = call.arguments["text"].as_str().filter(|t| !t.trim().is_empty())
                else {
                    return Ok(ToolResult::error(call, "text is required"));
                };
                self.announcer.post(&self.shelter_name, text.trim()).await?;
                Ok(ToolResult::ok(call, "Announcement posted."))
            }
            other => Err(HavenError::ToolNotFound(other.to_string())),
        }
    }
}
