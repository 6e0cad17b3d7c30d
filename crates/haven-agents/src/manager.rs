use std::sync::Arc;

use haven_core::{Result, Shelter};
use tokio::sync::OnceCell;
use tracing::info;

use crate::context::AgentContext;
use crate::coordinator::CoordinatorAgent;
use crate::intake::IntakeAgent;
use crate::registry::AgentRegistry;
use crate::shelter::ShelterAgent;

struct Agents {
    coordinator: Arc<CoordinatorAgent>,
    intake: Arc<IntakeAgent>,
}

/// Owns the agent graph for the lifetime of the application.
///
/// Initialization is lazy and shared: concurrent callers wait on a single
/// in-flight run. If it fails, the manager stays uninitialized and the next
/// caller tries again.
pub struct AgentManager {
    ctx: AgentContext,
    agents: OnceCell<Agents>,
}

impl AgentManager {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            agents: OnceCell::new(),
        }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.ctx.registry
    }

    pub fn is_initialized(&self) -> bool {
        self.agents.initialized()
    }

    /// Build the coordinator, the intake agent and one agent per stored shelter.
    pub async fn initialize(&self) -> Result<()> {
        self.agents().await.map(|_| ())
    }

    async fn agents(&self) -> Result<&Agents> {
        self.agents.get_or_try_init(|| self.build()).await
    }

    async fn build(&self) -> Result<Agents> {
        info!("initializing agents");
        let coordinator = Arc::new(CoordinatorAgent::new(&self.ctx));
        let intake = Arc::new(IntakeAgent::new(&self.ctx));

        let shelters = self.ctx.store.list_shelters()?;
        for shelter in &shelters {
            self.ctx.onboard_shelter(shelter).await?;
        }
        info!(shelters = shelters.len(), registered = self.ctx.registry.len(), "agents initialized");

        Ok(Agents { coordinator, intake })
    }

    pub async fn coordinator(&self) -> Result<Arc<CoordinatorAgent>> {
        Ok(Arc::clone(&self.agents().await?.coordinator))
    }

    pub async fn intake(&self) -> Result<Arc<IntakeAgent>> {
        Ok(Arc::clone(&self.agents().await?.intake))
    }

    /// The agent for a shelter, or `None` when no such shelter exists.
    ///
    /// The stored record is authoritative: a shelter without an agent is
    /// onboarded, changed data rebuilds the agent, and the agent of a deleted
    /// shelter is dropped.
    pub async fn shelter_agent(&self, shelter_id: &str) -> Result<Option<Arc<ShelterAgent>>> {
        self.initialize().await?;
        match self.ctx.store.get_shelter(shelter_id)? {
            Some(shelter) => self.ctx.onboard_shelter(&shelter).await.map(Some),
            None => {
                if self.ctx.registry.remove(shelter_id) {
                    info!(%shelter_id, "shelter no longer stored, agent dropped");
                }
                Ok(None)
            }
        }
    }

    /// Onboard a shelter, reusing the registered agent when its data is unchanged.
    pub async fn initialize_shelter_agent(&self, shelter: &Shelter) -> Result<Arc<ShelterAgent>> {
        self.ctx.onboard_shelter(shelter).await
    }
}
