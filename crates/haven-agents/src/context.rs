use std::collections::HashMap;
use std::sync::Arc;

use haven_chain::{ChainClient, WalletProvider};
use haven_config::HavenConfig;
use haven_core::{Result, Shelter};
use haven_llm::ModelRouter;
use haven_store::Store;
use parking_lot::Mutex;
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};

use crate::announce::Announcer;
use crate::registry::AgentRegistry;
use crate::shelter::{ShelterAgent, fingerprint};
use crate::threads::ThreadMemory;

/// Everything an agent needs from the outside world, shared by all agents.
#[derive(Clone)]
pub struct AgentContext {
    pub config: Arc<HavenConfig>,
    pub router: Arc<ModelRouter>,
    pub store: Store,
    pub chain: Arc<dyn ChainClient>,
    pub wallets: Arc<dyn WalletProvider>,
    pub announcer: Arc<dyn Announcer>,
    pub registry: Arc<AgentRegistry>,
    pub threads: Arc<ThreadMemory>,
    onboard_locks: Arc<Mutex<HashMap<String, Arc<TokioMutex<()>>>>>,
}

impl AgentContext {
    pub fn new(
        config: HavenConfig,
        router: ModelRouter,
        store: Store,
        chain: Arc<dyn ChainClient>,
        wallets: Arc<dyn WalletProvider>,
        announcer: Arc<dyn Announcer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            threads: Arc::new(ThreadMemory::new(store.clone())),
            store,
            chain,
            wallets,
            announcer,
            registry: Arc::new(AgentRegistry::new()),
            onboard_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build and register the agent for `shelter`, unless an agent built from
    /// identical data is already registered.
    ///
    /// Onboarding the same shelter concurrently builds it once; changed data
    /// rebuilds the agent and replaces the registration.
    pub async fn onboard_shelter(&self, shelter: &Shelter) -> Result<Arc<ShelterAgent>> {
        let lock = Arc::clone(
            self.onboard_locks
                .lock()
                .entry(shelter.id.clone())
                .or_insert_with(|| Arc::new(TokioMutex::new(()))),
        );
        let _guard = lock.lock().await;

        let print = fingerprint(shelter)?;
        if let Some(existing) = self.registry.get(&shelter.id)
            && existing.fingerprint() == print
        {
            return Ok(existing);
        }

        let agent = ShelterAgent::initialize(self, shelter).await?;
        info!(shelter_id = %shelter.id, name = %shelter.name, "shelter agent onboarded");

        if self.config.agent.announce_on_onboard
            && let Err(e) = agent.announce_once(&self.store, self.announcer.as_ref()).await
        {
            warn!(shelter_id = %shelter.id, error = %e, "onboarding announcement failed");
        }
        Ok(agent)
    }
}
