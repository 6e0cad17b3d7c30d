use std::sync::Arc;

use haven_agents::{AgentContext, AgentManager, announce};
use haven_chain::{ChainClient, ConfiguredWallets, RpcClient};
use haven_config::HavenConfig;
use haven_core::{HavenError, Result};
use haven_llm::{AnthropicProvider, ModelRouter, OpenAiProvider};
use haven_store::Store;
use tracing::{info, warn};

/// Register a provider for every configured API key.
pub(super) fn build_router(config: &HavenConfig) -> ModelRouter {
    let mut router = ModelRouter::new();
    if let Some(key) = config.api_key_for("anthropic") {
        router.add_provider(Arc::new(AnthropicProvider::new(key.to_string())));
    }
    if let Some(key) = config.api_key_for("openai") {
        let mut provider = OpenAiProvider::new(key.to_string());
        if let Some(url) = config.services.openai_base_url.clone() {
            provider = provider.with_base_url(url);
        }
        router.add_provider(Arc::new(provider));
    }
    router
}

/// Open the store, creating its directory when needed.
pub(super) fn open_store(config: &HavenConfig) -> Result<Store> {
    let path = &config.storage.db_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Store::open(path)
}

pub(super) async fn cmd_start(config: HavenConfig) -> Result<()> {
    println!("🐾 Haven v{}", env!("CARGO_PKG_VERSION"));
    println!("   Model: {}", config.agent.model);
    println!("   Listen: {}", config.server.listen);
    println!();

    let missing = config.missing_agent_settings();
    if !missing.is_empty() {
        eprintln!("⚠️  Agents cannot start. Set the following before running `haven start`:");
        for name in &missing {
            eprintln!("   {name}");
        }
        return Err(HavenError::MissingConfig { missing });
    }

    let router = build_router(&config);
    let store = open_store(&config)?;

    let rpc_url = config.chain.rpc_url.clone().unwrap_or_default();
    let chain: Arc<dyn ChainClient> = Arc::new(RpcClient::new(rpc_url));
    let wallets = Arc::new(ConfiguredWallets::new(
        config.chain.network_id.clone().unwrap_or_default(),
        config.chain.shelter_wallets.clone(),
        config.chain.contract_address.clone(),
    ));
    if config.chain.contract_address.is_none() && config.chain.shelter_wallets.is_empty() {
        warn!("no contract address or shelter wallets configured, shelter agents will fail to initialize");
    }
    let announcer = announce::from_config(&config.announcements);
    info!(announcer = announcer.name(), "announcements configured");

    let ctx = AgentContext::new(config, router, store, chain, wallets, announcer);
    let manager = Arc::new(AgentManager::new(ctx));

    manager.initialize().await?;
    println!("   Shelter agents: {}", manager.registry().len());
    println!();

    haven_server::start_server(manager).await
}
