use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::HavenConfig;

/// Loads the Haven configuration from disk and the environment.
pub struct ConfigLoader {
    config: HavenConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > HAVEN_CONFIG env > ~/.haven/haven.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("HAVEN_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".haven")
            .join("haven.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> haven_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::parse(&std::fs::read_to_string(&config_path)?, &config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            HavenConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => return Err(haven_core::HavenError::Config(e)),
        }

        Ok(Self { config, config_path })
    }

    fn parse(raw: &str, path: &Path) -> haven_core::Result<HavenConfig> {
        toml::from_str::<HavenConfig>(raw).map_err(|e| {
            haven_core::HavenError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Get a snapshot of the loaded config.
    pub fn get(&self) -> HavenConfig {
        self.config.clone()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (HAVEN_AGENT_MODEL, NETWORK_ID, etc.)
    pub fn apply_env_overrides(mut config: HavenConfig) -> HavenConfig {
        if let Ok(v) = std::env::var("HAVEN_AGENT_MODEL") {
            config.agent.model = v;
        }
        if let Ok(v) = std::env::var("HAVEN_SERVER_LISTEN") {
            config.server.listen = v;
        }
        if let Ok(v) = std::env::var("HAVEN_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("HAVEN_DB_PATH") {
            config.storage.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NETWORK_ID") {
            config.chain.network_id = Some(v);
        }
        if let Ok(v) = std::env::var("HAVEN_RPC_URL") {
            config.chain.rpc_url = Some(v);
        }
        // Credentials: config file takes priority, env is the fallback.
        if config.services.anthropic_api_key.is_none()
            && let Ok(v) = std::env::var("ANTHROPIC_API_KEY")
        {
            config.services.anthropic_api_key = Some(v);
        }
        if config.services.openai_api_key.is_none()
            && let Ok(v) = std::env::var("OPENAI_API_KEY")
        {
            config.services.openai_api_key = Some(v);
        }
        config
    }
}
