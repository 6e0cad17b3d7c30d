//! # haven-config
//!
//! Configuration for Haven. Reads `haven.toml`, then applies environment
//! variable overrides. CLI flags are layered on top by `haven-cli`.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::HavenConfig;
pub use schema::{
    AgentConfig, AnnouncementsConfig, ChainConfig, ConfigWarning, LoggingConfig, ServerConfig,
    ServicesConfig, StorageConfig, WarningSeverity,
};
