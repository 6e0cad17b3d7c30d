use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration, read from `haven.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HavenConfig {
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub chain: ChainConfig,
    pub announcements: AnnouncementsConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier in "provider/model" form, e.g. "anthropic/claude-3-5-sonnet-latest".
    pub model: String,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum model round-trips per turn before the agent gives up on tools.
    pub max_iterations: u32,
    /// Pause between streamed chunks, in milliseconds. Presentational only.
    pub stream_delay_ms: u64,
    /// Post a single announcement when a shelter agent is first onboarded.
    pub announce_on_onboard: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3-5-sonnet-latest".into(),
            max_tokens: 4096,
            temperature: 0.7,
            max_iterations: 8,
            stream_delay_ms: 200,
            announce_on_onboard: false,
        }
    }
}

impl AgentConfig {
    /// Provider prefix of the configured model ("anthropic" for "anthropic/claude-...").
    pub fn provider(&self) -> &str {
        self.model.split_once('/').map(|(p, _)| p).unwrap_or("anthropic")
    }
}

// ── Server ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address.
    pub listen: String,
    /// Optional bearer key required on `/api/*`.
    pub api_key: Option<String>,
    /// Enable permissive CORS (for local front-end development).
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".into(),
            api_key: None,
            cors: false,
        }
    }
}

// ── Storage ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("haven.db"),
        }
    }
}

// ── Chain ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint. Also settable via HAVEN_RPC_URL.
    pub rpc_url: Option<String>,
    /// Network identifier, e.g. "base-sepolia". Also settable via NETWORK_ID.
    pub network_id: Option<String>,
    /// Address of the donation contract.
    pub contract_address: Option<String>,
    /// Shelter wallet addresses checked by the stats endpoint.
    pub known_shelters: Vec<String>,
    /// Wallet address per shelter id, used by shelter agents.
    pub shelter_wallets: HashMap<String, String>,
}

// ── Announcements ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementsConfig {
    /// Webhook receiving `{"text": ...}` posts. When unset, announcements are only logged.
    pub webhook_url: Option<String>,
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Services ───────────────────────────────────────────────────

/// External service API keys and configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Anthropic API key. Falls back to ANTHROPIC_API_KEY.
    pub anthropic_api_key: Option<String>,
    /// OpenAI API key. Falls back to OPENAI_API_KEY.
    pub openai_api_key: Option<String>,
    /// Base URL for an OpenAI-compatible endpoint (defaults to api.openai.com).
    pub openai_base_url: Option<String>,
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().is_none_or(|s| s.trim().is_empty())
}

impl HavenConfig {
    /// API key for an LLM provider prefix, if configured.
    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        let key = match provider {
            "anthropic" => &self.services.anthropic_api_key,
            "openai" => &self.services.openai_api_key,
            _ => return None,
        };
        key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Names of the settings a shelter agent needs but which are unset.
    ///
    /// Empty when the agent layer can be initialized.
    pub fn missing_agent_settings(&self) -> Vec<String> {
        let mut missing = Vec::new();
        match self.agent.provider() {
            "anthropic" if self.api_key_for("anthropic").is_none() => {
                missing.push("ANTHROPIC_API_KEY".to_string())
            }
            "openai" if self.api_key_for("openai").is_none() => {
                missing.push("OPENAI_API_KEY".to_string())
            }
            _ => {}
        }
        if is_blank(&self.chain.network_id) {
            missing.push("NETWORK_ID".to_string());
        }
        if is_blank(&self.chain.rpc_url) {
            missing.push("HAVEN_RPC_URL".to_string());
        }
        missing
    }

    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Agent model ───
        let model = &self.agent.model;
        if model.is_empty() {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: "model is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'anthropic/claude-3-5-sonnet-latest' or 'openai/gpt-4o'".into()),
            });
        } else if !model.contains('/') {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: format!("model '{}' should be in 'provider/model' format", model),
                severity: WarningSeverity::Warning,
                hint: Some("Use 'anthropic/claude-3-5-sonnet-latest' or 'openai/gpt-4o'".into()),
            });
        }

        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            warnings.push(ConfigWarning {
                field: "agent.temperature".into(),
                message: format!("temperature {} is out of range", self.agent.temperature),
                severity: WarningSeverity::Error,
                hint: Some("Temperature must be between 0.0 and 2.0".into()),
            });
        }

        if self.agent.max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_tokens".into(),
                message: "max_tokens is 0, agents won't produce output".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 4096".into()),
            });
        }

        if self.agent.max_iterations == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_iterations".into(),
                message: "max_iterations is 0".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 8".into()),
            });
        }

        if self.agent.stream_delay_ms > 5_000 {
            warnings.push(ConfigWarning {
                field: "agent.stream_delay_ms".into(),
                message: format!("{}ms between chunks will feel unresponsive", self.agent.stream_delay_ms),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        // ── Server ───
        if self.server.listen.is_empty() {
            warnings.push(ConfigWarning {
                field: "server.listen".into(),
                message: "listen address is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. '127.0.0.1:3000'".into()),
            });
        } else if self.server.listen.starts_with("0.0.0.0") && self.server.api_key.is_none() {
            warnings.push(ConfigWarning {
                field: "server.api_key".into(),
                message: "no API key set while server is network-accessible".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set server.api_key to protect shelter and donor data".into()),
            });
        }

        // ── Chain ───
        if let Some(url) = self.chain.rpc_url.as_deref()
            && !url.is_empty()
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            warnings.push(ConfigWarning {
                field: "chain.rpc_url".into(),
                message: format!("'{}' is not an http(s) URL", url),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }
        for addr in self.chain.known_shelters.iter().chain(self.chain.shelter_wallets.values()) {
            if !is_address(addr) {
                warnings.push(ConfigWarning {
                    field: "chain".into(),
                    message: format!("'{}' is not a 20-byte hex address", addr),
                    severity: WarningSeverity::Warning,
                    hint: Some("Addresses look like 0x followed by 40 hex digits".into()),
                });
            }
        }
        if self.chain.known_shelters.is_empty() {
            warnings.push(ConfigWarning {
                field: "chain.known_shelters".into(),
                message: "no shelter addresses configured, stats will report zero shelters".into(),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        let missing = self.missing_agent_settings();
        if !missing.is_empty() {
            warnings.push(ConfigWarning {
                field: "agent".into(),
                message: format!("agents cannot start without: {}", missing.join(", ")),
                severity: WarningSeverity::Warning,
                hint: Some("Set the listed environment variables or the matching haven.toml keys".into()),
            });
        }

        // ── Logging ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}

fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}
