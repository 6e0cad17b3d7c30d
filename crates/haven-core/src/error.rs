use thiserror::Error;

/// Unified error type for Haven.
#[derive(Error, Debug)]
pub enum HavenError {
    // ── Agent errors ───────────────────────────────────────────
    #[error("agent error: {0}")]
    Agent(String),

    // ── LLM errors ─────────────────────────────────────────────
    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    // ── Storage errors ─────────────────────────────────────────
    #[error("store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),

    // ── Chain errors ───────────────────────────────────────────
    #[error("chain rpc error: {0}")]
    Chain(String),

    // ── Validation ─────────────────────────────────────────────
    #[error("{0}")]
    Validation(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("missing required configuration: {}", .missing.join(", "))]
    MissingConfig { missing: Vec<String> },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HavenError>;
