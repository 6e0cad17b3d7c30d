//! # haven-llm
//!
//! Abstraction layer over LLM providers. Agents talk to a [`ModelRouter`],
//! which resolves `provider/model` identifiers to a registered provider.

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, LlmRequest, LlmResponse, StopReason, Usage};
pub use router::ModelRouter;
