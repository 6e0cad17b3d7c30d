//! # haven-core
//!
//! Core types, traits, and primitives for Haven. This crate defines the shared
//! vocabulary (shelters, animals, donors, conversation messages, tools) used by
//! every other crate in the workspace.

pub mod error;
pub mod message;
pub mod shelter;
pub mod tool;

pub use error::{HavenError, Result};
pub use message::{Message, MessageContent, Role};
pub use shelter::*;
pub use tool::{Tool, ToolCall, ToolExecutor, ToolResult};
