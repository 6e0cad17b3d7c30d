//! # haven-cli
//!
//! Command-line interface for Haven.
//!
//! ## Commands
//!
//! - `haven start`: initialize agents and serve the HTTP API
//! - `haven config`: show the effective configuration
//! - `haven doctor`: check configuration, storage and the chain endpoint
//! - `haven shelters list | delete <id>`: administer stored shelters

pub mod commands;

pub use commands::Cli;
