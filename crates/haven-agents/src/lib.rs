//! # haven-agents
//!
//! The conversational side of Haven: a tool-calling agent loop and the three
//! roles built on it.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────┐
//!   /api/adopt ─▶ │  Coordinator   │ ── query_shelters / match_pets ──┐
//!                 └────────────────┘                                  │
//!                                                                     ▼
//!                 ┌────────────────┐   register    ┌────────────────────────┐
//!  /api/intake ─▶ │  Intake agent  │ ─────────────▶│     AgentRegistry      │
//!                 └────────────────┘ create_shelter│ shelter id → agent     │
//!                                                  └────────────────────────┘
//!                 ┌────────────────┐                          │
//!   /api/chat  ─▶ │ Shelter agents │ ◀────────────────────────┘
//!                 └────────────────┘  thread memory in the store
//! ```
//!
//! [`AgentManager`] owns the whole graph and is handed to request handlers.
//! Agent output is produced as [`AgentEvent`]s over an `mpsc` channel and
//! turned into plain text by [`relay`].

pub mod agent;
pub mod announce;
pub mod context;
pub mod coordinator;
pub mod intake;
pub mod manager;
pub mod matching;
pub mod preferences;
pub mod prompt;
pub mod registry;
pub mod relay;
pub mod shelter;
pub mod threads;

pub use agent::{Agent, AgentEvent};
pub use announce::{Announcer, LogAnnouncer, MemoryAnnouncer, WebhookAnnouncer};
pub use context::AgentContext;
pub use coordinator::{
    CoordinatorAgent, ShelterStats, StatsSummary, find_matches, match_pets, query_shelters,
};
pub use intake::IntakeAgent;
pub use manager::AgentManager;
pub use matching::{Candidate, NO_MATCH_MESSAGE, RankedMatch, ShelterReply};
pub use preferences::{AdopterPreferences, Completeness};
pub use registry::AgentRegistry;
pub use relay::{RelayPolicy, relay};
pub use shelter::ShelterAgent;
pub use threads::ThreadMemory;
