//! # haven-store
//!
//! Persistent storage for Haven:
//!
//! - **Shelters**: name, location, costs, metrics and the animal roster.
//! - **Donors**: one row per donation submission.
//! - **Announcements**: the once-only onboarding announcement flag per shelter.
//! - **Threads**: conversation history for thread-keyed agents.

pub mod store;

pub use store::Store;
