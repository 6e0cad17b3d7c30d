use std::sync::Arc;

use haven_core::ShelterId;
use parking_lot::RwLock;
use tracing::debug;

use crate::shelter::ShelterAgent;

/// Shelter agents keyed by shelter id, in registration order.
///
/// Holds at most one agent per id. Nothing here is persisted: the manager
/// rebuilds the registry from the store on every cold start.
#[derive(Default)]
pub struct AgentRegistry {
    entries: RwLock<Vec<(ShelterId, Arc<ShelterAgent>)>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the agent for `shelter_id`.
    ///
    /// A replaced entry keeps its original position. Returns `true` when an
    /// existing agent was replaced.
    pub fn register(&self, shelter_id: impl Into<ShelterId>, agent: Arc<ShelterAgent>) -> bool {
        let shelter_id = shelter_id.into();
        let mut entries = self.entries.write();
        if let Some(slot) = entries.iter_mut().find(|(id, _)| *id == shelter_id) {
            slot.1 = agent;
            debug!(%shelter_id, "shelter agent replaced");
            return true;
        }
        debug!(%shelter_id, "shelter agent registered");
        entries.push((shelter_id, agent));
        false
    }

    pub fn get(&self, shelter_id: &str) -> Option<Arc<ShelterAgent>> {
        self.entries
            .read()
            .iter()
            .find(|(id, _)| id == shelter_id)
            .map(|(_, agent)| Arc::clone(agent))
    }

    /// Snapshot of every registration. Later changes do not affect the
    /// returned list.
    pub fn all(&self) -> Vec<(ShelterId, Arc<ShelterAgent>)> {
        self.entries.read().clone()
    }

    pub fn remove(&self, shelter_id: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(id, _)| id != shelter_id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
