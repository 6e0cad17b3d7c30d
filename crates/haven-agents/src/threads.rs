use std::collections::HashMap;
use std::sync::Arc;

use haven_core::{Message, Result};
use haven_store::Store;
use parking_lot::RwLock;
use tokio::sync::Mutex as TokioMutex;

/// Persisted conversation threads plus one run lock per thread.
pub struct ThreadMemory {
    store: Store,
    run_locks: RwLock<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl ThreadMemory {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            run_locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.store.load_thread(thread_id)
    }

    pub fn save(&self, thread_id: &str, messages: &[Message]) -> Result<()> {
        self.store.save_thread(thread_id, messages)
    }

    /// Lock serializing agent runs on a thread, so two concurrent turns
    /// cannot interleave their histories.
    pub fn run_lock(&self, thread_id: &str) -> Arc<TokioMutex<()>> {
        if let Some(lock) = self.run_locks.read().get(thread_id) {
            return Arc::clone(lock);
        }
        let mut locks = self.run_locks.write();
        Arc::clone(
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(TokioMutex::new(()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lock_is_shared_per_thread() {
        let memory = ThreadMemory::new(Store::open_in_memory().unwrap());
        let a = memory.run_lock("shelter-1");
        let b = memory.run_lock("shelter-1");
        let c = memory.run_lock("shelter-2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
