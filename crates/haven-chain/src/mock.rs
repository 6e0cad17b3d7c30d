//! In-memory [`ChainClient`] for tests.

use async_trait::async_trait;
use haven_core::{HavenError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::client::{ChainClient, ShelterApproval};

/// A chain whose state is set up front. Addresses are compared case-insensitively.
#[derive(Default)]
pub struct MockChain {
    balances: HashMap<String, u128>,
    tx_counts: HashMap<String, u64>,
    approvals: HashMap<String, ShelterApproval>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, address: &str, wei: u128) -> Self {
        self.balances.insert(address.to_lowercase(), wei);
        self
    }

    pub fn with_tx_count(mut self, address: &str, count: u64) -> Self {
        self.tx_counts.insert(address.to_lowercase(), count);
        self
    }

    pub fn with_approval(mut self, shelter: &str, approval: ShelterApproval) -> Self {
        self.approvals.insert(shelter.to_lowercase(), approval);
        self
    }

    /// Every read touching this address fails.
    pub fn failing(mut self, address: &str) -> Self {
        self.failing.insert(address.to_lowercase());
        self
    }

    /// Method names invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn check(&self, method: &str, address: &str) -> Result<String> {
        self.calls.lock().push(method.to_string());
        let key = address.to_lowercase();
        if self.failing.contains(&key) {
            return Err(HavenError::Chain(format!("{method}: execution reverted")));
        }
        Ok(key)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn balance(&self, address: &str) -> Result<u128> {
        let key = self.check("eth_getBalance", address)?;
        Ok(self.balances.get(&key).copied().unwrap_or(0))
    }

    async fn transaction_count(&self, address: &str) -> Result<u64> {
        let key = self.check("eth_getTransactionCount", address)?;
        Ok(self.tx_counts.get(&key).copied().unwrap_or(0))
    }

    async fn approved_shelter(&self, contract: &str, shelter: &str) -> Result<ShelterApproval> {
        self.check("eth_call", contract)?;
        let key = self.check("eth_call", shelter)?;
        Ok(self.approvals.get(&key).copied().unwrap_or(ShelterApproval {
            is_approved: false,
            monthly_allowance: 0,
            last_distribution_time: 0,
        }))
    }
}
