use async_trait::async_trait;
use haven_core::{HavenError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The wallet a shelter agent advertises for donations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletContext {
    pub shelter_id: String,
    pub address: String,
    pub network_id: String,
}

/// Supplies a wallet context for each shelter agent.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn wallet_for(&self, shelter_id: &str) -> Result<WalletContext>;
}

/// Wallets taken from configuration: a per-shelter map with an optional
/// fallback (usually the donation contract itself).
#[derive(Debug, Clone)]
pub struct ConfiguredWallets {
    network_id: String,
    wallets: HashMap<String, String>,
    fallback: Option<String>,
}

impl ConfiguredWallets {
    pub fn new(
        network_id: impl Into<String>,
        wallets: HashMap<String, String>,
        fallback: Option<String>,
    ) -> Self {
        Self {
            network_id: network_id.into(),
            wallets,
            fallback,
        }
    }
}

#[async_trait]
impl WalletProvider for ConfiguredWallets {
    async fn wallet_for(&self, shelter_id: &str) -> Result<WalletContext> {
        let address = self
            .wallets
            .get(shelter_id)
            .or(self.fallback.as_ref())
            .ok_or_else(|| {
                HavenError::Chain(format!("no wallet configured for shelter {shelter_id}"))
            })?;
        crate::abi::parse_address(address)?;
        Ok(WalletContext {
            shelter_id: shelter_id.to_string(),
            address: address.clone(),
            network_id: self.network_id.clone(),
        })
    }
}
