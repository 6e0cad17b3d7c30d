use async_trait::async_trait;
use haven_core::{HavenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::abi;

/// One entry of the contract's `approvedShelters` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterApproval {
    pub is_approved: bool,
    pub monthly_allowance: u128,
    pub last_distribution_time: u128,
}

/// Read-only chain operations used by Haven.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of an address, in wei.
    async fn balance(&self, address: &str) -> Result<u128>;

    /// Number of transactions sent from an address.
    async fn transaction_count(&self, address: &str) -> Result<u64>;

    /// Read `approvedShelters(shelter)` on the donation contract.
    async fn approved_shelter(&self, contract: &str, shelter: &str) -> Result<ShelterApproval>;
}

/// Ethereum JSON-RPC client over HTTP.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a single JSON-RPC call and return its `result`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "json-rpc call");

        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .send()
            .await
            .map_err(|e| HavenError::Chain(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(HavenError::Chain(format!("{method}: HTTP {}", resp.status())));
        }

        let body: RpcResponse = resp
            .json()
            .await
            .map_err(|e| HavenError::Chain(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(HavenError::Chain(format!(
                "{method}: {} (code {})",
                err.message, err.code
            )));
        }
        body.result
            .ok_or_else(|| HavenError::Chain(format!("{method}: response has no result")))
    }

    async fn call_str(&self, method: &str, params: Value) -> Result<String> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(HavenError::Chain(format!("{method}: unexpected result {other}"))),
        }
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn balance(&self, address: &str) -> Result<u128> {
        let hex = self.call_str("eth_getBalance", json!([address, "latest"])).await?;
        abi::parse_quantity(&hex)
    }

    async fn transaction_count(&self, address: &str) -> Result<u64> {
        let hex = self
            .call_str("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        u64::try_from(abi::parse_quantity(&hex)?)
            .map_err(|_| HavenError::Chain("transaction count overflows u64".into()))
    }

    async fn approved_shelter(&self, contract: &str, shelter: &str) -> Result<ShelterApproval> {
        let data = abi::encode_approved_shelters(shelter)?;
        let ret = self
            .call_str("eth_call", json!([{ "to": contract, "data": data }, "latest"]))
            .await?;
        let bytes = abi::decode_hex(&ret)?;
        let words = abi::words(&bytes)?;
        let [approved, allowance, last, ..] = words.as_slice() else {
            return Err(HavenError::Chain(format!(
                "approvedShelters returned {} words, expected 3",
                words.len()
            )));
        };
        Ok(ShelterApproval {
            is_approved: abi::word_to_bool(approved),
            monthly_allowance: abi::word_to_u128(allowance)?,
            last_distribution_time: abi::word_to_u128(last)?,
        })
    }
}
