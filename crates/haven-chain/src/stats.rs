use haven_core::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::ChainClient;
use crate::units::format_ether;

/// Aggregate donation figures reported by `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationStats {
    /// Contract balance in ether, as a decimal string.
    pub balance: String,
    /// Known shelter addresses whose approval entry could be read.
    pub shelter_count: u32,
    /// Transactions recorded against the contract address.
    pub donation_count: u64,
}

/// Collect donation statistics for the contract.
///
/// The balance read is the only hard failure. A failed transaction count
/// reports 0 and a failed per-shelter read is logged and skipped.
pub async fn donation_stats(
    chain: &dyn ChainClient,
    contract: &str,
    known_shelters: &[String],
) -> Result<DonationStats> {
    let balance = chain.balance(contract).await?;

    let donation_count = match chain.transaction_count(contract).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "failed to read transaction count, reporting 0");
            0
        }
    };

    let mut shelter_count = 0;
    for address in known_shelters {
        match chain.approved_shelter(contract, address).await {
            Ok(approval) => {
                shelter_count += 1;
                if approval.monthly_allowance > 0 {
                    info!(%address, allowance = approval.monthly_allowance, "active shelter");
                }
            }
            Err(e) => warn!(%address, error = %e, "failed to read shelter approval"),
        }
    }

    let stats = DonationStats {
        balance: format_ether(balance),
        shelter_count,
        donation_count,
    };
    info!(?stats, "donation stats collected");
    Ok(stats)
}
