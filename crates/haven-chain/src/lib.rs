//! # haven-chain
//!
//! Read-only access to the donation contract over Ethereum JSON-RPC:
//! balances, transaction counts and the `approvedShelters` mapping. Also
//! resolves the wallet each shelter agent advertises for donations.

pub mod abi;
pub mod client;
pub mod mock;
pub mod stats;
pub mod units;
pub mod wallet;

pub use client::{ChainClient, RpcClient, ShelterApproval};
pub use mock::MockChain;
pub use stats::{DonationStats, donation_stats};
pub use units::format_ether;
pub use wallet::{ConfiguredWallets, WalletContext, WalletProvider};
