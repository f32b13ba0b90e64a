//! Portfolio data providers
//!
//! Stateless API-key providers. Unlike Twitter or the CDP wallet they hold
//! no per-agent session, so they are built per request and never cached.

pub mod moralis;

pub use moralis::MoralisProvider;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// Skill category served by portfolio providers
pub const CATEGORY: &str = "portfolio";

/// Which chain family a portfolio query targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chain {
    /// EVM chain by provider name (`eth`, `base`, `polygon`, ...)
    Evm(String),
    /// Solana cluster (`mainnet`, `devnet`)
    Solana(String),
}

impl Chain {
    /// Map an EVM chain id to the provider's chain name, defaulting to `eth`
    pub fn evm_from_id(chain_id: u64) -> Self {
        let name = match chain_id {
            1 => "eth",
            56 => "bsc",
            137 => "polygon",
            42161 => "arbitrum",
            10 => "optimism",
            43114 => "avalanche",
            250 => "fantom",
            8453 => "base",
            _ => "eth",
        };
        Chain::Evm(name.to_string())
    }

    pub fn solana(network: Option<&str>) -> Self {
        Chain::Solana(network.unwrap_or("mainnet").to_string())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Evm(name) => write!(f, "evm:{}", name),
            Chain::Solana(network) => write!(f, "solana:{}", network),
        }
    }
}

/// Transaction history page request
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub limit: u32,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait PortfolioProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Token balances with prices
    async fn fetch_balances(&self, address: &str, chain: &Chain) -> Result<Value>;

    /// NFT holdings
    async fn fetch_nft_data(&self, address: &str, chain: &Chain) -> Result<Value>;

    /// Wallet transaction history
    async fn fetch_tx_history(
        &self,
        address: &str,
        chain: &Chain,
        query: &HistoryQuery,
    ) -> Result<Value>;
}
