//! Wallet portfolio tools over a `PortfolioProvider`
//!
//! Chain gating (`evm` / `solana`) happens during resolution, so a tool
//! that exists here is already allowed for its chain family.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{opt_str, req_str, Tool, ToolContext, ToolMeta, ToolSchema};
use crate::error::{Result, SkillError};
use crate::providers::{Chain, HistoryQuery, PortfolioProvider};
use crate::skills::catalog::SkillDeps;

const DEFAULT_HISTORY_LIMIT: u32 = 100;
const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
    Tokens,
    Nfts,
    History,
    Solana,
}

pub struct PortfolioTool {
    meta: ToolMeta,
    ctx: ToolContext,
    provider: Arc<dyn PortfolioProvider>,
    query: Query,
}

fn evm_schema() -> ToolSchema {
    ToolSchema::new()
        .with_string_param("address", "Wallet address (0x...)", true)
        .with_int_param(
            "chain_id",
            "EVM chain id (1 Ethereum, 8453 Base, 137 Polygon, ...). Default is 1.",
            false,
        )
}

impl PortfolioTool {
    pub fn build_wallet(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        Self::build(deps, Query::Tokens, evm_schema())
    }

    pub fn build_nft(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        Self::build(deps, Query::Nfts, evm_schema())
    }

    pub fn build_history(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        let schema = evm_schema()
            .with_int_param("limit", "Transactions per page (max 100)", false)
            .with_string_param("cursor", "Pagination cursor from a previous call", false);
        Self::build(deps, Query::History, schema)
    }

    pub fn build_solana(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        let schema = ToolSchema::new()
            .with_string_param("address", "Solana wallet address", true)
            .with_enum_param("network", "Solana cluster", &["mainnet", "devnet"], false)
            .with_bool_param("include_nfts", "Also list NFT holdings", false);
        Self::build(deps, Query::Solana, schema)
    }

    fn build(deps: &SkillDeps<'_>, query: Query, schema: ToolSchema) -> Result<Arc<dyn Tool>> {
        Ok(Arc::new(Self {
            meta: deps.meta(schema),
            ctx: deps.ctx.clone(),
            provider: deps.portfolio()?,
            query,
        }))
    }
}

fn evm_chain(input: &Value) -> Result<Chain> {
    match input.get("chain_id") {
        None | Some(Value::Null) => Ok(Chain::evm_from_id(1)),
        Some(v) => v
            .as_u64()
            .map(Chain::evm_from_id)
            .ok_or_else(|| SkillError::invalid_input("chain_id must be a positive integer")),
    }
}

fn history_query(input: &Value) -> Result<HistoryQuery> {
    let limit = match input.get("limit").and_then(Value::as_i64) {
        None => DEFAULT_HISTORY_LIMIT,
        Some(n) if n >= 1 && n <= i64::from(MAX_HISTORY_LIMIT) => n as u32,
        Some(n) => {
            return Err(SkillError::invalid_input(format!(
                "limit must be between 1 and {}, got {}",
                MAX_HISTORY_LIMIT, n
            )))
        }
    };
    Ok(HistoryQuery {
        limit,
        cursor: opt_str(input, "cursor").map(str::to_string),
    })
}

#[async_trait]
impl Tool for PortfolioTool {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let address = req_str(&input, "address")?;
        // Bad input must not spend quota
        let chain = match self.query {
            Query::Solana => Chain::solana(opt_str(&input, "network")),
            _ => evm_chain(&input)?,
        };
        let history = (self.query == Query::History)
            .then(|| history_query(&input))
            .transpose()?;
        self.ctx.check_rate_limit(self.name()).await?;

        match self.query {
            Query::Tokens => {
                let tokens = self.provider.fetch_balances(address, &chain).await?;
                Ok(json!({ "address": address, "chain": chain.to_string(), "tokens": tokens }))
            }
            Query::Nfts => {
                let nfts = self.provider.fetch_nft_data(address, &chain).await?;
                Ok(json!({ "address": address, "chain": chain.to_string(), "nfts": nfts }))
            }
            Query::History => {
                let query = history.unwrap_or_default();
                let history = self.provider.fetch_tx_history(address, &chain, &query).await?;
                Ok(json!({ "address": address, "chain": chain.to_string(), "history": history }))
            }
            Query::Solana => {
                let portfolio = self.provider.fetch_balances(address, &chain).await?;
                let mut out = json!({
                    "address": address,
                    "chain": chain.to_string(),
                    "portfolio": portfolio,
                });
                if input.get("include_nfts").and_then(Value::as_bool).unwrap_or(false) {
                    out["nfts"] = self.provider.fetch_nft_data(address, &chain).await?;
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rate_limit::{RateLimitPolicy, RateLimiter};
    use crate::store::{MemorySkillStore, SkillStore};
    use crate::tools::ToolOutput;
    use chrono::{TimeZone, Utc};

    struct StaticProvider;

    #[async_trait]
    impl PortfolioProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_balances(&self, _address: &str, chain: &Chain) -> Result<Value> {
            Ok(json!([{ "symbol": "ETH", "chain": chain.to_string() }]))
        }

        async fn fetch_nft_data(&self, _address: &str, _chain: &Chain) -> Result<Value> {
            Ok(json!([]))
        }

        async fn fetch_tx_history(
            &self,
            _address: &str,
            _chain: &Chain,
            query: &HistoryQuery,
        ) -> Result<Value> {
            Ok(json!({ "limit": query.limit }))
        }
    }

    fn tool(query: Query, schema: ToolSchema) -> PortfolioTool {
        let store: Arc<dyn SkillStore> = Arc::new(MemorySkillStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
        PortfolioTool {
            meta: ToolMeta {
                name: "fetch_wallet_history",
                category: "portfolio",
                description: "history",
                schema,
            },
            ctx: ToolContext {
                agent_id: "a1".to_string(),
                store: store.clone(),
                limiter: RateLimiter::new(store, clock.clone()),
                clock,
                rate_limit: Some(RateLimitPolicy::new(1, 5)),
            },
            provider: Arc::new(StaticProvider),
            query,
        }
    }

    #[tokio::test]
    async fn test_invalid_input_does_not_spend_quota() {
        let schema = evm_schema().with_int_param("limit", "Page size", false);
        let tool = tool(Query::History, schema);

        let output = tool.call(json!({"address": "0xabc", "limit": 500})).await.unwrap();
        assert!(matches!(output, ToolOutput::Error { ref kind, .. } if kind == "invalid_input"));
        let output = tool.call(json!({"address": "0xabc", "chain_id": -5})).await.unwrap();
        assert!(matches!(output, ToolOutput::Error { ref kind, .. } if kind == "invalid_input"));

        // The single allowed call is still available
        let output = tool.call(json!({"address": "0xabc", "limit": 5})).await.unwrap();
        assert!(!output.is_error());
        let output = tool.call(json!({"address": "0xabc"})).await.unwrap();
        assert!(matches!(output, ToolOutput::Error { ref kind, .. } if kind == "rate_limit_exceeded"));
    }

    #[test]
    fn test_evm_chain_from_input() {
        assert_eq!(evm_chain(&json!({})).unwrap(), Chain::Evm("eth".into()));
        assert_eq!(evm_chain(&json!({"chain_id": 8453})).unwrap(), Chain::Evm("base".into()));
        assert!(evm_chain(&json!({"chain_id": -1})).is_err());
    }

    #[test]
    fn test_history_query_bounds() {
        assert_eq!(history_query(&json!({})).unwrap().limit, DEFAULT_HISTORY_LIMIT);
        let q = history_query(&json!({"limit": 5, "cursor": "abc"})).unwrap();
        assert_eq!(q.limit, 5);
        assert_eq!(q.cursor.as_deref(), Some("abc"));
        assert!(history_query(&json!({"limit": 0})).is_err());
        assert!(history_query(&json!({"limit": 500})).is_err());
    }
}
